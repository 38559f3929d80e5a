use crate::embedding::init_embedding;
use crate::encoder::{RecurrentCell, RecurrentEncoder, RecurrentEncoderConfig};
use crate::error::ModelError;
use burn::config::Config;
use burn::module::Module;
use burn::nn::{
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Embedding, Gelu, LayerNorm, LayerNormConfig, Linear,
    LinearConfig,
};
use burn::prelude::{Backend, Int, Tensor};

/// Per-token slot tagger.
///
/// Predicts `num_class + 1` tags per token, the last tag is reserved for padding.
#[derive(Module, Debug)]
pub struct SlotTagger<B: Backend> {
    embedding: Embedding<B>,
    norm: LayerNorm<B>,
    encoder: RecurrentEncoder<B>,
    projection: Linear<B>,
    channel_norm: BatchNorm<B, 1>,
    activation: Gelu,
    dropout: Dropout,
    output: Linear<B>,
}

#[derive(Config, Debug)]
pub struct SlotTaggerConfig {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    pub bidirectional: bool,
    /// Number of slot tags, excluding the padding tag.
    pub num_class: usize,
    #[config(default = "RecurrentCell::Lstm")]
    pub cell: RecurrentCell,
}

impl SlotTaggerConfig {
    fn encoder(&self, embedding_dim: usize) -> RecurrentEncoderConfig {
        RecurrentEncoderConfig::new(embedding_dim, self.hidden_size, self.num_layers)
            .with_bidirectional(self.bidirectional)
            .with_dropout(self.dropout)
            .with_cell(self.cell.clone())
    }

    /// Number of predicted tags, including the padding tag.
    pub fn num_tags(&self) -> usize {
        self.num_class + 1
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_class == 0 {
            return Err(ModelError::ZeroClasses);
        }
        self.encoder(1).validate()
    }

    #[tracing::instrument(skip(self, embeddings, device), fields(num_class = self.num_class, bidirectional = self.bidirectional))]
    pub fn init<B: Backend>(&self, embeddings: Tensor<B, 2>, device: &B::Device) -> Result<SlotTagger<B>, ModelError> {
        self.validate()?;
        let embedding = init_embedding(embeddings, device)?;
        let [_, embedding_dim] = embedding.weight.val().dims();

        let encoder = self.encoder(embedding_dim).init(device);
        tracing::debug!(embedding_dim, encoder_output = encoder.output_size(), "Building slot tagger");

        Ok(SlotTagger {
            embedding,
            norm: LayerNormConfig::new(embedding_dim).init(device),
            projection: LinearConfig::new(encoder.output_size(), self.hidden_size).init(device),
            encoder,
            channel_norm: BatchNormConfig::new(self.hidden_size).init(device),
            activation: Gelu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.hidden_size, self.num_tags()).init(device),
        })
    }
}

impl<B: Backend> SlotTagger<B> {
    /// # Shapes
    ///   - Batch [batch_size, seq_length]
    ///   - Output [batch_size, seq_length, num_class + 1]
    pub fn forward(&self, batch: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let x = self.embedding.forward(batch);
        let x = self.norm.forward(x);
        let x = self.encoder.forward(x);

        let x = self.projection.forward(x);
        // BatchNorm expects the channels on the second axis.
        let x = self.channel_norm.forward(x.swap_dims(1, 2)).swap_dims(1, 2);

        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }

    /// Same logits as [Self::forward], with the tag axis moved in front of the timestep axis.
    ///
    /// # Shapes
    ///   - Batch [batch_size, seq_length]
    ///   - Output [batch_size, num_class + 1, seq_length]
    pub fn forward_class_first(&self, batch: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.forward(batch).swap_dims(1, 2)
    }

    pub fn embedding(&self) -> &Embedding<B> {
        &self.embedding
    }

    pub fn encoder(&self) -> &RecurrentEncoder<B> {
        &self.encoder
    }

    /// Input width of the per-timestep projection.
    pub fn projection_input_size(&self) -> usize {
        self.projection.weight.val().dims()[0]
    }

    /// Number of predicted tags, including the padding tag.
    pub fn num_tags(&self) -> usize {
        self.output.weight.val().dims()[1]
    }

    /// Index of the tag reserved for padding.
    pub fn pad_tag(&self) -> usize {
        self.num_tags() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CpuBackend, TrainBackend};
    use burn::module::AutodiffModule;
    use burn::tensor::{Distribution, TensorData};

    const VOCAB: usize = 12;
    const DIM: usize = 4;

    fn embeddings<B: Backend>(device: &B::Device) -> Tensor<B, 2> {
        Tensor::random([VOCAB, DIM], Distribution::Normal(0.0, 1.0), device)
    }

    fn batch<B: Backend>(batch_size: usize, seq_length: usize, device: &B::Device) -> Tensor<B, 2, Int> {
        let ids = (0..batch_size * seq_length).map(|i| (i * 7 % VOCAB) as i64).collect::<Vec<_>>();
        Tensor::from_data(TensorData::new(ids, [batch_size, seq_length]).convert::<B::IntElem>(), device)
    }

    fn config() -> SlotTaggerConfig {
        SlotTaggerConfig::new(10, 2, 0.2, true, 6)
    }

    #[test]
    fn output_keeps_batch_and_time_first() {
        let device = Default::default();
        let model = config().init::<CpuBackend>(embeddings(&device), &device).unwrap();

        // Any sequence length works, there is no flattening.
        for (batch_size, seq_length) in [(2, 5), (3, 11)] {
            let logits = model.forward(batch(batch_size, seq_length, &device));
            assert_eq!(logits.dims(), [batch_size, seq_length, 7]);
        }
        assert_eq!(model.num_tags(), 7);
        assert_eq!(model.pad_tag(), 6);
    }

    #[test]
    fn class_first_layout_is_a_transpose() {
        let device = Default::default();
        let model = config().init::<CpuBackend>(embeddings(&device), &device).unwrap();
        let input = batch::<CpuBackend>(2, 5, &device);

        let time_first = model.forward(input.clone());
        let class_first = model.forward_class_first(input);

        assert_eq!(class_first.dims(), [2, 7, 5]);
        class_first
            .swap_dims(1, 2)
            .into_data()
            .assert_eq(&time_first.into_data(), true);
    }

    #[test]
    fn bidirectional_doubles_projection_input() {
        let device = Default::default();
        let bi = config().init::<CpuBackend>(embeddings(&device), &device).unwrap();
        let uni = SlotTaggerConfig {
            bidirectional: false,
            ..config()
        }
        .init::<CpuBackend>(embeddings(&device), &device)
        .unwrap();

        assert_eq!(uni.projection_input_size(), 10);
        assert_eq!(bi.projection_input_size(), 20);
        assert_eq!(bi.encoder().output_size(), 2 * uni.encoder().output_size());
    }

    #[test]
    fn gru_cell_is_supported() {
        let device = Default::default();
        let model = config()
            .with_cell(RecurrentCell::Gru)
            .init::<CpuBackend>(embeddings(&device), &device)
            .unwrap();

        assert_eq!(model.forward(batch(2, 4, &device)).dims(), [2, 4, 7]);
    }

    #[test]
    fn rejects_zero_classes() {
        let device = Default::default();
        let result = SlotTaggerConfig::new(10, 2, 0.2, true, 0).init::<CpuBackend>(embeddings(&device), &device);

        assert!(matches!(result, Err(ModelError::ZeroClasses)));
    }

    #[test]
    fn embedding_tracks_gradients() {
        let device = Default::default();
        let model = config().init::<TrainBackend>(embeddings(&device), &device).unwrap();
        let weight = model.embedding().weight.val();
        assert!(weight.is_require_grad());

        let grads = model.forward(batch(2, 5, &device)).sum().backward();
        assert!(weight.grad(&grads).is_some());
    }

    #[test]
    fn dropout_only_in_training() {
        let device = Default::default();
        let model = SlotTaggerConfig::new(32, 1, 0.5, false, 6)
            .init::<TrainBackend>(embeddings(&device), &device)
            .unwrap();

        let input = batch::<TrainBackend>(3, 6, &device);
        let first = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let second = model.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_ne!(first, second);

        let eval = model.valid();
        let input = batch::<CpuBackend>(3, 6, &device);
        eval.forward(input.clone())
            .into_data()
            .assert_eq(&eval.forward(input).into_data(), true);
    }
}
