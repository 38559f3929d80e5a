use crate::embedding::init_embedding;
use crate::encoder::{RecurrentCell, RecurrentEncoder, RecurrentEncoderConfig};
use crate::error::{ModelError, ShapeError};
use burn::config::Config;
use burn::module::Module;
use burn::nn::{
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Embedding, LayerNorm, LayerNormConfig, LeakyRelu,
    LeakyReluConfig, Linear, LinearConfig,
};
use burn::prelude::{Backend, Int, Tensor};

/// Intent classifier over padded, fixed-length token batches.
#[derive(Module, Debug)]
pub struct SeqClassifier<B: Backend> {
    embedding: Embedding<B>,
    norm: LayerNorm<B>,
    encoder: RecurrentEncoder<B>,
    head: ClassifierHead<B>,
    sequence_length: usize,
}

#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    hidden: Linear<B>,
    norm: BatchNorm<B, 0>,
    activation: LeakyRelu,
    dropout: Dropout,
    output: Linear<B>,
}

#[derive(Config, Debug)]
pub struct SeqClassifierConfig {
    /// Hidden width of a single recurrent direction, also used as the width of the head.
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    pub bidirectional: bool,
    /// Number of output classes
    pub num_class: usize,
    /// Every batch must be padded to exactly this length, the head consumes all timesteps.
    pub sequence_length: usize,
    #[config(default = "RecurrentCell::Lstm")]
    pub cell: RecurrentCell,
    #[config(default = "0.2")]
    pub negative_slope: f64,
}

impl SeqClassifierConfig {
    fn encoder(&self, embedding_dim: usize) -> RecurrentEncoderConfig {
        RecurrentEncoderConfig::new(embedding_dim, self.hidden_size, self.num_layers)
            .with_bidirectional(self.bidirectional)
            .with_dropout(self.dropout)
            .with_cell(self.cell.clone())
    }

    /// Width of the flattened encoder output, `hidden_size * directions * sequence_length`.
    pub fn encoder_output_size(&self) -> usize {
        let directions = if self.bidirectional { 2 } else { 1 };
        self.hidden_size * directions * self.sequence_length
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_class == 0 {
            return Err(ModelError::ZeroClasses);
        }
        if self.sequence_length == 0 {
            return Err(ModelError::ZeroSequenceLength);
        }
        self.encoder(1).validate()
    }

    /// Build the classifier around the given `[num_embeddings, embedding_dim]` pretrained matrix.
    #[tracing::instrument(skip(self, embeddings, device), fields(num_class = self.num_class, bidirectional = self.bidirectional))]
    pub fn init<B: Backend>(&self, embeddings: Tensor<B, 2>, device: &B::Device) -> Result<SeqClassifier<B>, ModelError> {
        self.validate()?;
        let embedding = init_embedding(embeddings, device)?;
        let [_, embedding_dim] = embedding.weight.val().dims();

        let encoder = self.encoder(embedding_dim).init(device);
        let head_input = encoder.output_size() * self.sequence_length;
        tracing::debug!(embedding_dim, head_input, "Building sequence classifier");

        let head = ClassifierHead {
            hidden: LinearConfig::new(head_input, self.hidden_size).init(device),
            norm: BatchNormConfig::new(self.hidden_size).init(device),
            activation: LeakyReluConfig::new().with_negative_slope(self.negative_slope).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.hidden_size, self.num_class).init(device),
        };

        Ok(SeqClassifier {
            embedding,
            norm: LayerNormConfig::new(embedding_dim).init(device),
            encoder,
            head,
            sequence_length: self.sequence_length,
        })
    }
}

impl<B: Backend> SeqClassifier<B> {
    /// Batches must be padded to the configured sequence length, see [Self::check_batch].
    ///
    /// # Shapes
    ///   - Batch [batch_size, sequence_length]
    ///   - Output [batch_size, num_class]
    pub fn forward(&self, batch: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(batch);
        let x = self.norm.forward(x);
        let x = self.encoder.forward(x);

        // Every timestep is kept, the head sees the whole sequence at once.
        let [batch_size, seq_length, width] = x.dims();
        let x = x.reshape([batch_size, seq_length * width]);

        self.head.forward(x)
    }

    pub fn check_batch(&self, batch: &Tensor<B, 2, Int>) -> Result<(), ShapeError> {
        let [_, actual] = batch.dims();
        if actual == self.sequence_length {
            Ok(())
        } else {
            Err(ShapeError::SequenceLength {
                expected: self.sequence_length,
                actual,
            })
        }
    }

    pub fn embedding(&self) -> &Embedding<B> {
        &self.embedding
    }

    pub fn encoder(&self) -> &RecurrentEncoder<B> {
        &self.encoder
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Width of the flattened encoder output consumed by the head.
    pub fn encoder_output_size(&self) -> usize {
        self.encoder.output_size() * self.sequence_length
    }

    /// Input width of the first linear layer of the head, as actually allocated.
    pub fn head_input_size(&self) -> usize {
        self.head.hidden.weight.val().dims()[0]
    }

    pub fn num_class(&self) -> usize {
        self.head.output.weight.val().dims()[1]
    }
}

impl<B: Backend> ClassifierHead<B> {
    /// # Shapes
    ///   - Input [batch_size, encoder_output]
    ///   - Output [batch_size, num_class]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.forward(x);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }
}
