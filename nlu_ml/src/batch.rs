use burn::data::dataloader::batcher::Batcher;
use burn::prelude::{Backend, Int, Tensor, TensorData};

/// Pads or truncates token-index rows to a fixed sequence length.
#[derive(Clone)]
pub struct TokenBatcher<B: Backend> {
    device: B::Device,
    sequence_length: usize,
    pad_index: usize,
}

impl<B: Backend> TokenBatcher<B> {
    pub fn new(device: B::Device, sequence_length: usize, pad_index: usize) -> Self {
        Self {
            device,
            sequence_length,
            pad_index,
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}

#[derive(Clone, Debug)]
pub struct TokenBatch<B: Backend> {
    /// [batch_size, sequence_length]
    pub tokens: Tensor<B, 2, Int>,
    /// Number of real (non-padding) tokens in every row, after truncation.
    pub lengths: Vec<usize>,
}

impl<B: Backend> Batcher<Vec<usize>, TokenBatch<B>> for TokenBatcher<B> {
    fn batch(&self, items: Vec<Vec<usize>>) -> TokenBatch<B> {
        let batch_size = items.len();
        let lengths = items
            .iter()
            .map(|row| row.len().min(self.sequence_length))
            .collect();

        let ids = items
            .into_iter()
            .flat_map(|row| {
                row.into_iter()
                    .chain(std::iter::repeat(self.pad_index))
                    .take(self.sequence_length)
            })
            .map(|id| id as i64)
            .collect::<Vec<_>>();

        let data = TensorData::new(ids, [batch_size, self.sequence_length]).convert::<B::IntElem>();
        let tokens = Tensor::from_data(data, &self.device);

        TokenBatch { tokens, lengths }
    }
}
