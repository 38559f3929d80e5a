pub type CpuBackend = burn::backend::NdArray<f32, i32>;
pub type TrainBackend = burn::backend::Autodiff<CpuBackend>;

pub use burn;

pub mod batch;
pub mod embedding;
pub mod encoder;
pub mod error;
pub mod gru;
pub mod seq_classifier;
pub mod slot_tagger;

pub use error::{EmbeddingError, ModelError, ShapeError};
