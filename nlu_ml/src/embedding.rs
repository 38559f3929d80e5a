use crate::error::{EmbeddingError, ModelError};
use burn::module::Param;
use burn::nn::Embedding;
use burn::prelude::{Backend, Tensor, TensorData};
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";

/// A dense `[num_embeddings, dim]` matrix of pretrained word vectors.
///
/// When loaded from a GloVe-style text file the leading token of every line is kept as the vocabulary,
/// row `i` of the matrix belongs to token `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct PretrainedEmbeddings {
    weights: Vec<f32>,
    num_embeddings: usize,
    dim: usize,
    tokens: Option<Vec<String>>,
}

impl PretrainedEmbeddings {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        let dim = rows.first().map(Vec::len).ok_or(EmbeddingError::Empty)?;
        if dim == 0 {
            return Err(EmbeddingError::Empty);
        }

        if let Some((row, found)) = rows.iter().find_position(|row| row.len() != dim) {
            return Err(EmbeddingError::Ragged {
                row,
                expected: dim,
                found: found.len(),
            });
        }

        Ok(Self {
            num_embeddings: rows.len(),
            dim,
            weights: rows.into_iter().flatten().collect(),
            tokens: None,
        })
    }

    /// Load embeddings from disk.
    ///
    /// Files ending in `.json` are read as a nested array of floats, anything else is treated as
    /// whitespace separated text with one `token v1 v2 ...` entry per line.
    #[tracing::instrument]
    pub fn load(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let embeddings = if path.extension().is_some_and(|ext| ext == "json") {
            let rows: Vec<Vec<f32>> = serde_json::from_str(&content)?;
            Self::from_rows(rows)?
        } else {
            Self::parse_text(&content)?
        };

        tracing::debug!(
            num_embeddings = embeddings.num_embeddings,
            dim = embeddings.dim,
            "Loaded pretrained embeddings"
        );
        Ok(embeddings)
    }

    /// Parse GloVe-style `token v1 v2 ...` lines. Blank lines are skipped.
    pub fn parse_text(content: &str) -> Result<Self, EmbeddingError> {
        let mut tokens = Vec::new();
        let mut rows = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let mut parts = line.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };

            let row = parts
                .map(|value| {
                    value.parse::<f32>().map_err(|_| EmbeddingError::Parse {
                        line: line_no + 1,
                        value: value.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            tokens.push(token.to_string());
            rows.push(row);
        }

        let mut embeddings = Self::from_rows(rows)?;
        embeddings.tokens = Some(tokens);
        Ok(embeddings)
    }

    /// `[num_embeddings, dim]`
    pub fn dims(&self) -> [usize; 2] {
        [self.num_embeddings, self.dim]
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dim)?;
        self.weights.get(start..start + self.dim)
    }

    pub fn vocab(&self) -> Option<Vocab> {
        self.tokens.clone().map(Vocab::new)
    }

    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data = TensorData::new(self.weights.clone(), [self.num_embeddings, self.dim]).convert::<B::FloatElem>();
        Tensor::from_data(data, device)
    }
}

/// Wrap a pretrained matrix in an [Embedding] layer.
///
/// The weight is registered as a regular parameter, so it keeps tracking gradients and will be fine-tuned
/// along with the rest of the model.
pub fn init_embedding<B: Backend>(weights: Tensor<B, 2>, device: &B::Device) -> Result<Embedding<B>, ModelError> {
    let [num_embeddings, dim] = weights.dims();
    if num_embeddings == 0 || dim == 0 {
        return Err(ModelError::EmptyEmbeddings { num_embeddings, dim });
    }

    Ok(Embedding {
        weight: Param::from_tensor(weights.to_device(device)),
    })
}

/// Token to row lookup for a [PretrainedEmbeddings] vocabulary.
#[derive(Debug, Clone)]
pub struct Vocab {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    pad: usize,
    unk: usize,
}

impl Vocab {
    /// Padding falls back to row `0` when no [PAD_TOKEN] is present, unknown words fall back to the padding row
    /// when there is no [UNK_TOKEN].
    pub fn new(tokens: Vec<String>) -> Self {
        let index: HashMap<String, usize> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        let pad = index.get(PAD_TOKEN).copied().unwrap_or(0);
        let unk = index.get(UNK_TOKEN).copied().unwrap_or(pad);

        Self { tokens, index, pad, unk }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn pad_index(&self) -> usize {
        self.pad
    }

    pub fn unk_index(&self) -> usize {
        self.unk
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn token_to_id(&self, token: &str) -> usize {
        self.index.get(token).copied().unwrap_or(self.unk)
    }

    /// Lower-case and whitespace split `text`.
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    pub fn encode(&self, text: &str) -> Vec<usize> {
        Self::tokenize(text)
            .iter()
            .map(|token| self.token_to_id(token))
            .collect()
    }
}
