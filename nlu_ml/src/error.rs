error_set::error_set! {
    ModelError = {
        #[display("hidden_size must be greater than zero")]
        ZeroHiddenSize,
        #[display("num_layers must be greater than zero")]
        ZeroLayers,
        #[display("sequence_length must be greater than zero")]
        ZeroSequenceLength,
        #[display("num_class must be greater than zero")]
        ZeroClasses,
        #[display("dropout must lie in [0, 1), got {dropout}")]
        InvalidDropout {
            dropout: f64
        },
        #[display("Embedding matrix is empty ({num_embeddings}x{dim})")]
        EmptyEmbeddings {
            num_embeddings: usize,
            dim: usize
        },
    };
    ShapeError = {
        #[display("Expected batches of sequence length {expected}, got {actual}")]
        SequenceLength {
            expected: usize,
            actual: usize
        },
    };
    EmbeddingError = {
        #[display("Could not read embeddings: {0}")]
        Io(std::io::Error),
        #[display("Could not parse JSON embeddings: {0}")]
        Json(serde_json::Error),
        #[display("Line {line}: '{value}' is not a valid float")]
        Parse {
            line: usize,
            value: String
        },
        #[display("Row {row} has {found} values, expected {expected}")]
        Ragged {
            row: usize,
            expected: usize,
            found: usize
        },
        #[display("No embedding rows found")]
        Empty,
    };
}
