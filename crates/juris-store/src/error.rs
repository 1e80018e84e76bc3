use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("vector has dimension {got}, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("index has {vectors} vectors but metadata has {meta} entries")]
    SizeMismatch { vectors: usize, meta: usize },
}
