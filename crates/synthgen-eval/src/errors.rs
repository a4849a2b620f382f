use thiserror::Error;

/// Errors emitted by dataset evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(String),
    #[error("dataset contains {0} invalid record(s)")]
    InvalidRecords(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
