use thiserror::Error;

/// Errors emitted by the generation pipeline and facade.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing generator, unsupported locale, or other setup problem.
    #[error("configuration error: {0}")]
    Config(String),
    /// A generator failed or panicked mid-run.
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("iteration budget of {limit} state transitions exceeded")]
    BudgetExceeded { limit: u64 },
    #[error("invalid schema: {}", .0.join("; "))]
    InvalidSchema(Vec<String>),
    /// Raised when materializing a failed result.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    #[error("completion error: {0}")]
    Completion(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
