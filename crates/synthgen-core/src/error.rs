use thiserror::Error;

/// Core error type shared across synthgen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates structural invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A value could not be interpreted for its declared type.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by synthgen crates.
pub type Result<T> = std::result::Result<T, Error>;
