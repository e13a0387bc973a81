use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Network/HTTP failure or rate-limit response from a data source.
    /// Retried by the caller, then surfaced as a per-symbol failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Fetched data breaks a structural invariant. Fails the symbol
    /// immediately, no retry.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A computation was handed input it cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write or query failure in the relational store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Missing or unusable configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.to_string())
    }
}
