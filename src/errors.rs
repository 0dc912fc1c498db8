//! Turn-level error taxonomy.
//!
//! Generation and execution failures abort the current turn; formatting
//! failures are always recovered locally by falling back to plain text.

use thiserror::Error;

/// The hosted model call failed or returned unusable text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model call failed: {0}")]
    Provider(String),

    #[error("model returned empty text")]
    EmptyResponse,

    #[error("prompt template error: {0}")]
    Template(String),
}

impl From<minijinja::Error> for GenerationError {
    fn from(e: minijinja::Error) -> Self {
        GenerationError::Template(e.to_string())
    }
}

/// The database rejected or failed the generated SQL.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The statement did not pass the read-only check and never reached
    /// the driver.
    #[error("statement rejected: {0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Driver(String),
}

impl From<sqlx::Error> for ExecutionError {
    fn from(e: sqlx::Error) -> Self {
        ExecutionError::Driver(e.to_string())
    }
}

/// Non-fatal reply construction failure.
#[derive(Debug, Error)]
pub enum FormattingError {
    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("answer summary failed: {0}")]
    Summary(String),
}
