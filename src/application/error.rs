//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("csv error: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column: {0}")]
    MissingHeader(String),

    /// Payload key that would shadow the level or path column
    #[error("payload key '{0}' collides with a reserved csv column")]
    ReservedColumn(String),

    #[error("row {row}: invalid {column} value '{value}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("document lock poisoned")]
    LockPoisoned,

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
