//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent rejected tree operations.
/// A rejected operation leaves the document untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("invalid operation {op}: {reason}")]
    InvalidOperation { op: &'static str, reason: String },

    #[error("circular reference: {target} is {node} or one of its descendants")]
    CircularReference { node: NodeId, target: NodeId },

    #[error("row {row}: level {level} has no parent row at level {}", .level - 1)]
    InvalidLevel { row: usize, level: usize },

    #[error("column already exists: {0}")]
    DuplicateColumn(String),
}

impl DomainError {
    pub(crate) fn invalid(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            op,
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
