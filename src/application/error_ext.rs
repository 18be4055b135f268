//! Error conversion helpers for I/O and CSV operations
//!
//! Provides extension traits for cleaner error handling with path context.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .with_path_context("read bom", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Same for `csv::Result`.
pub trait CsvResultExt<T> {
    fn csv_context(self, context: &str) -> ApplicationResult<T>;
}

impl<T> CsvResultExt<T> for csv::Result<T> {
    fn csv_context(self, context: &str) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Csv {
            context: context.to_string(),
            source,
        })
    }
}
