//! Error types for the conversation engine.

use liga_core::LigaError;
use liga_table::{SchemaError, TableError};

/// Errors from catalog construction and query answering.
///
/// "Not found" and "unrecognized" are not errors; they are
/// [`QueryOutcome`](crate::analyzer::QueryOutcome) variants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("a personnel code is required for this question")]
    MissingIdentifier,
}

impl From<LigaError> for ChatError {
    fn from(err: LigaError) -> Self {
        ChatError::Configuration(err.to_string())
    }
}
