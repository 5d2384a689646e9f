//! Error types for table loading and schema resolution.

use std::time::Duration;

use liga_core::LigaError;

use crate::schema::Role;

/// Errors from loading a table out of a data source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("data source error: {0}")]
    DataSource(String),
    #[error("duplicate column header '{column}' in table {table}")]
    DuplicateHeader { table: String, column: String },
    #[error("table lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from mapping semantic column roles onto a table's headers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("required column missing: {0}")]
    MissingColumn(Role),
    #[error("columns {columns:?} all match role {role}")]
    AmbiguousColumn { role: Role, columns: Vec<String> },
    #[error("table has no numeric column to compare")]
    NoNumericColumn,
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

impl From<TableError> for LigaError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DataSource(msg) => LigaError::DataSource(msg),
            other => LigaError::DataSource(other.to_string()),
        }
    }
}
