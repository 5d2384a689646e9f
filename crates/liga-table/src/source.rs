//! The `TableSource` seam and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use liga_core::text;

use crate::error::TableError;
use crate::table::Table;

/// Lookup key for a table name: case-, whitespace- and letter-variant-insensitive.
pub fn table_key(name: &str) -> String {
    text::normalize(name).replace(' ', "")
}

/// Anything that can produce a named table on demand.
///
/// Implementations must be safe to call from many sessions at once.
pub trait TableSource: Send + Sync {
    /// Load the table called `name`.
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError>;
}

impl<S: TableSource + ?Sized> TableSource for Arc<S> {
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        (**self).load_table(name)
    }
}

impl<S: TableSource + ?Sized> TableSource for Box<S> {
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        (**self).load_table(name)
    }
}

/// Fixed set of tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<String, Arc<Table>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its own name, replacing any previous one.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table_key(table.name()), Arc::new(table));
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.insert(table);
        self
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSource for InMemorySource {
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        self.tables
            .get(&table_key(name))
            .cloned()
            .ok_or_else(|| TableError::TableNotFound(name.trim().to_string()))
    }
}
