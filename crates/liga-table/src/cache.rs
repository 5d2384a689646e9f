//! Process-lifetime table cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error};

use crate::error::TableError;
use crate::source::{table_key, TableSource};
use crate::table::Table;

/// Caches successfully loaded tables from an inner source.
///
/// One `RwLock` guards the whole map, keyed by normalized table name. A
/// cached table is served until [`invalidate`](Self::invalidate) is called
/// or the process exits; changes to the backing workbook are not observed.
/// Failed lookups are never cached.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl<S: TableSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached table.
    pub fn invalidate(&self) {
        self.write_tables().clear();
        debug!("Table cache invalidated");
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.read_tables().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries are whole `Arc<Table>` values, so a poisoned map is still consistent.
    fn read_tables(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Table>>> {
        self.tables.read().unwrap_or_else(|poisoned| {
            error!("Table cache lock poisoned, recovering");
            self.tables.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Table>>> {
        self.tables.write().unwrap_or_else(|poisoned| {
            error!("Table cache lock poisoned, recovering");
            self.tables.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl<S: TableSource> TableSource for CachedSource<S> {
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        let key = table_key(name);
        if let Some(table) = self.read_tables().get(&key) {
            return Ok(Arc::clone(table));
        }

        let table = self.inner.load_table(name)?;
        let mut tables = self.write_tables();
        // Another reader may have filled the slot while we were loading
        let table = tables.entry(key).or_insert(table);
        debug!(table = %table.name(), "Cached table");
        Ok(Arc::clone(table))
    }
}
