//! Tabular data access for the Liga query bot.
//!
//! Tables are read by name from a workbook sheet, exposed as immutable
//! [`Table`] snapshots, and interpreted through a [`Schema`] that maps
//! semantic column roles onto whatever headers the sheet uses.

pub mod cache;
pub mod deadline;
pub mod error;
pub mod schema;
pub mod source;
pub mod table;
pub mod workbook;

pub use cache::CachedSource;
pub use deadline::load_before;
pub use error::{SchemaError, TableError};
pub use schema::{Role, Schema};
pub use source::{InMemorySource, TableSource};
pub use table::{Table, Value};
pub use workbook::{load_sheet, WorkbookSource};
