//! Workbook-backed table loading via calamine.
//!
//! Named tables (Excel "Format as Table" ranges) are read from one
//! configured sheet. Plain sheets, where the first row is the header, are
//! read with [`load_sheet`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use calamine::{open_workbook, open_workbook_auto, Data, Range, Reader, Xlsx};
use tracing::{debug, warn};

use crate::error::TableError;
use crate::source::{table_key, TableSource};
use crate::table::{Table, Value};

/// Convert one calamine cell into a [`Value`].
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        // Serial date number, 1900 system assumed
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

fn range_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect()
}

/// Find the real sheet name matching `wanted`, ignoring case and spacing.
fn find_sheet(names: &[String], wanted: &str) -> Option<String> {
    let key = table_key(wanted);
    names.iter().find(|n| table_key(n) == key).cloned()
}

/// Read a plain worksheet whose first row is the header.
pub fn load_sheet(path: &Path, sheet: &str) -> Result<Table, TableError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        TableError::DataSource(format!("failed to open {}: {}", path.display(), e))
    })?;
    let name = find_sheet(&workbook.sheet_names(), sheet).ok_or_else(|| {
        TableError::DataSource(format!("sheet '{}' not found in {}", sheet, path.display()))
    })?;
    let range = workbook.worksheet_range(&name).map_err(|e| {
        TableError::DataSource(format!("failed to read sheet '{}': {}", name, e))
    })?;
    let table = Table::from_grid(name, range_rows(&range))?;
    debug!(sheet = %table.name(), rows = table.len(), "Loaded sheet");
    Ok(table)
}

/// Loads named tables from one sheet of an `.xlsx` workbook.
///
/// The file is reopened on every lookup, so edits to the workbook are seen
/// by the next query. Wrap in [`CachedSource`](crate::CachedSource) to read
/// each table once per process.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
    sheet: String,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    fn open(&self) -> Result<Xlsx<BufReader<File>>, TableError> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            TableError::DataSource(format!("failed to open {}: {}", self.path.display(), e))
        })?;
        workbook.load_tables().map_err(|e| {
            TableError::DataSource(format!(
                "failed to read table definitions in {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(workbook)
    }

    /// Names of all tables defined on the configured sheet.
    pub fn table_names(&self) -> Result<Vec<String>, TableError> {
        let workbook = self.open()?;
        let sheet = self.resolve_sheet(&workbook)?;
        Ok(workbook
            .table_names_in_sheet(&sheet)
            .into_iter()
            .cloned()
            .collect())
    }

    fn resolve_sheet(&self, workbook: &Xlsx<BufReader<File>>) -> Result<String, TableError> {
        find_sheet(&workbook.sheet_names(), &self.sheet).ok_or_else(|| {
            TableError::DataSource(format!(
                "sheet '{}' not found in {}",
                self.sheet,
                self.path.display()
            ))
        })
    }
}

impl TableSource for WorkbookSource {
    fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        let start = Instant::now();
        let mut workbook = self.open()?;
        let sheet = self.resolve_sheet(&workbook)?;

        let key = table_key(name);
        let found: Option<String> = workbook
            .table_names_in_sheet(&sheet)
            .into_iter()
            .find(|candidate| table_key(candidate) == key)
            .cloned();
        let Some(table_name) = found else {
            warn!(table = %name, sheet = %sheet, "Table not found in workbook");
            return Err(TableError::TableNotFound(name.trim().to_string()));
        };

        let xlsx_table = workbook.table_by_name(&table_name).map_err(|e| {
            TableError::DataSource(format!("failed to read table '{}': {}", table_name, e))
        })?;
        let columns = xlsx_table.columns().to_vec();
        let rows = range_rows(xlsx_table.data());
        let table = Table::new(table_name, columns, rows)?;

        debug!(
            table = %table.name(),
            rows = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded table from workbook"
        );
        Ok(Arc::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Table as XlsxTable, TableColumn, Workbook};
    use tempfile::TempDir;

    const SHEET: &str = "فروشنده";

    /// Workbook with T1 (3 data rows, 2 empty rows in its range) and Faq on
    /// the data sheet, plus a plain plans sheet.
    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("liga.xlsx");
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET).unwrap();
        let rows = [
            (1.0, "Ali", "Rezai", "E7"),
            (2.0, "Sara", "Karimi", "E1"),
            (3.0, "Reza", "Ahmadi", "E3"),
        ];
        for (i, (rank, first, last, code)) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_number(r, 0, *rank).unwrap();
            sheet.write_string(r, 1, *first).unwrap();
            sheet.write_string(r, 2, *last).unwrap();
            sheet.write_string(r, 3, *code).unwrap();
        }
        let columns = vec![
            TableColumn::new().set_header("رتبه"),
            TableColumn::new().set_header("نام"),
            TableColumn::new().set_header("نام خانوادگی"),
            TableColumn::new().set_header("کد پرسنلی"),
        ];
        let table = XlsxTable::new().set_name("T1").set_columns(&columns);
        sheet.add_table(0, 0, 5, 3, &table).unwrap();

        sheet.write_string(1, 6, "چند روز مرخصی داریم؟").unwrap();
        sheet.write_string(1, 7, "۲۶ روز").unwrap();
        let columns = vec![
            TableColumn::new().set_header("سوال"),
            TableColumn::new().set_header("پاسخ"),
        ];
        let table = XlsxTable::new().set_name("Faq").set_columns(&columns);
        sheet.add_table(0, 6, 1, 7, &table).unwrap();

        let plans = workbook.add_worksheet();
        plans.set_name("طرح‌ها").unwrap();
        plans.write_string(0, 0, "شماره طرح").unwrap();
        plans.write_string(0, 1, "عنوان طرح").unwrap();
        plans.write_string(0, 2, "نام جدول").unwrap();
        plans.write_number(1, 0, 1.0).unwrap();
        plans.write_string(1, 1, "Plan A").unwrap();
        plans.write_string(1, 2, "T1").unwrap();

        workbook.save(&path).unwrap();
        path
    }

    // ---- Named tables ----

    #[test]
    fn test_load_named_table() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), SHEET);

        let table = source.load_table("T1").unwrap();
        assert_eq!(table.name(), "T1");
        assert_eq!(table.columns().len(), 4);
        assert_eq!(table.columns()[0], "رتبه");
        // Empty rows at the bottom of the table range are dropped
        assert_eq!(table.len(), 3);
        assert_eq!(table.value(0, 0).as_integer(), Some(1));
        assert_eq!(table.value(0, 1), &Value::from("Ali"));
        assert_eq!(table.value(1, 3).to_text(), "E1");
    }

    #[test]
    fn test_table_name_lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), SHEET);

        assert_eq!(source.load_table(" t1 ").unwrap().len(), 3);
        assert_eq!(source.load_table("FAQ").unwrap().name(), "Faq");
    }

    #[test]
    fn test_table_names() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), SHEET);

        let mut names = source.table_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["Faq".to_string(), "T1".to_string()]);
    }

    #[test]
    fn test_unknown_table() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), SHEET);

        assert_eq!(
            source.load_table("T9").unwrap_err(),
            TableError::TableNotFound("T9".to_string())
        );
    }

    #[test]
    fn test_tables_on_other_sheets_are_not_visible() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), "طرح‌ها");

        assert!(matches!(
            source.load_table("T1"),
            Err(TableError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_missing_sheet_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(write_fixture(&dir), "Nope");

        assert!(matches!(
            source.load_table("T1"),
            Err(TableError::DataSource(ref m)) if m.contains("Nope")
        ));
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let source = WorkbookSource::new(dir.path().join("absent.xlsx"), SHEET);

        assert!(matches!(
            source.load_table("T1"),
            Err(TableError::DataSource(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        let source = WorkbookSource::new(path, SHEET);

        assert!(matches!(
            source.load_table("T1"),
            Err(TableError::DataSource(_))
        ));
    }

    // ---- Plain sheets ----

    #[test]
    fn test_load_sheet() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let plans = load_sheet(&path, "طرح‌ها").unwrap();
        assert_eq!(plans.columns()[1], "عنوان طرح");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans.value(0, 0).to_text(), "1");
        assert_eq!(plans.value(0, 2).to_text(), "T1");
    }

    #[test]
    fn test_load_sheet_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        assert!(matches!(
            load_sheet(&path, "سوالات"),
            Err(TableError::DataSource(_))
        ));
    }

    // ---- Cell conversion ----

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String(String::new())), Value::Null);
        assert_eq!(cell_value(&Data::Int(4)), Value::Number(4.0));
        assert_eq!(cell_value(&Data::Float(2.5)), Value::Number(2.5));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-01".to_string())),
            Value::from("2024-01-01")
        );
    }
}
