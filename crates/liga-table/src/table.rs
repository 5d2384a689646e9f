//! Immutable row/column dataset resolved from a workbook.

use std::collections::HashSet;
use std::fmt;

use liga_core::text;

use crate::error::TableError;

// =============================================================================
// Value
// =============================================================================

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integer view of the cell. Integral floats and digit strings qualify.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(*n as i64),
            Value::Text(s) => text::parse_integer(s),
            _ => None,
        }
    }

    /// Numeric view of the cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => text::parse_number(s),
            _ => None,
        }
    }

    /// Stringified form used for display and exact-match lookups.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => text::format_number(*n),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// =============================================================================
// Table
// =============================================================================

/// A header row plus data rows. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from a header and data rows.
    ///
    /// Headers are trimmed and must be unique; blank headers get Excel-style
    /// `ColumnN` names. Rows are padded or cut to the header width and
    /// trailing fully-blank rows are dropped.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        let mut seen = HashSet::new();
        let columns: Vec<String> = columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let trimmed = c.trim();
                if trimmed.is_empty() {
                    format!("Column{}", i + 1)
                } else {
                    trimmed.to_string()
                }
            })
            .collect();
        for column in &columns {
            if !seen.insert(column.clone()) {
                return Err(TableError::DuplicateHeader {
                    table: name,
                    column: column.clone(),
                });
            }
        }

        let width = columns.len();
        let mut rows: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        while rows.last().is_some_and(|r| r.iter().all(Value::is_blank)) {
            rows.pop();
        }

        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Build a table whose first grid row is the header.
    pub fn from_grid(name: impl Into<String>, grid: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut grid = grid.into_iter();
        let header = grid
            .next()
            .map(|row| row.iter().map(Value::to_text).collect())
            .unwrap_or_default();
        Self::new(name, header, grid.collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, column)`; out-of-range positions read as null.
    pub fn value(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }

    /// True when the column has at least one numeric cell and every
    /// non-blank cell parses as a number.
    pub fn is_numeric_column(&self, column: usize) -> bool {
        let mut any = false;
        for row in &self.rows {
            let cell = row.get(column).unwrap_or(&Value::Null);
            if cell.is_blank() {
                continue;
            }
            if cell.as_number().is_none() {
                return false;
            }
            any = true;
        }
        any
    }
}
