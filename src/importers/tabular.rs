//! Rectangular row-sets produced by every loader
//!
//! Whatever the source format, loaders hand back a `Table`: trimmed header
//! names plus rows that always have exactly one cell per header.

use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt;

/// A single cell as it came out of the source file
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Build a text cell, collapsing blank strings to `Empty`
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Textual rendering used for header matching and regex-style parsing
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    Cow::Owned(format!("{:.0}", n))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
            CellValue::Date(d) => Cow::Owned(d.format("%d/%m/%Y").to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// One data line of a source file, aligned with the table headers
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `idx`, or `Empty` when the column does not exist
    pub fn get(&self, idx: usize) -> &CellValue {
        self.cells.get(idx).unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    fn fit_to(&mut self, width: usize) {
        self.cells.resize(width, CellValue::Empty);
    }
}

/// Where a table was found, kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub enum TableOrigin {
    Delimited { delimiter: u8, loose: bool },
    Spreadsheet { sheet: String },
    Html { table_index: usize, table_count: usize },
}

impl fmt::Display for TableOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOrigin::Delimited { delimiter, loose } => write!(
                f,
                "delimited ({:?}{})",
                *delimiter as char,
                if *loose { ", loose" } else { "" }
            ),
            TableOrigin::Spreadsheet { sheet } => write!(f, "spreadsheet (sheet {:?})", sheet),
            TableOrigin::Html {
                table_index,
                table_count,
            } => write!(f, "html (table {} of {})", table_index + 1, table_count),
        }
    }
}

/// Header row plus rectangular data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub origin: TableOrigin,
}

impl Table {
    /// Create a table, padding or truncating every row to the header width
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>, origin: TableOrigin) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .filter(|row| !row.is_blank())
            .map(|mut row| {
                row.fit_to(width);
                row
            })
            .collect();
        Self {
            headers,
            rows,
            origin,
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when at least one header has visible text
    pub fn has_usable_columns(&self) -> bool {
        self.headers.iter().any(|h| !h.is_empty())
    }

    /// Keep only the rows accepted by `keep`
    pub fn retain_rows<F: FnMut(&RawRow) -> bool>(&mut self, keep: F) {
        self.rows.retain(keep);
    }
}
