use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::importers::{CellValue, Table};

/// Tax period (one calendar month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(anyhow!("Invalid month {} (expected 1-12)", month));
        }
        Ok(Self { year, month })
    }

    /// `YYYYMM`, the tag SII puts in monthly export file names
    pub fn tag(&self) -> String {
        format!("{}{:02}", self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    /// Accepts `YYYY-MM`, `MM/YYYY` and `YYYYMM`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = if let Some((y, m)) = s.split_once('-') {
            (y, m)
        } else if let Some((m, y)) = s.split_once('/') {
            (y, m)
        } else if s.len() == 6 && s.chars().all(|c| c.is_ascii_digit()) {
            s.split_at(4)
        } else {
            return Err(anyhow!("Invalid period {:?} (expected YYYY-MM)", s));
        };

        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid year in period {:?}", s))?;
        let month: u32 = month
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid month in period {:?}", s))?;
        Period::new(year, month)
    }
}

/// True when the file name already carries the period tag, meaning the
/// export is pre-scoped to the period (late documents from adjacent months
/// included on purpose)
pub fn filename_encodes_period(path: &Path, period: Period) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(&period.tag()))
        .unwrap_or(false)
}

/// Parse a day-first date cell. A trailing time part is ignored.
pub fn parse_day_first(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => {
            let date_part = s.split_whitespace().next()?;
            let date_part = date_part.split('T').next()?;
            ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y", "%d.%m.%Y"]
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
                // %Y happily reads "25" as year 25
                .find(|date| date.year() >= 1000)
        }
        _ => None,
    }
}

/// Keep only rows whose date column falls inside `period`.
/// Rows with unparseable dates are dropped. Returns the number dropped.
pub fn filter_table_to_period(table: &mut Table, date_col: usize, period: Period) -> usize {
    let before = table.len();
    table.retain_rows(|row| {
        parse_day_first(row.get(date_col))
            .map(|date| period.contains(date))
            .unwrap_or(false)
    });
    before - table.len()
}
