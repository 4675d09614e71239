use anyhow::anyhow;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

use super::delimited::file_label;
use super::tabular::{CellValue, RawRow, Table, TableOrigin};
use crate::error::{IngestError, Result};

/// Parse the first non-empty worksheet of an Excel/ODS file.
///
/// The first row holding any text becomes the header. A workbook whose
/// header row is blank yields a table without usable columns; the caller
/// decides whether to fall back to HTML parsing.
pub fn parse_spreadsheet<P: AsRef<Path>>(file_path: P) -> Result<Table> {
    let path = file_path.as_ref();
    let file = file_label(path);
    info!("Parsing spreadsheet: {:?}", path);

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IngestError::format(&file, format!("failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names();
    debug!("Workbook sheets: {:?}", sheet_names);

    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                debug!("Skipping unreadable sheet {:?}: {}", sheet_name, e);
                continue;
            }
        };

        let mut rows_iter = range
            .rows()
            .skip_while(|row| row.iter().all(|cell| cell_text(cell).is_empty()));

        let Some(header_row) = rows_iter.next() else {
            continue;
        };

        let headers: Vec<String> = header_row.iter().map(cell_text).collect();
        let rows: Vec<RawRow> = rows_iter
            .map(|row| RawRow::new(row.iter().map(to_cell_value).collect()))
            .collect();

        return Ok(Table::new(
            headers,
            rows,
            TableOrigin::Spreadsheet { sheet: sheet_name },
        ));
    }

    Err(IngestError::format(file, "workbook has no populated sheet").into())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn to_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::text(s),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        other => CellValue::text(&other.to_string()),
    }
}

/// Convert an Excel serial day number to a calendar date
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days_since_epoch = serial.floor() as i64;
    let excel_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    excel_epoch.checked_add_signed(chrono::Duration::days(days_since_epoch))
}

/// Used by `inspect` to report the raw sheet list
pub fn sheet_names<P: AsRef<Path>>(file_path: P) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(file_path.as_ref())
        .map_err(|e| anyhow!("Failed to open workbook: {}", e))?;
    Ok(workbook.sheet_names())
}
