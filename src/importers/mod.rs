// Tabular loader - turn CSV/TXT, spreadsheets and HTML exports into row-sets

pub mod delimited;
pub mod file_detector;
pub mod html_table;
pub mod pdf_text;
pub mod spreadsheet;
pub mod tabular;

use std::path::Path;
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::schema;

pub use file_detector::FileFormat;
pub use pdf_text::{NoPdfText, PdfExtractText, PdfTextExtractor};
pub use tabular::{CellValue, RawRow, Table, TableOrigin};

/// Load a ledger-like file, preferring HTML tables whose headers resolve
/// the most canonical ledger columns
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    load_table_with(path, schema::score_ledger_headers)
}

/// Load any tabular file with a custom HTML table scorer.
///
/// Spreadsheets that fail to open, or open without usable columns, are
/// re-read as HTML before giving up.
pub fn load_table_with<P, F>(path: P, score: F) -> Result<Table>
where
    P: AsRef<Path>,
    F: Fn(&[String]) -> usize,
{
    let path = path.as_ref();
    let format = file_detector::detect_format(path)?;
    let file = delimited::file_label(path);

    info!("Loading {:?} as {}", path, format.as_str());

    match format {
        FileFormat::Delimited => delimited::parse_delimited(path),
        FileFormat::Html => {
            let html = delimited::read_text_lossy(path)?;
            html_table::html_to_table(&html, &file, score)
        }
        FileFormat::Spreadsheet => match spreadsheet::parse_spreadsheet(path) {
            Ok(table) if table.has_usable_columns() => Ok(table),
            structured => {
                if let Err(e) = &structured {
                    warn!("Structured read of {} failed ({}), trying HTML", file, e);
                } else {
                    warn!("{} has no usable columns, trying HTML", file);
                }
                let html = delimited::read_text_lossy(path)?;
                match html_table::html_to_table(&html, &file, score) {
                    Ok(table) => Ok(table),
                    Err(html_err) => Err(structured.err().unwrap_or(html_err)),
                }
            }
        },
        FileFormat::Json | FileFormat::Pdf => Err(IngestError::format(
            file,
            format!("{} files carry no tabular structure", format.as_str()),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ventas.csv");
        std::fs::write(&path, "Tipo Doc;Monto Neto\n33;1000\n").unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table.headers, vec!["Tipo Doc", "Monto Neto"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_json_is_not_tabular() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f29.json");
        std::fs::write(&path, "{}").unwrap();
        let err = load_table(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::FormatError { .. })
        ));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ventas.csv");
        std::fs::create_dir(&path).unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::Io(_))
        ));
    }

    #[test]
    fn test_spreadsheet_that_is_secretly_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compras.xls");
        std::fs::write(
            &path,
            "<html><table><tr><td>Banner</td></tr></table>\
             <table><tr><th>Tipo Doc</th><th>Monto Neto</th></tr>\
             <tr><td>33</td><td>500</td></tr></table></html>",
        )
        .unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(table.headers, vec!["Tipo Doc", "Monto Neto"]);
        assert_eq!(
            table.origin,
            TableOrigin::Html {
                table_index: 1,
                table_count: 2
            }
        );
    }
}
