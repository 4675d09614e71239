use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use super::delimited::file_label;
use crate::error::{IngestError, Result};

/// Bytes inspected when sniffing file contents
const SNIFF_BYTES: usize = 8192;

/// Kind of input file detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
    Html,
    Json,
    Pdf,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Delimited => "delimited",
            FileFormat::Spreadsheet => "spreadsheet",
            FileFormat::Html => "html",
            FileFormat::Json => "json",
            FileFormat::Pdf => "pdf",
        }
    }
}

/// Detect the format of an input file
///
/// Detection strategy:
/// - Extension decides the nominal format
/// - Spreadsheet extensions are sniffed: no ZIP/OLE signature but an HTML
///   table in the first bytes means the "spreadsheet" is really HTML
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IngestError::FileMissing(path.to_path_buf()).into());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let format = match extension.as_str() {
        "csv" | "txt" => FileFormat::Delimited,
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => {
            if sniff_disguised_html(path)? {
                info!("Detected HTML disguised as spreadsheet: {:?}", path);
                FileFormat::Html
            } else {
                FileFormat::Spreadsheet
            }
        }
        "html" | "htm" => FileFormat::Html,
        "json" => FileFormat::Json,
        "pdf" => FileFormat::Pdf,
        _ => {
            return Err(IngestError::format(
                file_label(path),
                format!(
                    "unsupported file extension {:?}. Supported: csv, txt, xlsx, xls, ods, html, json, pdf",
                    extension
                ),
            )
            .into())
        }
    };

    Ok(format)
}

/// True when the file carries no ZIP/OLE signature but looks like HTML
pub fn sniff_disguised_html(path: &Path) -> Result<bool> {
    let mut head = Vec::with_capacity(SNIFF_BYTES);
    File::open(path)
        .and_then(|file| file.take(SNIFF_BYTES as u64).read_to_end(&mut head))
        .map_err(IngestError::from)?;
    Ok(looks_like_html(&head))
}

pub(crate) fn looks_like_html(head: &[u8]) -> bool {
    const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
    const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
    if head.starts_with(ZIP_MAGIC) || head.starts_with(OLE_MAGIC) {
        return false;
    }
    let lower = String::from_utf8_lossy(head).to_lowercase();
    lower.contains("<table") || lower.contains("<html") || lower.contains("<!doctype html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html(b"<html><body><table>"));
        assert!(looks_like_html(b"\r\n  <TABLE border=1>"));
        assert!(!looks_like_html(b"PK\x03\x04<table>"));
        assert!(!looks_like_html(&[0xD0, 0xCF, 0x11, 0xE0, b'<']));
        assert!(!looks_like_html(b"Tipo Doc;Monto Neto"));
    }

    #[test]
    fn test_detect_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("ventas.CSV");
        std::fs::write(&csv, "a;b\n").unwrap();
        assert_eq!(detect_format(&csv).unwrap(), FileFormat::Delimited);

        let fake_xls = dir.path().join("honorarios.xls");
        std::fs::write(&fake_xls, "<html><table><tr><td>x</td></tr></table></html>").unwrap();
        assert_eq!(detect_format(&fake_xls).unwrap(), FileFormat::Html);
    }

    #[test]
    fn test_missing_file() {
        let err = detect_format("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::FileMissing(_))
        ));
    }
}
