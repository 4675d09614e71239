use anyhow::Context;
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info, warn};

use super::tabular::{CellValue, RawRow, Table, TableOrigin};
use crate::error::{IngestError, Result};

/// Number of data lines inspected when deciding on loose mode
pub const LOOSE_SAMPLE_LINES: usize = 200;

/// Parse a CSV/TXT ledger export into a rectangular table
pub fn parse_delimited<P: AsRef<Path>>(file_path: P) -> Result<Table> {
    let path = file_path.as_ref();
    info!("Parsing delimited file: {:?}", path);

    let content = read_text_lossy(path)?;
    parse_delimited_str(&content, &file_label(path))
}

/// Parse already-decoded delimited text
pub fn parse_delimited_str(content: &str, file: &str) -> Result<Table> {
    let header_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| IngestError::format(file, "file is empty"))?;

    let delimiter = sniff_delimiter(header_line, content);
    let loose = needs_loose_read(content, delimiter);
    debug!(
        "Delimiter {:?}, loose mode: {} ({})",
        delimiter as char, loose, file
    );

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true) // Ragged rows are handled below
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::format(file, format!("failed to read header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::format(file, "header row has no column names").into());
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            IngestError::format(file, format!("failed to read record {}: {}", idx + 2, e))
        })?;

        if !loose && record.len() > headers.len() {
            warn!(
                "{}: row {} has {} fields but the header has {}, extra fields dropped",
                file,
                idx + 2,
                record.len(),
                headers.len()
            );
        }

        // Table::new truncates or pads to the header width
        rows.push(RawRow::new(record.iter().map(CellValue::text).collect()));
    }

    Ok(Table::new(
        headers,
        rows,
        TableOrigin::Delimited { delimiter, loose },
    ))
}

/// Pick the field delimiter for a delimited export.
///
/// `;` wins whenever the header contains one, then `,`. Otherwise the
/// candidate producing the most consistent field count across the first
/// lines is used.
pub fn sniff_delimiter(header_line: &str, content: &str) -> u8 {
    if header_line.contains(';') {
        return b';';
    }
    if header_line.contains(',') {
        return b',';
    }

    let candidates: &[u8] = &[b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// True when any sampled data line splits into more fields than the header
pub fn needs_loose_read(content: &str, delimiter: u8) -> bool {
    let delim = delimiter as char;
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header_len = match lines.next() {
        Some(header) => header.split(delim).count(),
        None => return false,
    };

    lines
        .take(LOOSE_SAMPLE_LINES)
        .any(|line| line.split(delim).count() > header_len)
}

/// Read a text file as UTF-8, falling back to Windows-1252 for legacy exports
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(IngestError::from)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(decode_text(bytes))
}

pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => match s.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => s,
        },
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_prefers_semicolon() {
        let content = "Tipo Doc;Monto Neto,x\n33;1000\n";
        assert_eq!(sniff_delimiter("Tipo Doc;Monto Neto,x", content), b';');
    }

    #[test]
    fn test_sniff_comma() {
        assert_eq!(sniff_delimiter("a,b,c", "a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn test_sniff_tab() {
        let content = "a\tb\tc\n1\t2\t3\n";
        assert_eq!(sniff_delimiter("a\tb\tc", content), b'\t');
    }

    #[test]
    fn test_loose_detection() {
        let strict = "a;b;c\n1;2;3\n4;5;6\n";
        assert!(!needs_loose_read(strict, b';'));

        let ragged = "a;b;c\n1;2;3\n4;5;6;\n";
        assert!(needs_loose_read(ragged, b';'));
    }

    #[test]
    fn test_stray_trailing_delimiter_is_truncated() {
        let content = "a;b;c;d;e\n1;2;3;4;5\n6;7;8;9;10\n11;12;13;14;15;\n";
        let table = parse_delimited_str(content, "test.csv").unwrap();
        assert_eq!(table.width(), 5);
        assert_eq!(table.len(), 3);
        assert!(table.rows.iter().all(|r| r.len() == 5));
        assert_eq!(table.rows[2].get(4), &CellValue::Text("15".into()));
        assert_eq!(
            table.origin,
            TableOrigin::Delimited {
                delimiter: b';',
                loose: true
            }
        );
    }

    #[test]
    fn test_wide_row_past_the_sample_is_truncated() {
        let mut content = String::from("a;b;c\n");
        for i in 0..LOOSE_SAMPLE_LINES {
            content.push_str(&format!("{};2;3\n", i));
        }
        content.push_str("x;y;z;extra\n");

        let table = parse_delimited_str(&content, "test.csv").unwrap();
        assert_eq!(table.len(), LOOSE_SAMPLE_LINES + 1);
        assert!(table.rows.iter().all(|r| r.len() == 3));
        assert_eq!(
            table.rows[LOOSE_SAMPLE_LINES].get(2),
            &CellValue::Text("z".into())
        );
        assert_eq!(
            table.origin,
            TableOrigin::Delimited {
                delimiter: b';',
                loose: false
            }
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let content = "a,b,c\n1,2\n";
        let table = parse_delimited_str(content, "test.csv").unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert!(table.rows[0].get(2).is_empty());
    }

    #[test]
    fn test_empty_file_is_format_error() {
        let err = parse_delimited_str("\n\n", "vacio.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::FormatError { .. })
        ));
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Razón" encoded as Windows-1252
        let bytes = vec![b'R', b'a', b'z', 0xF3, b'n'];
        assert_eq!(decode_text(bytes), "Razón");
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = "\u{feff}Tipo Doc;Neto".as_bytes().to_vec();
        assert_eq!(decode_text(bytes), "Tipo Doc;Neto");
    }
}
