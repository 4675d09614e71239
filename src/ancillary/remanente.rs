//! Prior-period VAT credit carried forward (F29 code 77, "remanente")

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::report_unavailable;
use crate::importers::{
    delimited::{file_label, read_text_lossy},
    file_detector::{self, FileFormat},
    CellValue, PdfTextExtractor,
};
use crate::money::{parse_money, parse_money_str};

/// JSON keys, current one first
pub const JSON_KEYS: [&str; 2] = ["codigo_77_remanente", "codigo_77"];

/// Labelled-amount patterns tried in order against free text
static TEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)remanente[^0-9]*([0-9.,]+)",
        r"(?i)codigo\s*77[^0-9]*([0-9.,]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Read the carryover amount from a JSON, text/HTML or PDF export.
///
/// `None` when the file is absent, unreadable or carries no amount.
pub fn extract_remanente(path: &Path, pdf: &dyn PdfTextExtractor) -> Option<i64> {
    let format = match file_detector::detect_format(path) {
        Ok(format) => format,
        Err(e) => {
            report_unavailable("remanente", e.to_string());
            return None;
        }
    };

    let value = match format {
        FileFormat::Json => from_json(path),
        FileFormat::Pdf => match pdf.extract_text(path) {
            Ok(text) => from_text(&text),
            Err(e) => {
                report_unavailable("remanente", format!("{:#}", e));
                return None;
            }
        },
        _ => match read_text_lossy(path) {
            Ok(text) => from_text(&text),
            Err(e) => {
                report_unavailable("remanente", format!("{:#}", e));
                return None;
            }
        },
    };

    match value {
        Some(amount) => info!("Remanente from {}: {}", file_label(path), amount),
        None => report_unavailable(
            "remanente",
            format!("no amount found in {}", file_label(path)),
        ),
    }
    value
}

fn from_json(path: &Path) -> Option<i64> {
    let text = read_text_lossy(path).ok()?;
    let data: Value = match serde_json::from_str(&text) {
        Ok(data) => data,
        Err(e) => {
            debug!("Invalid remanente JSON {}: {}", file_label(path), e);
            return None;
        }
    };
    json_amount(&data)
}

/// First present, non-null key wins; the value may be a number or a string
pub fn json_amount(data: &Value) -> Option<i64> {
    let value = JSON_KEYS
        .iter()
        .filter_map(|key| data.get(key))
        .find(|v| !v.is_null())?;
    match value {
        Value::Number(n) => parse_money(&CellValue::Number(n.as_f64()?)),
        Value::String(s) => parse_money_str(s),
        _ => None,
    }
}

/// Scan free text for the first labelled amount
pub fn from_text(text: &str) -> Option<i64> {
    // "Código 77" must match the plain-ASCII pattern
    let folded: String = text
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();

    TEXT_PATTERNS
        .iter()
        .find_map(|re| re.captures(&folded)?.get(1).map(|m| m.as_str()))
        .and_then(parse_money_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::NoPdfText;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_json_keys() {
        assert_eq!(json_amount(&json!({"codigo_77_remanente": 15000})), Some(15_000));
        assert_eq!(json_amount(&json!({"codigo_77": "12.345"})), Some(12_345));
        assert_eq!(
            json_amount(&json!({"codigo_77_remanente": null, "codigo_77": 5})),
            Some(5)
        );
        assert_eq!(json_amount(&json!({"otro": 1})), None);
    }

    #[test]
    fn test_text_patterns() {
        assert_eq!(from_text("Remanente de credito fiscal: $ 45.230"), Some(45_230));
        assert_eq!(from_text("Código 77 ..... 8.100"), Some(8_100));
        assert_eq!(from_text("Sin montos"), None);
    }

    #[test]
    fn test_remanente_pattern_has_priority() {
        assert_eq!(from_text("codigo 77: 1.000\nremanente 2.000"), Some(2_000));
    }

    #[test]
    fn test_extract_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("f29.json");
        fs::write(&json_path, r#"{"codigo_77_remanente": 30000}"#).unwrap();
        assert_eq!(extract_remanente(&json_path, &NoPdfText), Some(30_000));

        let txt_path = dir.path().join("f29.txt");
        fs::write(&txt_path, "REMANENTE CREDITO FISCAL 1.234").unwrap();
        assert_eq!(extract_remanente(&txt_path, &NoPdfText), Some(1_234));
    }

    #[test]
    fn test_pdf_without_extractor_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("f29.pdf");
        fs::write(&pdf_path, b"%PDF-1.4").unwrap();
        assert_eq!(extract_remanente(&pdf_path, &NoPdfText), None);
    }

    #[test]
    fn test_missing_file_is_none() {
        assert_eq!(
            extract_remanente(Path::new("/nonexistent/f29.json"), &NoPdfText),
            None
        );
    }
}
