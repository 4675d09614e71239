//! Storage-layout discovery
//!
//! The fetcher stores each company's downloads as
//! `companies/<id>/{dcv,bhe,f29_remanente}/<YYYY>/<MM>/`. This module turns
//! a (company, period) pair into a `SummaryRequest` by picking the newest
//! file that matches each input's naming convention.

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::ledger::Period;
use crate::tax::SummaryRequest;

const HONORARIOS_PATTERNS: [&str; 4] = ["*.html", "*.htm", "*.xls", "*.xlsx"];
const REMANENTE_PATTERNS: [&str; 4] = ["*.json", "*.html", "*.pdf", "*.txt"];

/// Root of the per-company storage tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn company_dir(&self, company_id: &str) -> PathBuf {
        self.root.join("companies").join(company_id)
    }

    fn period_dir(&self, company_id: &str, kind: &str, period: Period) -> PathBuf {
        self.company_dir(company_id)
            .join(kind)
            .join(period.year.to_string())
            .join(format!("{:02}", period.month))
    }

    pub fn dcv_dir(&self, company_id: &str, period: Period) -> PathBuf {
        self.period_dir(company_id, "dcv", period)
    }

    pub fn honorarios_dir(&self, company_id: &str, period: Period) -> PathBuf {
        self.period_dir(company_id, "bhe", period)
    }

    pub fn remanente_dir(&self, company_id: &str, period: Period) -> PathBuf {
        self.period_dir(company_id, "f29_remanente", period)
    }

    /// Display name from `profile.json`: `razon_social`, else `rut`, else the id
    pub fn company_name(&self, company_id: &str) -> String {
        let profile_path = self.company_dir(company_id).join("profile.json");
        let profile = match std::fs::read_to_string(&profile_path) {
            Ok(text) => text,
            Err(_) => return company_id.to_string(),
        };
        let data: Value = match serde_json::from_str(&profile) {
            Ok(data) => data,
            Err(e) => {
                warn!("Ignoring unreadable profile {:?}: {}", profile_path, e);
                return company_id.to_string();
            }
        };
        ["razon_social", "rut"]
            .iter()
            .filter_map(|key| data.get(key).and_then(Value::as_str))
            .find(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| company_id.to_string())
    }

    /// Resolve every input file of a period
    pub fn resolve(&self, company_id: &str, period: Period) -> Result<SummaryRequest> {
        let tag = period.tag();
        let dcv_dir = self.dcv_dir(company_id, period);

        let sales_patterns = [format!("RCV_VENTA_*_{}*.csv", tag), format!("VENTAS_{}*.csv", tag)];
        let purchases_patterns = [format!("RCV_COMPRA_*_{}*.csv", tag), format!("COMPRAS_{}*.csv", tag)];

        let sales_path = pick_latest_file(&dcv_dir, &sales_patterns)
            .ok_or_else(|| IngestError::FileMissing(dcv_dir.join(&sales_patterns[0])))?;
        let purchases_path = pick_latest_file(&dcv_dir, &purchases_patterns)
            .ok_or_else(|| IngestError::FileMissing(dcv_dir.join(&purchases_patterns[0])))?;

        let honorarios_path =
            pick_latest_file(&self.honorarios_dir(company_id, period), &HONORARIOS_PATTERNS);
        let remanente_path =
            pick_latest_file(&self.remanente_dir(company_id, period), &REMANENTE_PATTERNS);

        info!(
            "Resolved {} {}: ventas={:?} compras={:?} honorarios={:?} remanente={:?}",
            company_id, period, sales_path, purchases_path, honorarios_path, remanente_path
        );

        Ok(SummaryRequest {
            company: self.company_name(company_id),
            period,
            sales_path,
            purchases_path,
            honorarios_path,
            remanente_path,
        })
    }
}

/// Compile a `*`-only wildcard into an anchored regex
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

/// Lexicographically last file matching the first pattern that matches anything
pub fn pick_latest_file<S: AsRef<str>>(dir: &Path, patterns: &[S]) -> Option<PathBuf> {
    let names: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    patterns.iter().find_map(|pattern| {
        let re = wildcard_regex(pattern.as_ref())?;
        let latest = names.iter().filter(|name| re.is_match(name)).max()?;
        debug!("{:?}: {} matched {}", dir, pattern.as_ref(), latest);
        Some(dir.join(latest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("RCV_VENTA_*_202503*.csv").unwrap();
        assert!(re.is_match("RCV_VENTA_76123456-7_202503.csv"));
        assert!(re.is_match("RCV_VENTA_76123456-7_202503_v2.csv"));
        assert!(!re.is_match("RCV_VENTA_76123456-7_202503.csv.bak"));
        assert!(!re.is_match("RCV_VENTA_76123456-7_202504.csv"));
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("VENTAS_202503_z.csv"), "").unwrap();
        fs::write(dir.path().join("RCV_VENTA_1_202503_a.csv"), "").unwrap();
        fs::write(dir.path().join("RCV_VENTA_1_202503_b.csv"), "").unwrap();

        let picked = pick_latest_file(
            dir.path(),
            &["RCV_VENTA_*_202503*.csv", "VENTAS_202503*.csv"],
        )
        .unwrap();
        assert!(picked.ends_with("RCV_VENTA_1_202503_b.csv"));
    }

    #[test]
    fn test_missing_directory_picks_nothing() {
        assert_eq!(pick_latest_file(Path::new("/nonexistent"), &["*.json"]), None);
    }

    #[test]
    fn test_company_name_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        assert_eq!(layout.company_name("acme"), "acme");

        let company = layout.company_dir("acme");
        fs::create_dir_all(&company).unwrap();
        fs::write(company.join("profile.json"), r#"{"rut": "76123456-7"}"#).unwrap();
        assert_eq!(layout.company_name("acme"), "76123456-7");

        fs::write(
            company.join("profile.json"),
            r#"{"razon_social": "Acme SpA", "rut": "76123456-7"}"#,
        )
        .unwrap();
        assert_eq!(layout.company_name("acme"), "Acme SpA");
    }

    #[test]
    fn test_resolve_requires_both_ledgers() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let period = Period::new(2025, 3).unwrap();
        let dcv = layout.dcv_dir("acme", period);
        fs::create_dir_all(&dcv).unwrap();
        fs::write(dcv.join("VENTAS_202503.csv"), "").unwrap();

        let err = layout.resolve("acme", period).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::FileMissing(_))
        ));

        fs::write(dcv.join("COMPRAS_202503.csv"), "").unwrap();
        let request = layout.resolve("acme", period).unwrap();
        assert!(request.sales_path.ends_with("VENTAS_202503.csv"));
        assert!(request.purchases_path.ends_with("COMPRAS_202503.csv"));
        assert_eq!(request.honorarios_path, None);
        assert_eq!(request.company, "acme");
    }
}
