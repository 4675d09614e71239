//! Run configuration
//!
//! `SummaryOptions` is what the summary builder consumes. `ConfigFile` is
//! the optional TOML file the binary reads; command-line flags override it.

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// 0.125% of net sales, used only when no factor is configured
pub const DEFAULT_PPM_FACTOR: Decimal = Decimal::from_parts(125, 0, 0, false, 5);

const APP_DIR: &str = "f29-resumen";
const CONFIG_FILENAME: &str = "config.toml";

/// Explicit parameters of one summary computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Do not log ledger rows where net + vat differs from total
    pub silence_inconsistencies: bool,
    pub ppm_factor: Option<Decimal>,
    /// Carryover to use instead of reading the remanente export
    pub remanente_override: Option<i64>,
    pub impuesto_unico: Option<i64>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            silence_inconsistencies: true,
            ppm_factor: None,
            remanente_override: None,
            impuesto_unico: None,
        }
    }
}

impl SummaryOptions {
    pub fn ppm_factor(&self) -> Decimal {
        self.ppm_factor.unwrap_or(DEFAULT_PPM_FACTOR)
    }
}

/// On-disk configuration (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub silence_inconsistencies: Option<bool>,
    pub ppm_factor: Option<Decimal>,
    pub remanente: Option<i64>,
    pub impuesto_unico: Option<i64>,
    /// Root of the `companies/<id>/...` storage tree
    pub storage_root: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        debug!("Loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    /// `<config_home>/f29-resumen/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dir_spec::config_home().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
    }

    /// Load an explicit path, else the default location if it exists
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_options(&self) -> SummaryOptions {
        let defaults = SummaryOptions::default();
        SummaryOptions {
            silence_inconsistencies: self
                .silence_inconsistencies
                .unwrap_or(defaults.silence_inconsistencies),
            ppm_factor: self.ppm_factor,
            remanente_override: self.remanente,
            impuesto_unico: self.impuesto_unico,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_factor() {
        assert_eq!(DEFAULT_PPM_FACTOR, dec!(0.00125));
        assert_eq!(SummaryOptions::default().ppm_factor(), dec!(0.00125));
        assert!(SummaryOptions::default().silence_inconsistencies);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "silence_inconsistencies = false\nppm_factor = \"0.0125\"\nremanente = 5000\n",
        )
        .unwrap();

        let options = ConfigFile::load(&path).unwrap().to_options();
        assert!(!options.silence_inconsistencies);
        assert_eq!(options.ppm_factor(), dec!(0.0125));
        assert_eq!(options.remanente_override, Some(5000));
        assert_eq!(options.impuesto_unico, None);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ppm_factor = [").unwrap();
        assert!(ConfigFile::load(&path).is_err());

        std::fs::write(&path, "unknown_key = 1").unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(ConfigFile::discover(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }
}
