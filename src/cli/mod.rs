use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use f29_resumen::{Period, SummaryOptions};

pub mod formatters;

#[derive(Parser)]
#[command(name = "f29-resumen")]
#[command(version, about = "Monthly F29 (IVA) summary from SII ledger exports")]
#[command(
    long_about = "Builds the monthly tax summary for one company and period from the SII sales/purchase registers (RCV), receipt summaries, honorarios (BHE) reports and the prior-period F29 carryover."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Configuration file (default: <config dir>/f29-resumen/config.toml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the summary from explicit file paths
    Summary {
        /// Period (YYYY-MM, MM/YYYY or YYYYMM)
        #[arg(short, long, value_parser = parse_period)]
        period: Period,

        /// Sales register export (CSV/TXT/XLS/XLSX/HTML)
        #[arg(long = "ventas", value_name = "PATH")]
        sales: PathBuf,

        /// Purchase register export
        #[arg(long = "compras", value_name = "PATH")]
        purchases: PathBuf,

        /// Honorarios (BHE) report
        #[arg(long, value_name = "PATH")]
        honorarios: Option<PathBuf>,

        /// F29 carryover export (JSON, HTML, TXT or PDF)
        #[arg(long, value_name = "PATH")]
        remanente: Option<PathBuf>,

        /// Company name shown in the summary
        #[arg(long, default_value = "")]
        company: String,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Build the summary from the companies/<id>/... storage tree
    Storage {
        /// Company id (directory name under companies/)
        #[arg(long = "company-id")]
        company_id: String,

        /// Period (YYYY-MM, MM/YYYY or YYYYMM)
        #[arg(short, long, value_parser = parse_period)]
        period: Period,

        /// Storage root (overrides `storage_root` from the config file)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Show how a file is detected, parsed and mapped to ledger columns
    Inspect {
        /// Path to the file
        file: PathBuf,
    },
}

/// Flags that override the config file for one run
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// PPM factor, e.g. 0.00125
    #[arg(long = "ppm-factor", value_parser = parse_decimal)]
    pub ppm_factor: Option<Decimal>,

    /// Use this carryover instead of reading the remanente export
    #[arg(long = "remanente-monto", value_name = "PESOS", allow_negative_numbers = true)]
    pub remanente_override: Option<i64>,

    /// Flat impuesto unico amount
    #[arg(long = "impuesto-unico", value_name = "PESOS", allow_negative_numbers = true)]
    pub impuesto_unico: Option<i64>,

    /// Log ledger rows whose net + IVA does not match the total
    #[arg(long = "show-inconsistencies")]
    pub show_inconsistencies: bool,
}

impl OverrideArgs {
    /// Layer these flags over options loaded from the config file
    pub fn apply(&self, mut options: SummaryOptions) -> SummaryOptions {
        if self.ppm_factor.is_some() {
            options.ppm_factor = self.ppm_factor;
        }
        if self.remanente_override.is_some() {
            options.remanente_override = self.remanente_override;
        }
        if self.impuesto_unico.is_some() {
            options.impuesto_unico = self.impuesto_unico;
        }
        if self.show_inconsistencies {
            options.silence_inconsistencies = false;
        }
        options
    }
}

fn parse_period(s: &str) -> Result<Period, String> {
    Period::from_str(s).map_err(|e| e.to_string())
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s.trim()).map_err(|e| format!("invalid decimal {:?}: {}", s, e))
}
