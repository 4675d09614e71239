//! F29 Resumen - monthly VAT summary builder for Chilean SII exports
//!
//! Reads the sales and purchase registers (RCV), the receipt summary, the
//! honorarios report and the prior-period F29 carryover, and produces one
//! `MonthlyTaxSummary` per company and period.

pub mod ancillary;
pub mod config;
pub mod discovery;
pub mod error;
pub mod importers;
pub mod ledger;
pub mod money;
pub mod schema;
pub mod tax;
pub mod utils;

pub use config::{ConfigFile, SummaryOptions, DEFAULT_PPM_FACTOR};
pub use error::{IngestError, Result, SoftIssue};
pub use ledger::{LedgerSide, LedgerSummary, Period};
pub use tax::{build_monthly_tax_summary, MonthlyTaxSummary, SummaryRequest};
