//! Error handling for the F29 summary core
//!
//! Fatal conditions are `IngestError` values raised through anyhow so callers
//! can recover the kind with `downcast_ref`. Soft conditions never abort a
//! computation; they are logged and counted as `SoftIssue`s.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::CanonicalKey;

/// Fatal ingestion errors; each one aborts processing of a single file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("file not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("schema error in {file}: required columns not found: {missing:?}")]
    SchemaError {
        file: String,
        missing: Vec<CanonicalKey>,
    },

    #[error("format error in {file}: {reason}")]
    FormatError { file: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::FormatError {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Soft conditions absorbed during a computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftIssue {
    /// Document-type code on a ledger row did not parse to an integer
    RowSkipped { row: usize, raw_code: String },
    /// `|total - (net + vat)| > 1` on a ledger row
    ConsistencyWarning {
        row: usize,
        net: i64,
        vat: i64,
        total: i64,
    },
    /// Honorarios or remanente extraction produced nothing
    AncillaryUnavailable { source: &'static str, reason: String },
}

impl fmt::Display for SoftIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftIssue::RowSkipped { row, raw_code } => {
                write!(f, "row {} skipped: unparseable document type {:?}", row, raw_code)
            }
            SoftIssue::ConsistencyWarning {
                row,
                net,
                vat,
                total,
            } => write!(
                f,
                "row {}: inconsistent total {} (net {} + vat {} = {})",
                row,
                total,
                net,
                vat,
                net + vat
            ),
            SoftIssue::AncillaryUnavailable { source, reason } => {
                write!(f, "{} unavailable: {}", source, reason)
            }
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = anyhow::Result<T>;
