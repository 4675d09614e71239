// Ancillary extractors - honorarios withholding and prior-period VAT credit
//
// Both are best-effort: a failure is logged as a soft issue and the
// corresponding figures come back empty instead of aborting the summary.

pub mod honorarios;
pub mod remanente;

use tracing::warn;

use crate::error::SoftIssue;

pub use honorarios::{extract_honorarios, HonorariosSummary};
pub use remanente::extract_remanente;

pub(crate) fn report_unavailable(source: &'static str, reason: impl Into<String>) {
    let issue = SoftIssue::AncillaryUnavailable {
        source,
        reason: reason.into(),
    };
    warn!("{}", issue);
}
