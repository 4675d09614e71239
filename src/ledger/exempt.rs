use tracing::debug;

use super::{LedgerSide, LedgerSummary};
use crate::money::DocumentTypeCode;

const SALES_EXEMPT_CODES: [DocumentTypeCode; 2] = [
    DocumentTypeCode::FACTURA_EXENTA,
    DocumentTypeCode::BOLETA_EXENTA,
];

const PURCHASE_EXEMPT_CODES: [DocumentTypeCode; 1] = [DocumentTypeCode::FACTURA_EXENTA];

/// Exempt / no-VAT document types for a ledger side
pub fn exempt_codes(side: LedgerSide) -> &'static [DocumentTypeCode] {
    match side {
        LedgerSide::Sales => &SALES_EXEMPT_CODES,
        LedgerSide::Purchases => &PURCHASE_EXEMPT_CODES,
    }
}

/// Exempt buckets carry no VAT, so their net must equal their total.
/// Sets net to total where it doesn't and moves the difference into the
/// ledger's net total. Returns the total net adjustment.
pub fn rebalance_exempt(summary: &mut LedgerSummary) -> i64 {
    let mut adjustment = 0;
    for code in exempt_codes(summary.side) {
        let Some(bucket) = summary.by_code.get_mut(code) else {
            continue;
        };
        if bucket.total > 0 && bucket.vat == 0 && bucket.net != bucket.total {
            let delta = bucket.total - bucket.net;
            debug!(
                "Exempt code {}: net {} set to total {}",
                code, bucket.net, bucket.total
            );
            bucket.net = bucket.total;
            adjustment += delta;
        }
    }
    summary.totals.net += adjustment;
    adjustment
}
