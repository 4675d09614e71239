use serde::Serialize;

use super::{LedgerSide, LedgerSummary};
use crate::money::DocumentTypeCode;

const SALES_LABELS: &[(DocumentTypeCode, &str)] = &[
    (DocumentTypeCode::FACTURA, "Factura electronica"),
    (DocumentTypeCode::FACTURA_EXENTA, "Factura exenta / no afecta"),
    (DocumentTypeCode::NOTA_CREDITO, "Nota de credito electronica"),
    (DocumentTypeCode::NOTA_DEBITO, "Nota de debito electronica"),
    (DocumentTypeCode::NOTA_DEBITO_COMPAT, "Nota de debito (compatibilidad)"),
    (DocumentTypeCode::BOLETA_AFECTA, "Boleta afecta electronica"),
    (DocumentTypeCode::BOLETA_MEDIO_ELECTRONICO, "Boleta medio electronico"),
    (DocumentTypeCode::BOLETA_EXENTA, "Boleta exenta electronica"),
    (DocumentTypeCode::LIQUIDACION_FACTURA, "Liquidacion de factura"),
];

const PURCHASE_LABELS: &[(DocumentTypeCode, &str)] = &[
    (DocumentTypeCode::FACTURA, "Factura electronica"),
    (DocumentTypeCode::FACTURA_EXENTA, "Factura exenta / no afecta"),
    (DocumentTypeCode::NOTA_CREDITO, "Nota de credito electronica"),
    (DocumentTypeCode::NOTA_DEBITO, "Nota de debito electronica"),
    (DocumentTypeCode::FACTURA_COMPRA, "Factura de compra"),
];

/// One rendered line of a ledger section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryItem {
    pub concepto: String,
    pub neto: i64,
    pub iva: i64,
    pub total: i64,
    pub code: DocumentTypeCode,
}

fn label_table(side: LedgerSide) -> &'static [(DocumentTypeCode, &'static str)] {
    match side {
        LedgerSide::Sales => SALES_LABELS,
        LedgerSide::Purchases => PURCHASE_LABELS,
    }
}

pub fn label_for(side: LedgerSide, code: DocumentTypeCode) -> String {
    label_table(side)
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("Codigo {}", code))
}

/// Labelled items: known codes in their fixed order, then the rest ascending
pub fn build_items(summary: &LedgerSummary) -> Vec<SummaryItem> {
    let preferred: Vec<DocumentTypeCode> =
        label_table(summary.side).iter().map(|(c, _)| *c).collect();

    let mut codes: Vec<DocumentTypeCode> = preferred
        .iter()
        .filter(|c| summary.by_code.contains_key(c))
        .copied()
        .collect();
    codes.extend(
        summary
            .by_code
            .keys()
            .filter(|c| !preferred.contains(c))
            .copied(),
    );

    codes
        .into_iter()
        .filter_map(|code| summary.by_code.get(&code))
        .map(|bucket| SummaryItem {
            concepto: label_for(summary.side, bucket.code),
            neto: bucket.net,
            iva: bucket.vat,
            total: bucket.total,
            code: bucket.code,
        })
        .collect()
}
