//! Monthly tax summary builder
//!
//! Runs the whole pipeline for one (company, period): both ledgers, the
//! receipt merge, exempt rebalancing, the ancillary extractors and the final
//! tax figures. Nothing is written anywhere; the caller renders or stores
//! the returned record.

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::computation::{compute_ppm, compute_totals, PpmSummary, TaxInputs, TaxTotals};
use crate::ancillary::{extract_honorarios, extract_remanente, HonorariosSummary};
use crate::config::SummaryOptions;
use crate::error::Result;
use crate::importers::PdfTextExtractor;
use crate::ledger::{
    boletas, build_items, exempt, summarize_ledger, AggregationStats, LedgerSide, LedgerTotals,
    Period, SummaryItem,
};

/// Input files for one period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub company: String,
    pub period: Period,
    pub sales_path: PathBuf,
    pub purchases_path: PathBuf,
    pub honorarios_path: Option<PathBuf>,
    pub remanente_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSection {
    pub items: Vec<SummaryItem>,
    pub total: LedgerTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasesSection {
    pub items: Vec<SummaryItem>,
    pub total: LedgerTotals,
    pub remanente: Option<i64>,
}

/// Row accounting kept next to the summary, never serialized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryDiagnostics {
    pub sales: AggregationStats,
    pub purchases: AggregationStats,
    pub boletas: Option<LedgerTotals>,
    /// Net moved by exempt rebalancing, sales then purchases
    pub exempt_adjustment: (i64, i64),
}

/// Canonical monthly summary, shaped for the PDF/JSON renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTaxSummary {
    pub company: String,
    pub period: Period,
    #[serde(rename = "ventas")]
    pub sales: SalesSection,
    #[serde(rename = "compras")]
    pub purchases: PurchasesSection,
    pub ppm: PpmSummary,
    pub honorarios: HonorariosSummary,
    pub impuesto_unico: i64,
    pub totales: TaxTotals,
    #[serde(skip)]
    pub diagnostics: SummaryDiagnostics,
}

/// Build the summary for one period
pub fn build_monthly_tax_summary(
    request: &SummaryRequest,
    options: &SummaryOptions,
    pdf: &dyn PdfTextExtractor,
) -> Result<MonthlyTaxSummary> {
    let period = request.period;
    info!("Building summary for {} ({})", request.company, period);

    let mut sales = summarize_ledger(
        &request.sales_path,
        LedgerSide::Sales,
        Some(period),
        options.silence_inconsistencies,
    )?;
    let mut purchases = summarize_ledger(
        &request.purchases_path,
        LedgerSide::Purchases,
        Some(period),
        options.silence_inconsistencies,
    )?;

    let boletas = boletas::apply_boletas(&mut sales, &request.sales_path, Some(period))?;

    let exempt_adjustment = (
        exempt::rebalance_exempt(&mut sales),
        exempt::rebalance_exempt(&mut purchases),
    );

    let remanente = match options.remanente_override {
        Some(value) => Some(value),
        None => request
            .remanente_path
            .as_deref()
            .and_then(|path| extract_remanente(path, pdf)),
    };

    let honorarios = request
        .honorarios_path
        .as_deref()
        .map(extract_honorarios)
        .unwrap_or_default();

    let ppm = compute_ppm(sales.totals.net, options.ppm_factor())?;
    let impuesto_unico = options.impuesto_unico.unwrap_or(0);

    let totales = compute_totals(&TaxInputs {
        sales: sales.totals,
        purchases: purchases.totals,
        remanente,
        ppm_pagado: ppm.pagado,
        honorarios_retenido: honorarios.retenido,
        impuesto_unico: Some(impuesto_unico),
    });

    info!(
        "Summary {}: ventas iva={} compras iva={} remanente={:?} ppm={} honorarios={:?} total={}",
        period,
        sales.totals.vat,
        purchases.totals.vat,
        remanente,
        ppm.pagado,
        honorarios.retenido,
        totales.total_a_pagar
    );

    Ok(MonthlyTaxSummary {
        company: request.company.clone(),
        period,
        sales: SalesSection {
            items: build_items(&sales),
            total: sales.totals,
        },
        purchases: PurchasesSection {
            items: build_items(&purchases),
            total: purchases.totals,
            remanente,
        },
        ppm,
        honorarios,
        impuesto_unico,
        totales,
        diagnostics: SummaryDiagnostics {
            sales: sales.stats,
            purchases: purchases.stats,
            boletas,
            exempt_adjustment,
        },
    })
}
