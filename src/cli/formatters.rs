//! Terminal output for summaries and file inspection

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use f29_resumen::ledger::{LedgerTotals, SummaryItem};
use f29_resumen::schema::CanonicalKey;
use f29_resumen::utils::{format_amount, format_clp, format_factor_percent, month_label};
use f29_resumen::MonthlyTaxSummary;

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Concepto")]
    concepto: String,
    #[tabled(rename = "Cod.")]
    code: String,
    #[tabled(rename = "Neto")]
    neto: String,
    #[tabled(rename = "IVA")]
    iva: String,
    #[tabled(rename = "Total")]
    total: String,
}

fn ledger_table(items: &[SummaryItem], totals: &LedgerTotals, total_label: &str) -> String {
    let mut rows: Vec<ItemRow> = items
        .iter()
        .map(|item| ItemRow {
            concepto: item.concepto.clone(),
            code: item.code.to_string(),
            neto: format_amount(Some(item.neto)),
            iva: format_amount(Some(item.iva)),
            total: format_amount(Some(item.total)),
        })
        .collect();

    rows.push(ItemRow {
        concepto: total_label.bold().to_string(),
        code: String::new(),
        neto: format_amount(Some(totals.net)).bold().to_string(),
        iva: format_amount(Some(totals.vat)).bold().to_string(),
        total: format_amount(Some(totals.total)).bold().to_string(),
    });

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align all columns except Concepto (0)
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

fn line(label: &str, value: String) -> String {
    format!("\n{:<28} {:>16}", label.bold(), value)
}

/// Format a summary for terminal output
pub fn format_summary_table(summary: &MonthlyTaxSummary) -> String {
    let mut output = String::new();

    let company = if summary.company.is_empty() {
        "(sin nombre)".to_string()
    } else {
        summary.company.clone()
    };
    output.push_str(&format!(
        "\n{} {} - {} {}\n\n",
        "Resumen F29".cyan().bold(),
        company.bold(),
        month_label(summary.period.month),
        summary.period.year
    ));

    output.push_str(&format!("{}\n", "Ventas".bold()));
    output.push_str(&ledger_table(
        &summary.sales.items,
        &summary.sales.total,
        "Total ventas",
    ));

    output.push_str(&format!("\n\n{}\n", "Compras".bold()));
    output.push_str(&ledger_table(
        &summary.purchases.items,
        &summary.purchases.total,
        "Total compras",
    ));
    output.push_str(&line(
        "Remanente mes anterior:",
        format_amount(summary.purchases.remanente),
    ));

    output.push_str(&format!("\n\n{}", "━".repeat(46).bright_black()));
    output.push_str(&line("PPM base:", format_amount(Some(summary.ppm.base))));
    output.push_str(&line("PPM factor:", format_factor_percent(summary.ppm.factor)));
    output.push_str(&line("PPM a pagar:", format_amount(Some(summary.ppm.pagado))));
    output.push_str(&line(
        "Honorarios brutos:",
        format_amount(summary.honorarios.bruto),
    ));
    output.push_str(&line(
        "Retencion honorarios:",
        format_amount(summary.honorarios.retenido),
    ));
    output.push_str(&line(
        "Honorarios pagados:",
        format_amount(summary.honorarios.pagado),
    ));
    output.push_str(&line(
        "Impuesto unico:",
        format_amount(Some(summary.impuesto_unico)),
    ));

    let totales = &summary.totales;
    output.push_str(&format!("\n\n{}", "━".repeat(46).bright_black()));
    output.push_str(&line("IVA debito:", format_amount(Some(totales.iva_debito))));
    output.push_str(&line("IVA credito:", format_amount(Some(totales.iva_credito))));

    let determinado = format_amount(Some(totales.iva_pagar_determinado));
    let determinado = if totales.iva_pagar_determinado < 0 {
        format!("{} (a favor)", determinado).yellow().to_string()
    } else {
        determinado
    };
    output.push_str(&line("IVA determinado:", determinado));
    output.push_str(&format!(
        "\n{:<28} {:>16}\n",
        "TOTAL A PAGAR:".bold(),
        format_clp(totales.total_a_pagar).green().bold()
    ));

    output
}

/// Serialize any report for `--json`
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// What `inspect` found out about a file
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub file: String,
    pub format: String,
    pub origin: Option<String>,
    pub sheets: Vec<String>,
    pub headers: Vec<String>,
    pub columns: Vec<(CanonicalKey, String)>,
    pub rows: usize,
    pub missing_required: Vec<CanonicalKey>,
}

pub fn format_inspect(report: &InspectReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} Inspecting file: {}\n\n",
        "📊".cyan().bold(),
        report.file.green()
    ));
    output.push_str(&format!("{:<12} {}\n", "Format:".bold(), report.format));
    if let Some(origin) = &report.origin {
        output.push_str(&format!("{:<12} {}\n", "Read as:".bold(), origin));
    }
    if !report.sheets.is_empty() {
        output.push_str(&format!("{:<12} {}\n", "Sheets:".bold(), report.sheets.join(", ")));
    }
    output.push_str(&format!("{:<12} {}\n", "Rows:".bold(), report.rows));

    if !report.headers.is_empty() {
        output.push_str(&format!("\n{}\n", "Headers:".bold()));
        for (idx, header) in report.headers.iter().enumerate() {
            output.push_str(&format!("  [{}] {}\n", idx, header.yellow()));
        }
    }

    if !report.columns.is_empty() {
        output.push_str(&format!("\n{}\n", "Ledger columns:".bold()));
        for (key, header) in &report.columns {
            output.push_str(&format!("  {:<20} <- {}\n", key.as_str(), header));
        }
    }

    if !report.missing_required.is_empty() {
        let names: Vec<&str> = report.missing_required.iter().map(|k| k.as_str()).collect();
        output.push_str(&format!(
            "\n{} Not usable as a ledger, missing: {}\n",
            "⚠".yellow().bold(),
            names.join(", ")
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_lists_missing_columns() {
        colored::control::set_override(false);
        let report = InspectReport {
            file: "ventas.csv".to_string(),
            format: "delimited".to_string(),
            origin: Some("delimited ';'".to_string()),
            sheets: Vec::new(),
            headers: vec!["Folio".to_string()],
            columns: Vec::new(),
            rows: 3,
            missing_required: vec![CanonicalKey::DocumentTypeCode, CanonicalKey::NetAmount],
        };
        let out = format_inspect(&report);
        assert!(out.contains("[0] Folio"));
        assert!(out.contains("missing: document_type_code, net_amount"));
    }
}
