//! Honorarios (BHE) withholding summary
//!
//! SII serves the same report in several shapes: a form with hidden
//! `liquido1/3/4` inputs, an HTML listing ending in a "Totales" row, a plain
//! HTML listing, or a real spreadsheet. Each shape has one strategy; the
//! strategies run in order and the first one that yields any figure wins.
//! A complete set of hidden fields beats the Totales row; a partial set only
//! counts when there is no Totales row.

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use super::report_unavailable;
use crate::importers::{
    delimited::{decode_text, file_label},
    file_detector::{self, FileFormat},
    html_table, spreadsheet, Table,
};
use crate::money::{parse_money, parse_money_str};
use crate::schema::{find_column, find_column_relaxed, CanonicalKey};

const BRUTO_ALIASES: [&str; 2] = ["brutos", "bruto"];
const RETENIDO_ALIASES: [&str; 3] = ["retenido", "retencion", "retenciones"];
const PAGADO_ALIASES: [&str; 4] = ["pagado", "liquido", "liquidoapagar", "liquidoapago"];
const ESTADO_ALIASES: [&str; 1] = ["estado"];

/// Only receipts in this state count towards the totals
const ACTIVE_STATE: &str = "VIGENTE";

/// Gross, withheld and net-paid honorarios for the period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HonorariosSummary {
    pub bruto: Option<i64>,
    pub retenido: Option<i64>,
    pub pagado: Option<i64>,
}

impl HonorariosSummary {
    pub fn is_empty(&self) -> bool {
        self.bruto.is_none() && self.retenido.is_none() && self.pagado.is_none()
    }
}

/// What every strategy gets to look at
pub struct HonorariosSource<'a> {
    pub path: &'a Path,
    pub format: FileFormat,
    /// Decoded document text, only for text-based formats
    pub text: Option<String>,
}

type Extractor = fn(&HonorariosSource) -> Option<HonorariosSummary>;

const STRATEGIES: [(&str, Extractor); 5] = [
    ("hidden fields", from_hidden_fields),
    ("totales row", from_totals_row),
    ("partial hidden fields", from_partial_hidden_fields),
    ("html table", from_html_table),
    ("spreadsheet columns", from_spreadsheet),
];

/// Run the strategy chain over one honorarios export.
///
/// Never fails: a missing or unreadable file yields an empty summary.
pub fn extract_honorarios(path: &Path) -> HonorariosSummary {
    let format = match file_detector::detect_format(path) {
        Ok(format) => format,
        Err(e) => {
            report_unavailable("honorarios", e.to_string());
            return HonorariosSummary::default();
        }
    };

    let text = match format {
        FileFormat::Html | FileFormat::Delimited => match std::fs::read(path) {
            Ok(bytes) => Some(decode_text(bytes)),
            Err(e) => {
                report_unavailable("honorarios", format!("{}: {}", file_label(path), e));
                return HonorariosSummary::default();
            }
        },
        _ => None,
    };

    let source = HonorariosSource { path, format, text };
    for (name, strategy) in STRATEGIES {
        if let Some(summary) = strategy(&source).filter(|s| !s.is_empty()) {
            info!(
                "Honorarios from {} ({}): bruto={:?} retenido={:?} pagado={:?}",
                file_label(path),
                name,
                summary.bruto,
                summary.retenido,
                summary.pagado
            );
            return summary;
        }
        debug!("Honorarios strategy '{}' found nothing", name);
    }

    report_unavailable(
        "honorarios",
        format!("no figures found in {}", file_label(path)),
    );
    HonorariosSummary::default()
}

fn hidden_value(text: &str, name: &str) -> Option<i64> {
    let pattern = format!(
        r#"(?i)name=["']{}["']\s+value=["']([^"']+)["']"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    parse_money_str(caps.get(1)?.as_str())
}

fn hidden_summary(text: &str) -> HonorariosSummary {
    HonorariosSummary {
        bruto: hidden_value(text, "liquido1"),
        retenido: hidden_value(text, "liquido3"),
        pagado: hidden_value(text, "liquido4"),
    }
}

/// `<input type="hidden" name="liquido1" value="...">` style forms with
/// all three fields present
pub fn from_hidden_fields(source: &HonorariosSource) -> Option<HonorariosSummary> {
    let summary = hidden_summary(source.text.as_deref()?);
    let complete = summary.bruto.is_some() && summary.retenido.is_some() && summary.pagado.is_some();
    complete.then_some(summary)
}

/// Whatever hidden fields parsed, once no Totales row was found
pub fn from_partial_hidden_fields(source: &HonorariosSource) -> Option<HonorariosSummary> {
    let summary = hidden_summary(source.text.as_deref()?);
    (!summary.is_empty()).then_some(summary)
}

/// Last three numeric cells up to the end of the "Totales" row
pub fn from_totals_row(source: &HonorariosSource) -> Option<HonorariosSummary> {
    let text = source.text.as_deref()?;
    let row_re = Regex::new(r"(?is)<tr[^>]*>.*?Totales.*?</tr>").ok()?;
    let cell_re =
        Regex::new(r"(?is)<td[^>]*>\s*(?:<div[^>]*>)?\s*([0-9.,]+)\s*(?:</div>)?\s*</td>").ok()?;

    let row = row_re.find(text)?.as_str();
    let nums: Vec<&str> = cell_re
        .captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if nums.len() < 3 {
        return None;
    }

    let last = &nums[nums.len() - 3..];
    let summary = HonorariosSummary {
        bruto: parse_money_str(last[0]),
        retenido: parse_money_str(last[1]),
        pagado: parse_money_str(last[2]),
    };
    (!summary.is_empty()).then_some(summary)
}

fn sum_column(table: &Table, col: Option<usize>) -> Option<i64> {
    let col = col?;
    Some(
        table
            .rows
            .iter()
            .filter_map(|row| parse_money(row.get(col)))
            .sum(),
    )
}

fn score_honorarios_headers(headers: &[String]) -> usize {
    let has_bruto = find_column_relaxed(headers, &BRUTO_ALIASES).is_some();
    let has_retenido = find_column_relaxed(headers, &RETENIDO_ALIASES).is_some();
    usize::from(has_bruto && has_retenido)
}

/// Column sums over the listing table, counting only active receipts
pub fn from_html_table(source: &HonorariosSource) -> Option<HonorariosSummary> {
    let text = source.text.as_deref()?;
    if !text.to_lowercase().contains("<table") {
        return None;
    }
    let mut table =
        html_table::html_to_table(text, &file_label(source.path), score_honorarios_headers).ok()?;

    let bruto = find_column_relaxed(&table.headers, &BRUTO_ALIASES);
    let retenido = find_column_relaxed(&table.headers, &RETENIDO_ALIASES);
    let pagado = find_column_relaxed(&table.headers, &PAGADO_ALIASES);
    if bruto.is_none() && retenido.is_none() && pagado.is_none() {
        return None;
    }

    if let Some(estado) = find_column_relaxed(&table.headers, &ESTADO_ALIASES) {
        table.retain_rows(|row| row.get(estado).as_text().trim().to_uppercase() == ACTIVE_STATE);
    }

    Some(HonorariosSummary {
        bruto: sum_column(&table, bruto),
        retenido: sum_column(&table, retenido),
        pagado: sum_column(&table, pagado),
    })
}

/// Column sums over a real spreadsheet export. A workbook that fails to
/// open, or opens without usable columns, is re-read as HTML.
pub fn from_spreadsheet(source: &HonorariosSource) -> Option<HonorariosSummary> {
    if source.format != FileFormat::Spreadsheet {
        return None;
    }
    match spreadsheet::parse_spreadsheet(source.path) {
        Ok(table) if table.has_usable_columns() => spreadsheet_columns(&table),
        Ok(_) => {
            debug!("{} has no usable columns, trying HTML", file_label(source.path));
            reread_as_html(source.path)
        }
        Err(e) => {
            debug!("Structured read of {} failed ({}), trying HTML", file_label(source.path), e);
            reread_as_html(source.path)
        }
    }
}

fn reread_as_html(path: &Path) -> Option<HonorariosSummary> {
    let bytes = std::fs::read(path).ok()?;
    let source = HonorariosSource {
        path,
        format: FileFormat::Html,
        text: Some(decode_text(bytes)),
    };
    // Every strategy but this one
    STRATEGIES[..STRATEGIES.len() - 1]
        .iter()
        .find_map(|(_, strategy)| strategy(&source).filter(|s| !s.is_empty()))
}

fn spreadsheet_columns(table: &Table) -> Option<HonorariosSummary> {
    let bruto = find_column(&table.headers, CanonicalKey::NetAmount.aliases())
        .or_else(|| find_column(&table.headers, &BRUTO_ALIASES));
    let retenido = find_column(&table.headers, &RETENIDO_ALIASES);
    let pagado = find_column(&table.headers, &PAGADO_ALIASES);
    if bruto.is_none() && retenido.is_none() && pagado.is_none() {
        return None;
    }

    Some(HonorariosSummary {
        bruto: sum_column(table, bruto),
        retenido: sum_column(table, retenido),
        pagado: sum_column(table, pagado),
    })
}
