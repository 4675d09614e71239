// Receipt (boleta) sub-summary merged into the sales ledger

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{LedgerSide, LedgerSummary, LedgerTotals, Period};
use crate::error::{IngestError, Result};
use crate::importers::{self, delimited::file_label};
use crate::money::{parse_money, DocumentTypeCode};
use crate::schema::{CanonicalKey, ResolvedSchema};

pub const BOLETAS_PREFIX: &str = "VENTAS_BOLETAS_RESUMEN_";

/// Sales bucket receiving the receipt summary
pub const BOLETAS_CODE: DocumentTypeCode = DocumentTypeCode::BOLETA_AFECTA;

fn is_boletas_summary(path: &Path) -> bool {
    path.file_name()
        .map(|n| {
            let name = n.to_string_lossy();
            name.starts_with(BOLETAS_PREFIX) && name.to_ascii_lowercase().ends_with(".csv")
        })
        .unwrap_or(false)
}

/// Period tag right after the prefix, if the name carries one
fn summary_tag(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let tag: String = name.strip_prefix(BOLETAS_PREFIX)?.chars().take(6).collect();
    (tag.len() == 6 && tag.chars().all(|c| c.is_ascii_digit())).then_some(tag)
}

/// Receipt summary inside `dir`: the lexicographically last one tagged
/// with `period`, else the last untagged one. Summaries tagged with another
/// period are never picked.
fn latest_in_dir(dir: &Path, period: Option<Period>) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_boletas_summary(p))
        .collect();

    let Some(period) = period else {
        return candidates.into_iter().max();
    };
    let wanted = period.tag();
    let (tagged, untagged): (Vec<PathBuf>, Vec<PathBuf>) = candidates
        .into_iter()
        .filter(|p| summary_tag(p).map_or(true, |tag| tag == wanted))
        .partition(|p| summary_tag(p).is_some());

    tagged.into_iter().max().or_else(|| untagged.into_iter().max())
}

/// Locate the receipt summary belonging to a sales export.
///
/// A directory is searched directly; a sales file whose name mentions
/// `BOLETAS` is itself the summary; otherwise its siblings are searched.
pub fn detect_boletas_path(sales_path: &Path, period: Option<Period>) -> Option<PathBuf> {
    if sales_path.is_dir() {
        return latest_in_dir(sales_path, period);
    }
    let is_boletas_named = sales_path
        .file_name()
        .map(|n| n.to_string_lossy().to_uppercase().contains("BOLETAS"))
        .unwrap_or(false);
    if is_boletas_named {
        return Some(sales_path.to_path_buf());
    }
    sales_path.parent().and_then(|dir| latest_in_dir(dir, period))
}

/// Read the first row of a receipt summary. `None` when any of the net,
/// VAT or total columns is missing.
pub fn read_boletas_summary(path: &Path) -> Result<Option<LedgerTotals>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = file_label(path);
    let table = importers::load_table(path)?;
    let schema = ResolvedSchema::resolve(&table.headers);

    let (Some(net_col), Some(vat_col), Some(total_col)) = (
        schema.column(CanonicalKey::NetAmount),
        schema.column(CanonicalKey::VatAmount),
        schema.column(CanonicalKey::TotalAmount),
    ) else {
        debug!("{} lacks net/vat/total columns, ignoring", file);
        return Ok(None);
    };

    let row = table
        .rows
        .first()
        .ok_or_else(|| IngestError::format(file.as_str(), "receipt summary has no data row"))?;

    Ok(Some(LedgerTotals {
        net: parse_money(row.get(net_col)).unwrap_or(0),
        vat: parse_money(row.get(vat_col)).unwrap_or(0),
        total: parse_money(row.get(total_col)).unwrap_or(0),
    }))
}

/// Add receipt totals into the sales bucket for code 39 and the grand totals
pub fn merge_boletas(sales: &mut LedgerSummary, boletas: LedgerTotals) {
    debug_assert_eq!(sales.side, LedgerSide::Sales);
    sales.add_to_bucket(BOLETAS_CODE, boletas.net, boletas.vat, boletas.total);
}

/// Detect, read and merge in one step. Returns the merged totals, if any.
pub fn apply_boletas(
    sales: &mut LedgerSummary,
    sales_path: &Path,
    period: Option<Period>,
) -> Result<Option<LedgerTotals>> {
    let Some(path) = detect_boletas_path(sales_path, period) else {
        return Ok(None);
    };
    let Some(boletas) = read_boletas_summary(&path)? else {
        return Ok(None);
    };
    info!(
        "Merging receipt summary {:?}: neto={} iva={} total={}",
        path, boletas.net, boletas.vat, boletas.total
    );
    merge_boletas(sales, boletas);
    Ok(Some(boletas))
}
