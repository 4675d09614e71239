// Ledger module - per document-type aggregation of sales/purchase registers

pub mod boletas;
pub mod exempt;
pub mod labels;
pub mod period;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, SoftIssue};
use crate::importers::{self, delimited::file_label, Table};
use crate::money::{apply_sign, parse_money, DocumentTypeCode};
use crate::schema::{CanonicalKey, ResolvedSchema, LEDGER_REQUIRED};

pub use labels::{build_items, SummaryItem};
pub use period::Period;

/// Tolerance (in pesos) for `net + vat == total`
pub const CONSISTENCY_TOLERANCE: i64 = 1;

/// Which register a ledger file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSide {
    Sales,
    Purchases,
}

impl LedgerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerSide::Sales => "ventas",
            LedgerSide::Purchases => "compras",
        }
    }

    /// Exempt amounts are folded into net on purchases only. Sales keep
    /// exempt amounts out of net; the asymmetry is intentional.
    pub fn folds_exempt_into_net(&self) -> bool {
        matches!(self, LedgerSide::Purchases)
    }
}

/// Accumulated amounts for one document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentTypeBucket {
    pub code: DocumentTypeCode,
    #[serde(rename = "neto")]
    pub net: i64,
    #[serde(rename = "iva")]
    pub vat: i64,
    pub total: i64,
}

impl DocumentTypeBucket {
    pub fn new(code: DocumentTypeCode) -> Self {
        Self {
            code,
            net: 0,
            vat: 0,
            total: 0,
        }
    }
}

/// Grand totals of a ledger side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    #[serde(rename = "neto")]
    pub net: i64,
    #[serde(rename = "iva")]
    pub vat: i64,
    pub total: i64,
}

/// Row accounting for one aggregation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub rows_read: usize,
    pub rows_out_of_period: usize,
    pub rows_skipped: usize,
    pub rows_inconsistent: usize,
}

/// Per-code buckets plus grand totals for sales or purchases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub side: LedgerSide,
    pub by_code: BTreeMap<DocumentTypeCode, DocumentTypeBucket>,
    pub totals: LedgerTotals,
    pub stats: AggregationStats,
}

impl LedgerSummary {
    pub fn new(side: LedgerSide) -> Self {
        Self {
            side,
            by_code: BTreeMap::new(),
            totals: LedgerTotals::default(),
            stats: AggregationStats::default(),
        }
    }

    /// Add amounts to a bucket (created on first use) and to the grand totals
    pub fn add_to_bucket(&mut self, code: DocumentTypeCode, net: i64, vat: i64, total: i64) {
        let bucket = self
            .by_code
            .entry(code)
            .or_insert_with(|| DocumentTypeBucket::new(code));
        bucket.net += net;
        bucket.vat += vat;
        bucket.total += total;

        self.totals.net += net;
        self.totals.vat += vat;
        self.totals.total += total;
    }

    pub fn bucket(&self, code: DocumentTypeCode) -> Option<&DocumentTypeBucket> {
        self.by_code.get(&code)
    }

    /// Sum of bucket VAT, equal to `totals.vat` at all times
    pub fn bucket_vat_sum(&self) -> i64 {
        self.by_code.values().map(|b| b.vat).sum()
    }
}

/// Load, resolve, period-filter and aggregate one ledger export
pub fn summarize_ledger<P: AsRef<Path>>(
    path: P,
    side: LedgerSide,
    period: Option<Period>,
    silence_inconsistencies: bool,
) -> Result<LedgerSummary> {
    let path = path.as_ref();
    let file = file_label(path);
    info!("Summarizing {} ledger: {:?}", side.as_str(), path);

    let mut table = importers::load_table(path)?;
    let schema = ResolvedSchema::resolve(&table.headers);
    debug!("Resolved columns for {}: {:?}", file, schema);
    schema.require(&LEDGER_REQUIRED, &file)?;

    let rows_read = table.len();
    let mut rows_out_of_period = 0;
    if let (Some(period), Some(date_col)) = (period, schema.column(CanonicalKey::EmissionDate)) {
        if period::filename_encodes_period(path, period) {
            debug!("{} already scoped to {}, skipping date filter", file, period);
        } else {
            rows_out_of_period = period::filter_table_to_period(&mut table, date_col, period);
            debug!("Dropped {} rows outside {}", rows_out_of_period, period);
        }
    }

    let mut summary = aggregate_rows(&table, &schema, side, silence_inconsistencies, &file);
    summary.stats.rows_read = rows_read;
    summary.stats.rows_out_of_period = rows_out_of_period;

    info!(
        "{}: {} buckets, neto={} iva={} total={} ({} rows skipped)",
        file,
        summary.by_code.len(),
        summary.totals.net,
        summary.totals.vat,
        summary.totals.total,
        summary.stats.rows_skipped
    );
    Ok(summary)
}

/// Aggregate already-loaded rows into document-type buckets
pub fn aggregate_rows(
    table: &Table,
    schema: &ResolvedSchema,
    side: LedgerSide,
    silence_inconsistencies: bool,
    file: &str,
) -> LedgerSummary {
    let mut summary = LedgerSummary::new(side);
    summary.stats.rows_read = table.len();

    let Some(code_col) = schema.column(CanonicalKey::DocumentTypeCode) else {
        return summary;
    };
    let net_col = schema.column(CanonicalKey::NetAmount);
    let vat_col = schema.column(CanonicalKey::VatAmount);
    let total_col = schema.column(CanonicalKey::TotalAmount);
    let exempt_col = schema.column(CanonicalKey::ExemptAmount);

    for (idx, row) in table.rows.iter().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let code_cell = row.get(code_col);
        let Some(code) = DocumentTypeCode::parse(code_cell) else {
            let issue = SoftIssue::RowSkipped {
                row: line,
                raw_code: code_cell.as_text().into_owned(),
            };
            debug!("{}: {}", file, issue);
            summary.stats.rows_skipped += 1;
            continue;
        };

        let class = code.sign_class();
        let amount = |col: Option<usize>| col.and_then(|c| apply_sign(parse_money(row.get(c)), class));

        let mut net = amount(net_col);
        let vat = amount(vat_col);
        let mut total = amount(total_col);
        let exempt = amount(exempt_col);

        if side.folds_exempt_into_net() {
            if let Some(exempt) = exempt {
                net = Some(net.unwrap_or(0) + exempt);
            }
        }

        if total.is_none() {
            if let (Some(n), Some(v)) = (net, vat) {
                total = Some(n + v);
            }
        }

        if let (Some(n), Some(v), Some(t)) = (net, vat, total) {
            if (t - (n + v)).abs() > CONSISTENCY_TOLERANCE {
                summary.stats.rows_inconsistent += 1;
                if !silence_inconsistencies {
                    let issue = SoftIssue::ConsistencyWarning {
                        row: line,
                        net: n,
                        vat: v,
                        total: t,
                    };
                    warn!("{}: {}", file, issue);
                }
            }
        }

        summary.add_to_bucket(code, net.unwrap_or(0), vat.unwrap_or(0), total.unwrap_or(0));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::delimited::parse_delimited_str;

    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    fn aggregate(content: &str, side: LedgerSide) -> LedgerSummary {
        aggregate_with(content, side, true)
    }

    fn aggregate_with(content: &str, side: LedgerSide, silence: bool) -> LedgerSummary {
        let table = parse_delimited_str(content, "test.csv").unwrap();
        let schema = ResolvedSchema::resolve(&table.headers);
        aggregate_rows(&table, &schema, side, silence, "test.csv")
    }

    /// In-memory log sink for asserting on emitted events
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn aggregate_capturing_logs(content: &str, silence: bool) -> (LedgerSummary, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let summary = tracing::subscriber::with_default(subscriber, || {
            aggregate_with(content, LedgerSide::Sales, silence)
        });
        (summary, logs.contents())
    }

    #[test]
    fn test_credit_notes_are_negated() {
        let summary = aggregate(
            "Tipo Doc;Monto Neto;Monto IVA;Monto Total\n\
             33;1000;190;1190\n\
             61;500;95;595\n",
            LedgerSide::Sales,
        );
        let nc = summary.bucket(DocumentTypeCode::NOTA_CREDITO).unwrap();
        assert_eq!((nc.net, nc.vat, nc.total), (-500, -95, -595));
        assert_eq!(
            summary.totals,
            LedgerTotals {
                net: 500,
                vat: 95,
                total: 595
            }
        );
    }

    #[test]
    fn test_unparseable_code_is_skipped() {
        let summary = aggregate(
            "Tipo Doc;Monto Neto\n33;100\nTOTAL;100\n;5\n",
            LedgerSide::Sales,
        );
        assert_eq!(summary.stats.rows_skipped, 2);
        assert_eq!(summary.totals.net, 100);
    }

    #[test]
    fn test_exempt_folds_into_net_on_purchases_only() {
        let content = "Tipo Doc;Monto Exento;Monto Neto;Monto IVA;Monto Total\n\
                       33;200;1000;190;1390\n";
        let purchases = aggregate(content, LedgerSide::Purchases);
        assert_eq!(purchases.totals.net, 1200);

        let sales = aggregate(content, LedgerSide::Sales);
        assert_eq!(sales.totals.net, 1000);
    }

    #[test]
    fn test_missing_total_is_derived() {
        let summary = aggregate("Tipo Doc;Neto;IVA\n33;1000;190\n", LedgerSide::Sales);
        assert_eq!(summary.totals.total, 1190);
    }

    #[test]
    fn test_inconsistency_is_counted_not_fixed() {
        let summary = aggregate(
            "Tipo Doc;Neto;IVA;Total\n33;1000;190;1200\n33;1000;190;1191\n",
            LedgerSide::Sales,
        );
        assert_eq!(summary.stats.rows_inconsistent, 1);
        assert_eq!(summary.totals.total, 2391);
    }

    #[test]
    fn test_inconsistency_warning_is_logged_unless_silenced() {
        let content = "Tipo Doc;Neto;IVA;Total\n33;1000;190;1200\n";

        let (summary, logs) = aggregate_capturing_logs(content, false);
        assert_eq!(summary.stats.rows_inconsistent, 1);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("test.csv: row 2: inconsistent total 1200 (net 1000 + vat 190 = 1190)"));

        let (summary, logs) = aggregate_capturing_logs(content, true);
        assert_eq!(summary.stats.rows_inconsistent, 1);
        assert!(!logs.contains("inconsistent total"));
    }

    #[test]
    fn test_missing_values_count_as_zero() {
        let summary = aggregate("Tipo Doc;Neto;IVA;Total\n56;;;\n33;10;;\n", LedgerSide::Sales);
        let nd = summary.bucket(DocumentTypeCode::NOTA_DEBITO).unwrap();
        assert_eq!((nd.net, nd.vat, nd.total), (0, 0, 0));
        assert_eq!(summary.totals.net, 10);
    }

    #[test]
    fn test_totals_match_bucket_sum() {
        let summary = aggregate(
            "Tipo Doc;Neto;IVA;Total\n33;1;2;3\n61;4;5;9\n56;7;8;15\n33;10;11;21\n",
            LedgerSide::Purchases,
        );
        assert_eq!(summary.bucket_vat_sum(), summary.totals.vat);
    }
}
