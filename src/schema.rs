//! Schema resolution - map whatever a file calls a column to canonical fields
//!
//! Headers and aliases go through the same normalization (lowercase,
//! diacritics stripped, non-alphanumerics removed) and are then matched
//! exactly, first alias first. The relaxed variant also accepts substring
//! containment and is only used for honorarios exports.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::IngestError;

/// Canonical ledger fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalKey {
    DocumentTypeCode,
    NetAmount,
    VatAmount,
    TotalAmount,
    ExemptAmount,
    EmissionDate,
}

/// Columns every ledger export must provide
pub const LEDGER_REQUIRED: [CanonicalKey; 2] =
    [CanonicalKey::DocumentTypeCode, CanonicalKey::NetAmount];

impl CanonicalKey {
    pub const ALL: [CanonicalKey; 6] = [
        CanonicalKey::DocumentTypeCode,
        CanonicalKey::NetAmount,
        CanonicalKey::VatAmount,
        CanonicalKey::TotalAmount,
        CanonicalKey::ExemptAmount,
        CanonicalKey::EmissionDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalKey::DocumentTypeCode => "document_type_code",
            CanonicalKey::NetAmount => "net_amount",
            CanonicalKey::VatAmount => "vat_amount",
            CanonicalKey::TotalAmount => "total_amount",
            CanonicalKey::ExemptAmount => "exempt_amount",
            CanonicalKey::EmissionDate => "emission_date",
        }
    }

    /// Known header spellings, in priority order
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalKey::DocumentTypeCode => &[
                "tipodoc",
                "tipodocumento",
                "tipodte",
                "codigotipo",
                "codigo",
                "tipodocum",
                "tipodocumentocompra",
                "tipodocumentoventa",
            ],
            CanonicalKey::NetAmount => &[
                "neto",
                "mntneto",
                "montoneto",
                "montoafecto",
                "montonetoafecto",
                "montonetoaf",
            ],
            CanonicalKey::VatAmount => &[
                "iva",
                "mntiva",
                "montoiva",
                "montoivarecuperable",
                "ivarecuperable",
                "ivacredito",
                "ivadebito",
            ],
            CanonicalKey::TotalAmount => &["total", "mnttotal", "montototal"],
            CanonicalKey::ExemptAmount => &[
                "exento",
                "mntexento",
                "montoexento",
                "montoexento_noafecto",
                "montoexentonoafecto",
                "montoexentoynoafecto",
            ],
            CanonicalKey::EmissionDate => &[
                "fchemis",
                "fechaemision",
                "fechadocto",
                "fechadocumento",
                "fecha",
            ],
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, strip diacritics and drop everything but ASCII letters/digits
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

/// Index of the first header equal (after normalization) to an alias
pub fn find_column<S: AsRef<str>>(headers: &[String], aliases: &[S]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    aliases.iter().find_map(|alias| {
        let key = normalize_header(alias.as_ref());
        normalized.iter().position(|h| !key.is_empty() && *h == key)
    })
}

/// Like `find_column`, then falls back to headers containing an alias
pub fn find_column_relaxed<S: AsRef<str>>(headers: &[String], aliases: &[S]) -> Option<usize> {
    if let Some(idx) = find_column(headers, aliases) {
        return Some(idx);
    }
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    aliases.iter().find_map(|alias| {
        let key = normalize_header(alias.as_ref());
        if key.is_empty() {
            return None;
        }
        normalized.iter().position(|h| h.contains(&key))
    })
}

/// Canonical key to column index, resolved once per file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
    columns: BTreeMap<CanonicalKey, usize>,
}

impl ResolvedSchema {
    pub fn resolve(headers: &[String]) -> Self {
        let columns = CanonicalKey::ALL
            .iter()
            .filter_map(|key| find_column(headers, key.aliases()).map(|idx| (*key, idx)))
            .collect();
        Self { columns }
    }

    pub fn column(&self, key: CanonicalKey) -> Option<usize> {
        self.columns.get(&key).copied()
    }

    pub fn has(&self, key: CanonicalKey) -> bool {
        self.columns.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalKey, usize)> + '_ {
        self.columns.iter().map(|(k, v)| (*k, *v))
    }

    /// Fail with `SchemaError` listing the required keys that did not resolve
    pub fn require(&self, required: &[CanonicalKey], file: &str) -> Result<(), IngestError> {
        let missing: Vec<CanonicalKey> = required
            .iter()
            .filter(|key| !self.has(**key))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::SchemaError {
                file: file.to_string(),
                missing,
            })
        }
    }
}

/// Score used to pick an HTML table for a ledger: required keys weigh double
pub fn score_ledger_headers(headers: &[String]) -> usize {
    let schema = ResolvedSchema::resolve(headers);
    schema
        .iter()
        .map(|(key, _)| if LEDGER_REQUIRED.contains(&key) { 2 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Monto Neto"), "montoneto");
        assert_eq!(normalize_header("MNT_NETO"), "mntneto");
        assert_eq!(normalize_header(" Fecha Emisión "), "fechaemision");
        assert_eq!(normalize_header("Código IVA No Rec."), "codigoivanorec");
    }

    #[test]
    fn test_net_aliases_resolve() {
        for name in ["Monto Neto", "MNT_NETO", "montoneto"] {
            let schema = ResolvedSchema::resolve(&headers(&["Tipo Doc", name]));
            assert_eq!(schema.column(CanonicalKey::NetAmount), Some(1), "{}", name);
        }
    }

    #[test]
    fn test_sii_rcv_headers() {
        let schema = ResolvedSchema::resolve(&headers(&[
            "Nro",
            "Tipo Doc",
            "Tipo Compra",
            "RUT Proveedor",
            "Razon Social",
            "Folio",
            "Fecha Docto",
            "Fecha Recepcion",
            "Monto Exento",
            "Monto Neto",
            "Monto IVA Recuperable",
            "Monto Iva No Recuperable",
            "Codigo IVA No Rec.",
            "Monto Total",
        ]));
        assert_eq!(schema.column(CanonicalKey::DocumentTypeCode), Some(1));
        assert_eq!(schema.column(CanonicalKey::EmissionDate), Some(6));
        assert_eq!(schema.column(CanonicalKey::ExemptAmount), Some(8));
        assert_eq!(schema.column(CanonicalKey::NetAmount), Some(9));
        assert_eq!(schema.column(CanonicalKey::VatAmount), Some(10));
        assert_eq!(schema.column(CanonicalKey::TotalAmount), Some(13));
    }

    #[test]
    fn test_alias_priority_is_alias_order() {
        // "neto" outranks "montoafecto" regardless of column order
        let schema = ResolvedSchema::resolve(&headers(&["Monto Afecto", "Neto"]));
        assert_eq!(schema.column(CanonicalKey::NetAmount), Some(1));
    }

    #[test]
    fn test_require_reports_missing() {
        let schema = ResolvedSchema::resolve(&headers(&["Folio", "Monto Total"]));
        match schema.require(&LEDGER_REQUIRED, "ventas.csv") {
            Err(IngestError::SchemaError { missing, .. }) => {
                assert_eq!(
                    missing,
                    vec![CanonicalKey::DocumentTypeCode, CanonicalKey::NetAmount]
                );
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_relaxed_containment() {
        let cols = headers(&["Honorarios Brutos", "Retención"]);
        assert_eq!(find_column(&cols, &["bruto"]), None);
        assert_eq!(find_column_relaxed(&cols, &["brutos", "bruto"]), Some(0));
        assert_eq!(find_column_relaxed(&cols, &["retenido", "retencion"]), Some(1));
    }

    #[test]
    fn test_ledger_score() {
        assert_eq!(score_ledger_headers(&headers(&["Banner"])), 0);
        assert_eq!(score_ledger_headers(&headers(&["Tipo Doc", "Monto Neto", "IVA"])), 5);
    }
}
