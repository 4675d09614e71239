//! Money and sign normalization
//!
//! Amounts are whole pesos held as `i64`. `None` means the cell carried no
//! amount at all, which is different from a measured zero.

use serde::Serialize;
use std::fmt;

use crate::importers::CellValue;

/// Integer minor-currency units; `None` is "absent"
pub type MoneyAmount = Option<i64>;

/// Parse a cell into an amount. Numbers round to the nearest integer
/// (ties to even); text keeps only its digits.
pub fn parse_money(cell: &CellValue) -> MoneyAmount {
    match cell {
        CellValue::Empty | CellValue::Date(_) => None,
        CellValue::Number(n) => {
            if n.is_finite() {
                Some(n.round_ties_even() as i64)
            } else {
                None
            }
        }
        CellValue::Text(s) => parse_money_str(s),
    }
}

/// Parse locale-formatted text such as `"1.234.567"`, `"$ -1.190"` or `"(500)"`
pub fn parse_money_str(raw: &str) -> MoneyAmount {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return None;
    }

    let unsigned = s.trim_start_matches(|c: char| c == '$' || c.is_whitespace());
    let negative = unsigned.starts_with('-')
        || s.ends_with('-')
        || (s.starts_with('(') && s.ends_with(')'));

    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some(if negative { -n } else { n })
}

/// How a document type affects the sign of its amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignClass {
    /// Reverses a previously issued document: all amounts negated
    CreditNote,
    /// Invoices, debit notes, receipts: amounts keep their parsed sign
    Additive,
}

/// SII document-type code (33 factura, 61 nota de credito, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentTypeCode(u32);

impl DocumentTypeCode {
    pub const FACTURA: Self = Self(33);
    pub const FACTURA_EXENTA: Self = Self(34);
    pub const BOLETA_AFECTA: Self = Self(39);
    pub const BOLETA_EXENTA: Self = Self(41);
    pub const LIQUIDACION_FACTURA: Self = Self(43);
    pub const FACTURA_COMPRA: Self = Self(45);
    pub const BOLETA_MEDIO_ELECTRONICO: Self = Self(48);
    pub const NOTA_DEBITO_COMPAT: Self = Self(51);
    pub const NOTA_DEBITO_PAPEL: Self = Self(55);
    pub const NOTA_DEBITO: Self = Self(56);
    pub const NOTA_CREDITO_PAPEL: Self = Self(60);
    pub const NOTA_CREDITO: Self = Self(61);

    const CREDIT_NOTES: [Self; 2] = [Self::NOTA_CREDITO_PAPEL, Self::NOTA_CREDITO];

    /// Codes are small positive integers; zero is rejected
    pub fn new(code: u32) -> Option<Self> {
        if code == 0 {
            None
        } else {
            Some(Self(code))
        }
    }

    /// Parse a document-type cell; `None` means the row must be skipped
    pub fn parse(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && *n > 0.0 => {
                u32::try_from(*n as i64).ok().and_then(Self::new)
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<f64>() {
                    if n.fract() == 0.0 && n > 0.0 && n <= u32::MAX as f64 {
                        return Self::new(n as u32);
                    }
                }
                let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
                digits.parse::<u32>().ok().and_then(Self::new)
            }
            _ => None,
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn sign_class(&self) -> SignClass {
        if Self::CREDIT_NOTES.contains(self) {
            SignClass::CreditNote
        } else {
            SignClass::Additive
        }
    }
}

impl fmt::Display for DocumentTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Apply a document's sign class to one parsed amount.
///
/// Credit notes always contribute the negated magnitude, whether the export
/// printed them positive or already negative.
pub fn apply_sign(value: MoneyAmount, class: SignClass) -> MoneyAmount {
    match class {
        SignClass::CreditNote => value.map(|v| -v.abs()),
        SignClass::Additive => value,
    }
}
