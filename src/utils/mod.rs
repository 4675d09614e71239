//! Formatting helpers for Chilean peso amounts and period labels
//!
//! Pesos have no minor unit in practice, so amounts are whole numbers with
//! `.` as thousands separator.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$ " prefix (Chilean peso)
    Clp,
    /// No currency symbol (table cells)
    None,
}

const MONTH_LABELS: [&str; 12] = [
    "ENERO",
    "FEBRERO",
    "MARZO",
    "ABRIL",
    "MAYO",
    "JUNIO",
    "JULIO",
    "AGOSTO",
    "SEPTIEMBRE",
    "OCTUBRE",
    "NOVIEMBRE",
    "DICIEMBRE",
];

fn group_thousands(digits: &str) -> String {
    digits
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// Core formatting function with full control over output.
///
/// # Examples
/// ```
/// use f29_resumen::utils::{format_clp_with_width, CurrencySymbol};
///
/// assert_eq!(format_clp_with_width(1234567, 0, CurrencySymbol::Clp), "$ 1.234.567");
/// assert_eq!(format_clp_with_width(-1190, 8, CurrencySymbol::None), "  -1.190");
/// ```
pub fn format_clp_with_width(value: i64, width: usize, symbol: CurrencySymbol) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    let prefix = match symbol {
        CurrencySymbol::Clp => "$ ",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}", prefix, sign, group_thousands(&digits));

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as pesos with symbol: "$ 1.234"
pub fn format_clp(value: i64) -> String {
    format_clp_with_width(value, 0, CurrencySymbol::Clp)
}

/// Table-cell rendering: grouped digits, `-` for zero or absent amounts.
///
/// # Examples
/// ```
/// use f29_resumen::utils::format_amount;
///
/// assert_eq!(format_amount(Some(1190)), "1.190");
/// assert_eq!(format_amount(Some(0)), "-");
/// assert_eq!(format_amount(None), "-");
/// ```
pub fn format_amount(value: Option<i64>) -> String {
    match value {
        None | Some(0) => "-".to_string(),
        Some(v) => format_clp_with_width(v, 0, CurrencySymbol::None),
    }
}

/// A factor as a percentage with a decimal comma: 0.00125 -> "0,125%"
pub fn format_factor_percent(factor: Decimal) -> String {
    let percent = (factor * Decimal::ONE_HUNDRED).normalize();
    format!("{}%", percent.to_string().replace('.', ","))
}

/// Spanish month name in capitals, or the number when out of range
pub fn month_label(month: u32) -> String {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(idx as usize))
        .map(|label| label.to_string())
        .unwrap_or_else(|| month.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_clp() {
        assert_eq!(format_clp(0), "$ 0");
        assert_eq!(format_clp(999), "$ 999");
        assert_eq!(format_clp(1000), "$ 1.000");
        assert_eq!(format_clp(1_000_000), "$ 1.000.000");
        assert_eq!(format_clp(-110), "$ -110");
        assert_eq!(format_clp(i64::MIN), "$ -9.223.372.036.854.775.808");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_clp_with_width(100, 10, CurrencySymbol::Clp);
        assert_eq!(result, "     $ 100");
        assert_eq!(format_clp_with_width(1_000_000, 3, CurrencySymbol::None), "1.000.000");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(-500)), "-500");
        assert_eq!(format_amount(Some(12_345_678)), "12.345.678");
    }

    #[test]
    fn test_factor_percent() {
        assert_eq!(format_factor_percent(dec!(0.00125)), "0,125%");
        assert_eq!(format_factor_percent(dec!(0.0125)), "1,25%");
        assert_eq!(format_factor_percent(dec!(0.01)), "1%");
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(3), "MARZO");
        assert_eq!(month_label(12), "DICIEMBRE");
        assert_eq!(month_label(0), "0");
        assert_eq!(month_label(13), "13");
    }
}
