use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::ledger::LedgerTotals;

/// Monthly provisional income-tax prepayment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PpmSummary {
    /// Sales net total after exempt adjustments
    pub base: i64,
    pub factor: Decimal,
    pub pagado: i64,
}

/// `pagado = round(base * factor)`, ties to even
pub fn compute_ppm(sales_net: i64, factor: Decimal) -> Result<PpmSummary> {
    let pagado = Decimal::from(sales_net)
        .checked_mul(factor)
        .map(|amount| amount.round())
        .and_then(|amount| i64::try_from(amount).ok())
        .ok_or_else(|| anyhow!("PPM overflow: {} x {}", sales_net, factor))?;

    Ok(PpmSummary {
        base: sales_net,
        factor,
        pagado,
    })
}

/// Everything the final figures depend on
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxInputs {
    pub sales: LedgerTotals,
    pub purchases: LedgerTotals,
    pub remanente: Option<i64>,
    pub ppm_pagado: i64,
    pub honorarios_retenido: Option<i64>,
    pub impuesto_unico: Option<i64>,
}

/// Final F29 figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaxTotals {
    pub iva_debito: i64,
    pub iva_credito: i64,
    /// Negative when credit exceeds debit; reported as is
    pub iva_pagar_determinado: i64,
    pub total_a_pagar: i64,
}

pub fn compute_totals(inputs: &TaxInputs) -> TaxTotals {
    let iva_debito = inputs.sales.vat;
    let iva_credito = inputs.purchases.vat + inputs.remanente.unwrap_or(0);
    let iva_pagar_determinado = iva_debito - iva_credito;

    // A VAT credit is never charged; the whole sum is floored as well since
    // overrides and withholdings may arrive negative
    let total_a_pagar = (iva_pagar_determinado.max(0)
        + inputs.ppm_pagado
        + inputs.honorarios_retenido.unwrap_or(0)
        + inputs.impuesto_unico.unwrap_or(0))
    .max(0);

    TaxTotals {
        iva_debito,
        iva_credito,
        iva_pagar_determinado,
        total_a_pagar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vat_only(vat: i64) -> LedgerTotals {
        LedgerTotals {
            net: 0,
            vat,
            total: vat,
        }
    }

    #[test]
    fn test_ppm_default_factor() {
        let ppm = compute_ppm(1_000_000, dec!(0.00125)).unwrap();
        assert_eq!(ppm.pagado, 1250);
        assert_eq!(ppm.base, 1_000_000);
    }

    #[test]
    fn test_ppm_rounds_half_to_even() {
        // 1_000 x 0.0125 = 12.5
        assert_eq!(compute_ppm(1_000, dec!(0.0125)).unwrap().pagado, 12);
        // 1_400 x 0.0125 = 17.5
        assert_eq!(compute_ppm(1_400, dec!(0.0125)).unwrap().pagado, 18);
        assert_eq!(compute_ppm(1_234_567, dec!(0.00125)).unwrap().pagado, 1543);
    }

    #[test]
    fn test_credit_exceeding_debit_is_not_charged() {
        let totals = compute_totals(&TaxInputs {
            sales: vat_only(190),
            purchases: vat_only(300),
            ppm_pagado: 50,
            ..Default::default()
        });
        assert_eq!(totals.iva_pagar_determinado, -110);
        assert_eq!(totals.total_a_pagar, 50);
    }

    #[test]
    fn test_remanente_adds_to_credit() {
        let totals = compute_totals(&TaxInputs {
            sales: vat_only(1_000),
            purchases: vat_only(300),
            remanente: Some(200),
            honorarios_retenido: Some(10_000),
            impuesto_unico: Some(5),
            ppm_pagado: 12,
        });
        assert_eq!(totals.iva_credito, 500);
        assert_eq!(totals.iva_pagar_determinado, 500);
        assert_eq!(totals.total_a_pagar, 500 + 12 + 10_000 + 5);
    }

    #[test]
    fn test_total_never_negative() {
        let totals = compute_totals(&TaxInputs {
            sales: vat_only(-500),
            purchases: vat_only(100),
            remanente: Some(-50),
            ppm_pagado: -3,
            honorarios_retenido: Some(-10),
            impuesto_unico: Some(-1),
        });
        assert_eq!(totals.total_a_pagar, 0);
    }
}
