// Tax module - F29 figures (VAT debit/credit, PPM, total due) and the summary builder

pub mod computation;
pub mod summary;

pub use computation::{compute_ppm, compute_totals, PpmSummary, TaxInputs, TaxTotals};
pub use summary::{
    build_monthly_tax_summary, MonthlyTaxSummary, PurchasesSection, SalesSection,
    SummaryDiagnostics, SummaryRequest,
};
