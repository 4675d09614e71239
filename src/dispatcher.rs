//! Command dispatcher that routes parsed CLI commands to the library and
//! the output formatters.

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use f29_resumen::discovery::StorageLayout;
use f29_resumen::importers::{self, file_detector, spreadsheet, FileFormat, PdfExtractText};
use f29_resumen::schema::{ResolvedSchema, LEDGER_REQUIRED};
use f29_resumen::{build_monthly_tax_summary, ConfigFile, MonthlyTaxSummary, SummaryRequest};

use crate::cli::formatters::{self, InspectReport};
use crate::cli::{Cli, Commands};

/// Route a parsed command to its handler
pub fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Summary {
            period,
            sales,
            purchases,
            honorarios,
            remanente,
            company,
            overrides,
        } => {
            let config = ConfigFile::discover(cli.config.as_deref())?;
            let options = overrides.apply(config.to_options());
            let request = SummaryRequest {
                company: company.clone(),
                period: *period,
                sales_path: sales.clone(),
                purchases_path: purchases.clone(),
                honorarios_path: honorarios.clone(),
                remanente_path: remanente.clone(),
            };
            let summary = build_monthly_tax_summary(&request, &options, &PdfExtractText)?;
            print_summary(&summary, cli.json);
            Ok(())
        }

        Commands::Storage {
            company_id,
            period,
            root,
            overrides,
        } => {
            let config = ConfigFile::discover(cli.config.as_deref())?;
            let root = root
                .clone()
                .or_else(|| config.storage_root.clone())
                .ok_or_else(|| anyhow!("No storage root: pass --root or set storage_root in the config file"))?;
            let options = overrides.apply(config.to_options());

            let request = StorageLayout::new(root).resolve(company_id, *period)?;
            let summary = build_monthly_tax_summary(&request, &options, &PdfExtractText)?;
            print_summary(&summary, cli.json);
            Ok(())
        }

        Commands::Inspect { file } => {
            let report = inspect_file(file)?;
            if cli.json {
                println!("{}", formatters::format_json(&report));
            } else {
                print!("{}", formatters::format_inspect(&report));
            }
            Ok(())
        }
    }
}

fn print_summary(summary: &MonthlyTaxSummary, json: bool) {
    if json {
        println!("{}", formatters::format_json(summary));
    } else {
        print!("{}", formatters::format_summary_table(summary));
    }
}

/// Detect, load and resolve one file without aggregating it
pub fn inspect_file(path: &Path) -> Result<InspectReport> {
    info!("Inspecting {:?}", path);
    let format = file_detector::detect_format(path)?;
    let mut report = InspectReport {
        file: path.display().to_string(),
        format: format.as_str().to_string(),
        origin: None,
        sheets: Vec::new(),
        headers: Vec::new(),
        columns: Vec::new(),
        rows: 0,
        missing_required: Vec::new(),
    };

    if matches!(format, FileFormat::Json | FileFormat::Pdf) {
        return Ok(report);
    }
    if format == FileFormat::Spreadsheet {
        report.sheets = spreadsheet::sheet_names(path).unwrap_or_default();
    }

    let table = importers::load_table(path)?;
    let schema = ResolvedSchema::resolve(&table.headers);

    report.origin = Some(table.origin.to_string());
    report.rows = table.len();
    report.columns = schema
        .iter()
        .map(|(key, idx)| (key, table.headers[idx].clone()))
        .collect();
    report.missing_required = LEDGER_REQUIRED
        .iter()
        .filter(|key| !schema.has(**key))
        .copied()
        .collect();
    report.headers = table.headers;

    Ok(report)
}
