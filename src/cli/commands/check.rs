//! `check` command: ingest and cleanse the source files without loading

use std::path::PathBuf;

use super::load_config;
use crate::cli::error::CliError;
use crate::staging::{StagedData, stage_directory};
use crate::warehouse::OutputFormat;

/// Check command arguments
#[derive(Debug, Clone)]
pub struct CheckArgs {
    /// Workspace holding `.warehouse.toml`
    pub workspace: PathBuf,
    /// Overrides `[staging] data_dir`
    pub data_dir: Option<PathBuf>,
    /// Output format (table or json)
    pub format: String,
}

pub fn handle_check(args: &CheckArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let format: OutputFormat = args.format.parse().map_err(CliError::InvalidArgument)?;

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data_dir(&args.workspace));
    let staged = stage_directory(&data_dir, &config.staging)?;

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "ingest": staged.ingest,
                "cleanse": staged.cleanse,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .map_err(|e| CliError::IoError(e.to_string()))?
            );
        }
        OutputFormat::Table | OutputFormat::Csv => println!("{}", summarize(&staged)),
    }

    Ok(())
}

fn summarize(staged: &StagedData) -> String {
    let p = &staged.cleanse.products;
    let c = &staged.cleanse.customers;
    let s = &staged.cleanse.sales;

    let mut lines = vec![
        format!(
            "products:  {} read, {} staged ({} missing id/name, {} unknown category, {} invalid price, {} negative price)",
            p.raw_rows, p.clean_rows, p.missing_critical, p.unknown_category, p.invalid_price, p.negative_price
        ),
        format!(
            "customers: {} read, {} staged ({} missing id/name, {} invalid email)",
            c.raw_rows, c.clean_rows, c.missing_critical, c.invalid_email
        ),
        format!(
            "sales:     {} read, {} staged ({} missing fields, {} invalid quantity, {} non-positive quantity, {} invalid date)",
            s.raw_rows,
            s.clean_rows,
            s.missing_critical,
            s.invalid_quantity,
            s.non_positive_quantity,
            s.invalid_date
        ),
    ];

    if staged.ingest.errors_count > 0 {
        lines.push(format!(
            "{} unreadable rows:",
            staged.ingest.errors_count
        ));
        lines.extend(staged.ingest.errors.iter().map(|e| format!("  {}", e)));
    }

    lines.join("\n")
}
