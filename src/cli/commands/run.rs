//! `run` command: the full pipeline
//!
//! Ingest, cleanse, rebuild the warehouse schema, load, then print the
//! requested reports.

use std::path::PathBuf;

use chrono::NaiveDate;

use super::load_config;
use crate::cli::error::CliError;
use crate::staging::stage_directory;
use crate::warehouse::config::{BackendType, WarehouseConfig};
use crate::warehouse::reports::ReportKind;
use crate::warehouse::{
    LoadReport, OutputFormat, Warehouse, WarehouseBackend, format_query_result,
};

/// Run command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Workspace holding `.warehouse.toml`
    pub workspace: PathBuf,
    /// Overrides `[staging] data_dir`
    pub data_dir: Option<PathBuf>,
    /// A report name, or "all"
    pub report: String,
    /// Reference date of the frequent customers window
    pub as_of: NaiveDate,
    /// Output format (table, json, csv)
    pub format: String,
    /// Overrides `[database] backend`
    pub backend: Option<String>,
    /// Overrides `[load] conflict_policy`
    pub conflict_policy: Option<String>,
    /// Also print every dropped sale with its reject reason
    pub show_rejected: bool,
}

/// Parse a `--report` value
pub fn parse_reports(value: &str) -> Result<Vec<ReportKind>, CliError> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(ReportKind::ALL.to_vec());
    }
    value
        .split(',')
        .map(|name| name.parse().map_err(CliError::InvalidArgument))
        .collect()
}

fn apply_overrides(config: &mut WarehouseConfig, args: &RunArgs) -> Result<(), CliError> {
    if let Some(backend) = &args.backend {
        config.database.backend = backend.parse().map_err(CliError::InvalidArgument)?;
    }
    if let Some(policy) = &args.conflict_policy {
        config.load.conflict_policy = policy.parse().map_err(CliError::InvalidArgument)?;
    }
    Ok(())
}

fn open_backend(
    config: &WarehouseConfig,
    args: &RunArgs,
) -> Result<Box<dyn WarehouseBackend>, CliError> {
    match config.database.backend {
        BackendType::Memory => Ok(Box::new(Warehouse::new())),
        BackendType::DuckDB => {
            #[cfg(feature = "duckdb-backend")]
            {
                let path = config.get_duckdb_path(&args.workspace);
                Ok(Box::new(crate::warehouse::DuckDbWarehouse::open(path)?))
            }
            #[cfg(not(feature = "duckdb-backend"))]
            {
                let _ = args;
                Err(CliError::BackendUnavailable(
                    "DuckDB backend requires the 'duckdb-backend' feature".to_string(),
                ))
            }
        }
    }
}

fn print_load_summary(report: &LoadReport) {
    eprintln!(
        "Loaded batch {}: {} products, {} customers, {} of {} sales ({} dropped)",
        report.batch_id,
        report.products.rows_loaded,
        report.customers.rows_loaded,
        report.sales_loaded,
        report.sales_staged,
        report.sales_dropped()
    );
}

/// Dropped sales in the chosen output format
fn render_rejected(report: &LoadReport, format: OutputFormat) -> String {
    let result = report.rejected_sales_result();
    if format == OutputFormat::Table {
        format!("\n== Rejected sales ==\n{}", format_query_result(&result, format))
    } else {
        format_query_result(&result, format)
    }
}

pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.workspace)?;
    apply_overrides(&mut config, args)?;

    let reports = parse_reports(&args.report)?;
    let format: OutputFormat = args.format.parse().map_err(CliError::InvalidArgument)?;

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data_dir(&args.workspace));
    let staged = stage_directory(&data_dir, &config.staging)?;

    let backend = open_backend(&config, args)?;
    tracing::info!("Using {} backend", backend.backend_type());

    backend.rebuild_schema()?;
    let load = backend.load(&staged.area, config.load.conflict_policy)?;
    print_load_summary(&load);
    if args.show_rejected {
        println!("{}", render_rejected(&load, format));
    }

    for kind in reports {
        let result = backend.run_report(kind, &config.reports, args.as_of)?;
        if format == OutputFormat::Table {
            println!("\n== {} ==", kind.title());
        }
        println!("{}", format_query_result(&result, format));
    }

    Ok(())
}
