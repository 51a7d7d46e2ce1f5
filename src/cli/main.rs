//! CLI binary entry point for sales-warehouse

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use sales_warehouse::cli::commands::{
    check::{CheckArgs, handle_check},
    generate::{GenerateArgs, handle_generate},
    init::{InitArgs, handle_init},
    run::{RunArgs, handle_run},
    schema::{SchemaArgs, handle_schema},
};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sales-warehouse")]
#[command(about = "Build a sales star schema from CSV extracts and report on it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Write a sample .warehouse.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Print the staging, warehouse, load and report SQL
    Schema {
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Date to render the frequent customers window for (YYYY-MM-DD, default: today)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Ingest and cleanse the source files, then print what was found
    Check {
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Directory holding the source files (overrides the configuration)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Write sample source files with a known mix of bad rows
    Generate {
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Output directory (default: the configured data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Number of products
        #[arg(long, default_value_t = 150)]
        products: usize,
        /// Number of customers
        #[arg(long, default_value_t = 600)]
        customers: usize,
        /// Number of sales (default: 1500, or 10 with --append)
        #[arg(long)]
        sales: Option<usize>,
        /// Random seed; the same seed writes the same files
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Append new sales to the existing sales file
        #[arg(long)]
        append: bool,
    },
    /// Run the whole pipeline and print reports
    Run {
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Directory holding the source files (overrides the configuration)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Report to print: all, top-products, frequent-customers,
        /// monthly-revenue, yearly-monthly-revenue (comma separated)
        #[arg(short, long, default_value = "all")]
        report: String,
        /// Reference date for the frequent customers window (YYYY-MM-DD, default: today)
        #[arg(long)]
        as_of: Option<String>,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
        /// Warehouse backend (memory, duckdb)
        #[arg(short, long)]
        backend: Option<String>,
        /// Duplicate natural key policy (first-seen, last-seen, most-complete, reject)
        #[arg(long)]
        conflict_policy: Option<String>,
        /// Print the sales dropped by the load with their reject reasons
        #[arg(long)]
        show_rejected: bool,
    },
}

#[cfg(feature = "cli")]
fn parse_as_of(
    value: Option<String>,
) -> Result<chrono::NaiveDate, sales_warehouse::cli::CliError> {
    match value {
        Some(text) => chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
            sales_warehouse::cli::CliError::InvalidArgument(format!(
                "Invalid --as-of date '{}': {}",
                text, e
            ))
        }),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}

#[cfg(feature = "cli")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init { dir, force } => handle_init(&InitArgs { dir, force }),
        Commands::Schema { workspace, as_of } => parse_as_of(as_of)
            .and_then(|as_of| handle_schema(&SchemaArgs { workspace, as_of })),
        Commands::Check {
            workspace,
            data_dir,
            format,
        } => handle_check(&CheckArgs {
            workspace,
            data_dir,
            format,
        }),
        Commands::Generate {
            workspace,
            out,
            products,
            customers,
            sales,
            seed,
            append,
        } => handle_generate(&GenerateArgs {
            workspace,
            out,
            products,
            customers,
            sales,
            seed,
            append,
        }),
        Commands::Run {
            workspace,
            data_dir,
            report,
            as_of,
            format,
            backend,
            conflict_policy,
            show_rejected,
        } => parse_as_of(as_of).and_then(|as_of| {
            handle_run(&RunArgs {
                workspace,
                data_dir,
                report,
                as_of,
                format,
                backend,
                conflict_policy,
                show_rejected,
            })
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
