//! `schema` command: print the SQL the warehouse runs

use std::path::PathBuf;

use chrono::NaiveDate;

use super::load_config;
use crate::cli::error::CliError;
use crate::warehouse::reports::ReportKind;
use crate::warehouse::schema::{WarehouseSchema, load_sql};

/// Schema command arguments
#[derive(Debug, Clone)]
pub struct SchemaArgs {
    /// Workspace holding `.warehouse.toml`
    pub workspace: PathBuf,
    /// Date the report SQL is rendered for
    pub as_of: NaiveDate,
}

pub fn handle_schema(args: &SchemaArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    println!("{}", render_schema(&config, args.as_of)?);
    Ok(())
}

fn render_schema(
    config: &crate::warehouse::WarehouseConfig,
    as_of: NaiveDate,
) -> Result<String, CliError> {
    let mut out = String::new();

    out.push_str("-- Staging tables\n");
    out.push_str(WarehouseSchema::create_staging_tables_sql().trim());
    out.push_str("\n\n-- Warehouse tables\n");
    out.push_str(&WarehouseSchema::rebuild_sql()?);

    out.push_str(&format!(
        "\n-- Load (conflict policy {})\n",
        config.load.conflict_policy
    ));
    for statement in WarehouseSchema::load_statements(config.load.conflict_policy) {
        out.push_str(&statement);
        out.push_str(";\n\n");
    }
    out.push_str(load_sql::INSERT_SALES_REJECTED);
    out.push_str(";\n\n");

    for kind in ReportKind::ALL {
        out.push_str(&format!("-- Report: {}\n", kind.title()));
        out.push_str(&kind.sql(&config.reports, as_of));
        out.push_str(";\n\n");
    }

    Ok(out.trim_end().to_string())
}
