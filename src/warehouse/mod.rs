//! Warehouse layer
//!
//! A star schema with two dimensions (`product_dim`, `customer_dim`) and one
//! fact table (`sales_fact`), rebuilt from the staging layer and queried by
//! four read-only reports.
//!
//! Two backends implement [`WarehouseBackend`]:
//! - [`Warehouse`]: the native in-memory engine. Every schema rebuild and
//!   every load publishes a new immutable [`WarehouseSnapshot`]; reports run
//!   against one snapshot and never see a half-finished load.
//! - `DuckDbWarehouse` (feature `duckdb-backend`): the same pipeline as SQL
//!   against an embedded DuckDB database.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod config;
#[cfg(feature = "duckdb-backend")]
pub mod duckdb;
pub mod load;
pub mod reports;
pub mod schema;
pub mod snapshot;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbWarehouse;

pub use config::WarehouseConfig;
pub use load::{LoadReport, RejectedSale};
pub use reports::{ReportKind, Reports};
pub use schema::{WarehouseSchema, WarehouseTable};
pub use snapshot::{Warehouse, WarehouseSnapshot};

use crate::models::ConflictPolicy;
use crate::staging::StagingArea;
use config::ReportsSection;

/// Error type for warehouse operations
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Schema has not been created yet
    #[error("Warehouse not initialized. Rebuild the schema first.")]
    NotInitialized,

    /// A row broke a table constraint; the statement was rejected
    #[error("Constraint violation on {table} ({constraint}): {detail}")]
    ConstraintViolation {
        table: &'static str,
        constraint: &'static str,
        detail: String,
    },

    /// Staging holds conflicting rows for one natural key and the
    /// conflict policy is `reject`
    #[error("Conflicting staging rows for {table} natural key '{key}'")]
    DuplicateNaturalKey { table: &'static str, key: String },

    /// Schema definition is inconsistent
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// A lock guarding published state was poisoned
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type for warehouse operations
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Operations every warehouse backend provides
pub trait WarehouseBackend {
    /// Drop and recreate the warehouse tables, discarding loaded data
    fn rebuild_schema(&self) -> WarehouseResult<()>;

    /// Populate the dimensions and the fact table from staging as one unit
    fn load(&self, staging: &StagingArea, policy: ConflictPolicy) -> WarehouseResult<LoadReport>;

    /// Run one report as of `as_of`
    fn run_report(
        &self,
        kind: ReportKind,
        config: &ReportsSection,
        as_of: NaiveDate,
    ) -> WarehouseResult<QueryResult>;

    /// Backend type name ("memory" or "duckdb")
    fn backend_type(&self) -> &'static str;
}

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a result from serializable rows, one JSON object per row
    pub fn from_rows<T: Serialize>(columns: &[&str], rows: &[T]) -> WarehouseResult<Self> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WarehouseError::SerializationError(e.to_string()))?;

        Ok(Self::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        ))
    }
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result).unwrap_or_else(|e| {
            tracing::warn!("Failed to render CSV: {}", e);
            String::new()
        }),
        OutputFormat::Table => format_as_table(result),
    }
}

/// Render one cell; `null_text` stands in for SQL NULL
fn cell_text(row: &QueryRow, column: &str, null_text: &str) -> String {
    match row.get(column).unwrap_or(&serde_json::Value::Null) {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => null_text.to_string(),
        other => other.to_string(),
    }
}

/// Numbers (including decimals serialized as strings) are right-aligned
fn is_numeric_cell(text: &str) -> bool {
    !text.is_empty() && text.parse::<f64>().is_ok()
}

fn format_as_csv(result: &QueryResult) -> WarehouseResult<String> {
    let csv_error = |e: csv::Error| WarehouseError::SerializationError(e.to_string());
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(&result.columns).map_err(csv_error)?;
    for row in &result.rows {
        writer
            .write_record(result.columns.iter().map(|col| cell_text(row, col, "")))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| WarehouseError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| WarehouseError::SerializationError(e.to_string()))
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|col| cell_text(row, col, "null"))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.len());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &cells {
        let values: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if is_numeric_cell(s) {
                    format!("{:>width$}", s, width = widths[i])
                } else {
                    format!("{:width$}", s, width = widths[i])
                }
            })
            .collect();
        output.push_str(&values.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}
