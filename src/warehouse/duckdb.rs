//! DuckDB warehouse backend
//!
//! Runs the pipeline as SQL inside an embedded DuckDB database. A load copies
//! the staging area into `raw_*` tables and populates the warehouse with
//! `INSERT ... SELECT` statements, all inside one transaction. Sales the
//! fact insert drops are kept in `sales_rejected`. Reports are plain
//! queries. Supports both file-based persistence and in-memory mode.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::NaiveDate;

use super::config::ReportsSection;
use super::load::{DimensionLoadStats, LoadReport, RejectedSale};
use super::reports::ReportKind;
use super::schema::{WarehouseSchema, WarehouseTable, load_sql, staging_sql};
use super::{QueryResult, WarehouseBackend, WarehouseError, WarehouseResult};
use crate::models::{ConflictPolicy, round_price};
use crate::staging::StagingArea;

/// DuckDB warehouse backend
pub struct DuckDbWarehouse {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
    /// Bumped by every rebuild and every successful load
    version: AtomicU64,
}

fn lock_error(e: impl std::fmt::Display) -> WarehouseError {
    WarehouseError::ConnectionFailed(format!("Lock error: {}", e))
}

fn query_error(context: &str) -> impl Fn(duckdb::Error) -> WarehouseError + '_ {
    move |e| WarehouseError::QueryFailed(format!("{}: {}", context, e))
}

impl DuckDbWarehouse {
    /// Open (or create) a file-based warehouse database
    pub fn open(db_path: impl AsRef<Path>) -> WarehouseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            WarehouseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        tracing::info!("Opened DuckDB warehouse at {}", path.display());
        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
            version: AtomicU64::new(0),
        })
    }

    /// Create an in-memory warehouse database
    pub fn in_memory() -> WarehouseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            WarehouseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
            version: AtomicU64::new(0),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    /// Number of rebuilds and loads applied through this handle
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn execute_batch(&self, sql: &str) -> WarehouseResult<()> {
        let conn = self.connection.lock().map_err(lock_error)?;
        conn.execute_batch(sql)
            .map_err(query_error("Batch execute failed"))
    }

    /// Replace the contents of the staging tables with `area`
    pub fn stage(&self, area: &StagingArea) -> WarehouseResult<()> {
        let mut conn = self.connection.lock().map_err(lock_error)?;
        let tx = conn
            .transaction()
            .map_err(|e| WarehouseError::TransactionFailed(e.to_string()))?;

        stage_rows(&tx, area)?;

        tx.commit()
            .map_err(|e| WarehouseError::TransactionFailed(e.to_string()))
    }

    /// Drop and recreate the warehouse tables
    pub fn rebuild_schema(&self) -> WarehouseResult<()> {
        let sql = WarehouseSchema::rebuild_sql()?;
        tracing::debug!("Rebuilding warehouse schema:\n{}", sql);
        self.execute_batch(&sql)?;

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Warehouse schema rebuilt (version {})", version);
        Ok(())
    }

    /// Stage `area` and populate the warehouse from it in one transaction.
    ///
    /// A failed load rolls back the staging tables along with the warehouse.
    pub fn load(&self, area: &StagingArea, policy: ConflictPolicy) -> WarehouseResult<LoadReport> {
        let start = Instant::now();

        let mut conn = self.connection.lock().map_err(lock_error)?;
        if !warehouse_exists(&conn)? {
            return Err(WarehouseError::NotInitialized);
        }

        let mut report = LoadReport::new(self.version() + 1, policy);
        tracing::info!(
            "Loading warehouse (batch {}, conflict policy {})",
            report.batch_id,
            policy
        );

        let tx = conn
            .transaction()
            .map_err(|e| WarehouseError::TransactionFailed(e.to_string()))?;

        stage_rows(&tx, area)?;

        let (product_rows, product_keys, customer_rows, customer_keys) = tx
            .query_row(load_sql::STAGED_ROW_COUNTS, [], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(query_error("Failed to count staged rows"))?;

        let product_conflicts = conflicting_keys(&tx, load_sql::CONFLICTING_PRODUCTS)?;
        let customer_conflicts = conflicting_keys(&tx, load_sql::CONFLICTING_CUSTOMERS)?;

        if policy == ConflictPolicy::Reject {
            if let Some(key) = product_conflicts.first() {
                return Err(WarehouseError::DuplicateNaturalKey {
                    table: WarehouseTable::ProductDim.name(),
                    key: key.clone(),
                });
            }
            if let Some(key) = customer_conflicts.first() {
                return Err(WarehouseError::DuplicateNaturalKey {
                    table: WarehouseTable::CustomerDim.name(),
                    key: key.clone(),
                });
            }
        }
        for key in product_conflicts.iter().chain(customer_conflicts.iter()) {
            tracing::warn!("Conflicting rows for natural key '{}', resolving with {}", key, policy);
        }

        let statements = WarehouseSchema::load_statements(policy);
        let targets = [
            WarehouseTable::ProductDim,
            WarehouseTable::CustomerDim,
            WarehouseTable::SalesFact,
        ];
        let mut inserted = [0usize; 3];
        for (i, (sql, table)) in statements.iter().zip(targets).enumerate() {
            inserted[i] = tx.execute(sql, []).map_err(|e| insert_error(table, e))?;
        }

        report.products = DimensionLoadStats {
            staged_rows: product_rows as usize,
            rows_loaded: inserted[0],
            duplicates_collapsed: (product_rows - product_keys) as usize,
            conflicts_resolved: product_conflicts.len(),
        };
        report.customers = DimensionLoadStats {
            staged_rows: customer_rows as usize,
            rows_loaded: inserted[1],
            duplicates_collapsed: (customer_rows - customer_keys) as usize,
            conflicts_resolved: customer_conflicts.len(),
        };
        report.sales_staged = area.sales.len();
        report.sales_loaded = inserted[2];
        tx.execute(load_sql::INSERT_SALES_REJECTED, [])
            .map_err(query_error("Failed to record rejected sales"))?;
        report.rejected_sales = rejected_sales(&tx)?;

        tx.commit()
            .map_err(|e| WarehouseError::TransactionFailed(e.to_string()))?;
        self.version.fetch_add(1, Ordering::SeqCst);

        if !report.rejected_sales.is_empty() {
            tracing::warn!(
                "{} sales dropped: product or customer not found in dimensions",
                report.sales_dropped()
            );
        }
        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Loaded {} products, {} customers, {} sales in {}ms",
            report.products.rows_loaded,
            report.customers.rows_loaded,
            report.sales_loaded,
            report.duration_ms
        );

        Ok(report)
    }

    /// Run a SQL query and collect the rows as JSON objects
    pub fn query(&self, sql: &str) -> WarehouseResult<QueryResult> {
        let start = Instant::now();
        let conn = self.connection.lock().map_err(lock_error)?;

        let mut stmt = conn.prepare(sql).map_err(query_error("Prepare failed"))?;
        let mut result_rows = stmt.query([]).map_err(query_error("Query failed"))?;

        // Column names are only known once the statement has run
        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows.next().map_err(query_error("Row fetch error"))? {
            rows.push(row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run one report
    pub fn run_report(
        &self,
        kind: ReportKind,
        config: &ReportsSection,
        as_of: NaiveDate,
    ) -> WarehouseResult<QueryResult> {
        {
            let conn = self.connection.lock().map_err(lock_error)?;
            if !warehouse_exists(&conn)? {
                return Err(WarehouseError::NotInitialized);
            }
        }
        let result = self.query(&kind.sql(config, as_of))?;
        tracing::info!("Report {} returned {} rows", kind, result.row_count());
        Ok(result)
    }

    /// Sales dropped by the last successful load, from `sales_rejected`
    pub fn rejected_sales(&self) -> WarehouseResult<Vec<RejectedSale>> {
        let conn = self.connection.lock().map_err(lock_error)?;
        conn.execute_batch(WarehouseSchema::create_staging_tables_sql())
            .map_err(query_error("Failed to create staging tables"))?;
        rejected_sales(&conn)
    }

    /// Row count of one warehouse table
    pub fn row_count(&self, table: WarehouseTable) -> WarehouseResult<usize> {
        let conn = self.connection.lock().map_err(lock_error)?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| {
                row.get(0)
            })
            .map_err(query_error("Count failed"))?;
        Ok(count as usize)
    }
}

fn warehouse_exists(conn: &duckdb::Connection) -> WarehouseResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [WarehouseTable::SalesFact.name()],
            |row| row.get(0),
        )
        .map_err(query_error("Failed to inspect catalog"))?;
    Ok(count > 0)
}

fn conflicting_keys(conn: &duckdb::Connection, sql: &str) -> WarehouseResult<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(query_error("Prepare failed"))?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(query_error("Conflict check failed"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error("Conflict check failed"))?;
    Ok(keys)
}

/// Create the staging tables if needed and replace their contents with `area`
fn stage_rows(conn: &duckdb::Connection, area: &StagingArea) -> WarehouseResult<()> {
    conn.execute_batch(WarehouseSchema::create_staging_tables_sql())
        .map_err(query_error("Failed to create staging tables"))?;
    conn.execute_batch(WarehouseSchema::truncate_staging_tables_sql())
        .map_err(query_error("Failed to clear staging tables"))?;

    let mut stmt = conn
        .prepare(staging_sql::INSERT_PRODUCT)
        .map_err(query_error("Prepare failed"))?;
    for (row_num, p) in area.products.iter().enumerate() {
        stmt.execute(duckdb::params![
            row_num as i64,
            &p.product_id,
            &p.product_name,
            &p.category,
            p.price.map(|price| round_price(price).to_string()),
        ])
        .map_err(query_error("Failed to stage product"))?;
    }

    let mut stmt = conn
        .prepare(staging_sql::INSERT_CUSTOMER)
        .map_err(query_error("Prepare failed"))?;
    for (row_num, c) in area.customers.iter().enumerate() {
        stmt.execute(duckdb::params![
            row_num as i64,
            &c.customer_id,
            &c.name,
            &c.email,
            &c.country,
        ])
        .map_err(query_error("Failed to stage customer"))?;
    }

    let mut stmt = conn
        .prepare(staging_sql::INSERT_SALE)
        .map_err(query_error("Prepare failed"))?;
    for (row_num, s) in area.sales.iter().enumerate() {
        stmt.execute(duckdb::params![
            row_num as i64,
            &s.transaction_id,
            &s.product_id,
            &s.customer_id,
            s.quantity,
            s.transaction_date.to_string(),
        ])
        .map_err(query_error("Failed to stage sale"))?;
    }

    tracing::info!(
        "Staged {} products, {} customers, {} sales into DuckDB",
        area.products.len(),
        area.customers.len(),
        area.sales.len()
    );
    Ok(())
}

fn rejected_sales(conn: &duckdb::Connection) -> WarehouseResult<Vec<RejectedSale>> {
    let mut stmt = conn
        .prepare(load_sql::SELECT_SALES_REJECTED)
        .map_err(query_error("Prepare failed"))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(query_error("Rejected sales query failed"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error("Rejected sales query failed"))?;

    rows.into_iter()
        .map(|(transaction_id, product_id, customer_id, reason)| {
            let reasons = RejectedSale::parse_reasons(&reason).map_err(|e| {
                WarehouseError::SerializationError(format!(
                    "sales_rejected row {}: {}",
                    transaction_id, e
                ))
            })?;
            Ok(RejectedSale {
                transaction_id,
                product_id,
                customer_id,
                reasons,
            })
        })
        .collect()
}

/// DuckDB reports key violations as "Constraint Error: ..."
fn insert_error(table: WarehouseTable, error: duckdb::Error) -> WarehouseError {
    let message = error.to_string();
    if message.contains("Constraint Error") {
        WarehouseError::ConstraintViolation {
            table: table.name(),
            constraint: table
                .natural_key_constraint()
                .unwrap_or("fk_sales_fact"),
            detail: message,
        }
    } else {
        WarehouseError::QueryFailed(format!("Insert into {} failed: {}", table, message))
    }
}

fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (i, col_name) in columns.iter().enumerate() {
        let value = match row.get_ref(i) {
            Ok(value_ref) => value_ref_to_json(value_ref),
            Err(_) => serde_json::Value::Null,
        };
        map.insert(col_name.clone(), value);
    }
    serde_json::Value::Object(map)
}

/// Decimals and dates come out as strings, as the in-memory backend renders them
fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(i) => i.into(),
        ValueRef::SmallInt(i) => i.into(),
        ValueRef::Int(i) => i.into(),
        ValueRef::BigInt(i) => i.into(),
        ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
        ValueRef::UTinyInt(i) => i.into(),
        ValueRef::USmallInt(i) => i.into(),
        ValueRef::UInt(i) => i.into(),
        ValueRef::UBigInt(i) => i.into(),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Decimal(d) => serde_json::Value::String(d.normalize().to_string()),
        ValueRef::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| serde_json::Value::String(dt.date_naive().to_string()))
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}

impl WarehouseBackend for DuckDbWarehouse {
    fn rebuild_schema(&self) -> WarehouseResult<()> {
        DuckDbWarehouse::rebuild_schema(self)
    }

    fn load(&self, staging: &StagingArea, policy: ConflictPolicy) -> WarehouseResult<LoadReport> {
        DuckDbWarehouse::load(self, staging, policy)
    }

    fn run_report(
        &self,
        kind: ReportKind,
        config: &ReportsSection,
        as_of: NaiveDate,
    ) -> WarehouseResult<QueryResult> {
        DuckDbWarehouse::run_report(self, kind, config, as_of)
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawCustomer, RawProduct, RawSale, RejectReason};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn staging() -> StagingArea {
        StagingArea::new(
            vec![
                RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.99").ok()),
                RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.99").ok()),
            ],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            vec![
                RawSale::new("T1", "P1", "C1", 3, date(2024, 1, 5)),
                RawSale::new("T2", "P9", "C1", 1, date(2024, 1, 6)),
            ],
        )
    }

    #[test]
    fn test_in_memory_database() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        assert!(warehouse.is_in_memory());
        assert!(warehouse.db_path().is_none());
        assert_eq!(warehouse.backend_type(), "duckdb");
    }

    #[test]
    fn test_load_requires_schema() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        assert!(matches!(
            warehouse.load(&staging(), ConflictPolicy::default()),
            Err(WarehouseError::NotInitialized)
        ));
    }

    #[test]
    fn test_load_and_report() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();

        let report = warehouse.load(&staging(), ConflictPolicy::default()).unwrap();
        assert_eq!(report.products.rows_loaded, 1);
        assert_eq!(report.products.duplicates_collapsed, 1);
        assert_eq!(report.sales_loaded, 1);
        assert_eq!(report.rejected_sales.len(), 1);
        assert_eq!(report.rejected_sales[0].transaction_id, "T2");
        assert_eq!(warehouse.row_count(WarehouseTable::SalesFact).unwrap(), 1);

        let result = warehouse
            .run_report(
                ReportKind::MonthlyRevenue,
                &ReportsSection::default(),
                date(2024, 6, 1),
            )
            .unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.rows[0]["month"], "2024-01-01");
        assert_eq!(result.rows[0]["revenue"], "29.97");
    }

    #[test]
    fn test_reload_without_rebuild_fails() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();
        warehouse.load(&staging(), ConflictPolicy::default()).unwrap();

        let err = warehouse
            .load(&staging(), ConflictPolicy::default())
            .unwrap_err();
        assert!(matches!(
            err,
            WarehouseError::ConstraintViolation { table: "product_dim", .. }
        ));
        assert_eq!(warehouse.row_count(WarehouseTable::SalesFact).unwrap(), 1);
    }

    fn staged_count(warehouse: &DuckDbWarehouse, table: &str) -> i64 {
        let result = warehouse
            .query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .unwrap();
        result.rows[0]["n"].as_i64().unwrap()
    }

    #[test]
    fn test_rejected_sales_table() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();

        let mut area = staging();
        area.sales.push(RawSale::new("T3", "P9", "C9", 2, date(2024, 1, 7)));
        let report = warehouse.load(&area, ConflictPolicy::default()).unwrap();

        let result = warehouse
            .query("SELECT transaction_id, reject_reason FROM sales_rejected ORDER BY row_num")
            .unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[0]["transaction_id"], "T2");
        assert_eq!(result.rows[0]["reject_reason"], "INVALID_PRODUCT_ID;");
        assert_eq!(result.rows[1]["transaction_id"], "T3");
        assert_eq!(
            result.rows[1]["reject_reason"],
            "INVALID_PRODUCT_ID;INVALID_CUSTOMER_ID;"
        );

        assert_eq!(warehouse.rejected_sales().unwrap(), report.rejected_sales);
        assert_eq!(
            report.rejected_sales[1].reasons,
            vec![RejectReason::InvalidProductId, RejectReason::InvalidCustomerId]
        );
    }

    #[test]
    fn test_failed_load_keeps_previous_staging() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();
        warehouse.load(&staging(), ConflictPolicy::default()).unwrap();
        assert_eq!(staged_count(&warehouse, "raw_products"), 2);
        assert_eq!(staged_count(&warehouse, "raw_sales"), 2);

        // Reloading without a rebuild breaks the product_dim key
        let next = StagingArea::new(
            vec![RawProduct::new("P1", "Widget", "Tools", None)],
            vec![RawCustomer::new("C2", "Bo", None, None)],
            vec![RawSale::new("T9", "P1", "C2", 1, date(2024, 3, 1))],
        );
        assert!(warehouse.load(&next, ConflictPolicy::default()).is_err());

        assert_eq!(staged_count(&warehouse, "raw_products"), 2);
        assert_eq!(staged_count(&warehouse, "raw_customers"), 1);
        assert_eq!(staged_count(&warehouse, "raw_sales"), 2);
        assert_eq!(warehouse.rejected_sales().unwrap()[0].transaction_id, "T2");
        assert_eq!(warehouse.version(), 2);
    }

    #[test]
    fn test_rejected_conflict_rolls_back_staging() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();
        warehouse.load(&staging(), ConflictPolicy::default()).unwrap();
        warehouse.rebuild_schema().unwrap();

        let conflicting = StagingArea::new(
            vec![
                RawProduct::new("P1", "Widget", "Tools", None),
                RawProduct::new("P1", "Widget Pro", "Tools", None),
                RawProduct::new("P2", "Gadget", "Tools", None),
            ],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            Vec::new(),
        );
        assert!(matches!(
            warehouse.load(&conflicting, ConflictPolicy::Reject),
            Err(WarehouseError::DuplicateNaturalKey { table: "product_dim", ref key }) if key == "P1"
        ));
        assert_eq!(staged_count(&warehouse, "raw_products"), 2);
        assert_eq!(staged_count(&warehouse, "sales_rejected"), 1);
    }

    #[test]
    fn test_stage_outside_a_load() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.stage(&staging()).unwrap();
        assert_eq!(staged_count(&warehouse, "raw_products"), 2);
        assert_eq!(staged_count(&warehouse, "sales_rejected"), 0);
        assert!(warehouse.rejected_sales().unwrap().is_empty());
    }

    #[test]
    fn test_prices_stored_at_four_places() {
        let warehouse = DuckDbWarehouse::in_memory().unwrap();
        warehouse.rebuild_schema().unwrap();
        let area = StagingArea::new(
            vec![RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("0.33335").ok())],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            vec![RawSale::new("T1", "P1", "C1", 3, date(2024, 1, 5))],
        );
        warehouse.load(&area, ConflictPolicy::default()).unwrap();

        let result = warehouse.query("SELECT price FROM product_dim").unwrap();
        assert_eq!(result.rows[0]["price"], "0.3334");

        let revenue = warehouse
            .run_report(
                ReportKind::MonthlyRevenue,
                &ReportsSection::default(),
                date(2024, 6, 1),
            )
            .unwrap();
        assert_eq!(revenue.rows[0]["revenue"], "1.0002");
    }
}
