//! Sales Warehouse - a small star-schema sales data warehouse
//!
//! Provides:
//! - Staging: CSV ingestion of products, customers and sales, with cleansing
//! - Warehouse: product and customer dimensions plus a sales fact table,
//!   rebuilt and loaded from staging as immutable, versioned snapshots
//! - Reports: top products, frequent customers and revenue by category
//! - An optional DuckDB backend running the same pipeline as SQL
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_warehouse::{ConflictPolicy, Reports, Warehouse, WarehouseConfig, stage_directory};
//!
//! let config = WarehouseConfig::load(Path::new("."))?;
//! let staged = stage_directory(&config.data_dir(Path::new(".")), &config.staging)?;
//!
//! let warehouse = Warehouse::initialized()?;
//! warehouse.load(&staged.area, config.load.conflict_policy)?;
//!
//! let snapshot = warehouse.snapshot()?;
//! for row in Reports::new(&snapshot, &config.reports).top_products() {
//!     println!("{} {}", row.product_id, row.total_quantity);
//! }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod models;
pub mod staging;
pub mod validation;
pub mod warehouse;

// Re-export models
pub use models::enums::*;
pub use models::{
    CustomerDim, CustomerKey, ProductDim, ProductKey, RawCustomer, RawProduct, RawSale, SalesFact,
    SalesKey,
};

pub use staging::{StagedData, StagingArea, StagingError, StagingResult, stage_directory};
pub use validation::{CleanseReport, ValidationError, ValidationResult, cleanse};

#[cfg(feature = "duckdb-backend")]
pub use warehouse::DuckDbWarehouse;
pub use warehouse::{
    LoadReport, OutputFormat, QueryResult, RejectedSale, ReportKind, Reports, Warehouse,
    WarehouseBackend, WarehouseConfig, WarehouseError, WarehouseResult, WarehouseSchema,
    WarehouseSnapshot, WarehouseTable, format_query_result,
};
