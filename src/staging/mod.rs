//! Staging layer
//!
//! The landing zone for raw product, customer and sales records. Rows here
//! are typed but unconstrained: duplicates and dangling references are
//! allowed and left for the load to deal with.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_warehouse::staging::stage_directory;
//! use sales_warehouse::warehouse::config::WarehouseConfig;
//!
//! let config = WarehouseConfig::load(Path::new("."))?;
//! let staged = stage_directory(Path::new("./data"), &config.staging)?;
//! println!("{} sales staged", staged.area.sales.len());
//! ```

mod error;
pub mod generate;
pub mod ingest;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{StagingError, StagingResult};
pub use generate::{GenerateOptions, GenerateSummary, SourceGenerator, append_sales, generate_directory};
pub use ingest::{IngestStats, SourceBatch, SourceFiles};

use crate::models::{RawCustomer, RawProduct, RawSale};
use crate::validation::{CleanseReport, cleanse};
use crate::warehouse::config::StagingSection;

/// The three staging tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingArea {
    pub products: Vec<RawProduct>,
    pub customers: Vec<RawCustomer>,
    pub sales: Vec<RawSale>,
}

impl StagingArea {
    pub fn new(products: Vec<RawProduct>, customers: Vec<RawCustomer>, sales: Vec<RawSale>) -> Self {
        Self {
            products,
            customers,
            sales,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.customers.is_empty() && self.sales.is_empty()
    }

    /// Number of distinct `product_id` values
    pub fn distinct_product_ids(&self) -> usize {
        self.products
            .iter()
            .map(|p| p.product_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of distinct `customer_id` values
    pub fn distinct_customer_ids(&self) -> usize {
        self.customers
            .iter()
            .map(|c| c.customer_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Staging area together with what happened on the way in
#[derive(Debug, Clone)]
pub struct StagedData {
    pub area: StagingArea,
    pub ingest: IngestStats,
    pub cleanse: CleanseReport,
}

/// Read, then cleanse, the source files found in `data_dir`
pub fn stage_directory(data_dir: &Path, staging: &StagingSection) -> StagingResult<StagedData> {
    let files = SourceFiles::discover(data_dir, staging)?;
    let (batch, ingest) = files.read()?;
    let (area, cleanse) = cleanse(batch);

    tracing::info!(
        "Staged {} products, {} customers, {} sales ({} rows dropped by cleansing)",
        area.products.len(),
        area.customers.len(),
        area.sales.len(),
        cleanse.rows_dropped()
    );

    Ok(StagedData {
        area,
        ingest,
        cleanse,
    })
}
