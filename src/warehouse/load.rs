//! Transform and load
//!
//! Populates the two dimensions and the fact table from the staging area:
//!
//! 1. one dimension row per distinct natural key, conflicts settled by
//!    [`ConflictPolicy`]
//! 2. one fact row per staged sale whose product and customer both
//!    resolve, with the product's price copied as `unit_price`
//!
//! Sales that do not resolve are dropped and listed in the [`LoadReport`].

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::WarehouseTable;
use super::snapshot::{NewSale, WarehouseTables};
use super::{QueryResult, WarehouseError, WarehouseResult};
use crate::models::{
    ConflictPolicy, CustomerDim, DimensionSource, ProductDim, RawCustomer, RawProduct,
    RejectReason, round_price,
};
use crate::staging::StagingArea;

/// A staged sale that produced no fact row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedSale {
    pub transaction_id: String,
    pub product_id: String,
    pub customer_id: String,
    pub reasons: Vec<RejectReason>,
}

impl RejectedSale {
    /// Reasons as one `;`-terminated string, e.g. `INVALID_PRODUCT_ID;INVALID_CUSTOMER_ID;`
    pub fn reject_reason(&self) -> String {
        self.reasons.iter().map(|r| format!("{};", r)).collect()
    }

    /// Inverse of [`RejectedSale::reject_reason`]
    pub fn parse_reasons(text: &str) -> Result<Vec<RejectReason>, String> {
        text.split(';')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

/// Outcome of one dimension's deduplication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionLoadStats {
    pub staged_rows: usize,
    pub rows_loaded: usize,
    /// Identical or conflicting rows folded into another row
    pub duplicates_collapsed: usize,
    /// Natural keys that had more than one distinct attribute tuple
    pub conflicts_resolved: usize,
}

/// Summary of one load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub batch_id: Uuid,
    /// Version published by this load
    pub version: u64,
    pub policy: ConflictPolicy,
    pub products: DimensionLoadStats,
    pub customers: DimensionLoadStats,
    pub sales_staged: usize,
    pub sales_loaded: usize,
    pub rejected_sales: Vec<RejectedSale>,
    pub duration_ms: u64,
}

impl LoadReport {
    pub fn new(version: u64, policy: ConflictPolicy) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            version,
            policy,
            products: DimensionLoadStats::default(),
            customers: DimensionLoadStats::default(),
            sales_staged: 0,
            sales_loaded: 0,
            rejected_sales: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn sales_dropped(&self) -> usize {
        self.rejected_sales.len()
    }

    /// The dropped sales as a printable result, one row per sale
    pub fn rejected_sales_result(&self) -> QueryResult {
        let rows = self
            .rejected_sales
            .iter()
            .map(|sale| {
                serde_json::json!({
                    "transaction_id": sale.transaction_id,
                    "product_id": sale.product_id,
                    "customer_id": sale.customer_id,
                    "reject_reason": sale.reject_reason(),
                })
            })
            .collect();
        QueryResult::new(
            ["transaction_id", "product_id", "customer_id", "reject_reason"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows,
        )
    }

    /// Rejections counted per reason; a sale missing both sides counts twice
    pub fn rejections_by_reason(&self) -> HashMap<RejectReason, usize> {
        let mut counts = HashMap::new();
        for sale in &self.rejected_sales {
            for reason in &sale.reasons {
                *counts.entry(*reason).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Dimension rows chosen from staging, in order of first appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRows<R> {
    pub rows: Vec<R>,
    pub stats: DimensionLoadStats,
}

/// Pick one staging row per natural key.
///
/// Identical duplicates always collapse. When a key carries several
/// distinct tuples the policy decides which one survives, or fails the
/// load with [`WarehouseError::DuplicateNaturalKey`] under `reject`.
pub fn resolve_dimension<R: DimensionSource>(
    staged: &[R],
    policy: ConflictPolicy,
    table: WarehouseTable,
) -> WarehouseResult<ResolvedRows<R>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&R>> = HashMap::new();

    for row in staged {
        let key = row.natural_key();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }

    let mut stats = DimensionLoadStats {
        staged_rows: staged.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(order.len());

    for key in order {
        let candidates = &groups[key];

        let mut seen = HashSet::new();
        let distinct: Vec<&R> = candidates
            .iter()
            .copied()
            .filter(|row| seen.insert(*row))
            .collect();

        let chosen = if distinct.len() == 1 {
            distinct[0]
        } else {
            stats.conflicts_resolved += 1;
            tracing::warn!(
                "[{}] {} distinct rows for natural key '{}', resolving with {}",
                table,
                distinct.len(),
                key,
                policy
            );
            match policy {
                ConflictPolicy::FirstSeen => distinct[0],
                ConflictPolicy::LastSeen => candidates[candidates.len() - 1],
                ConflictPolicy::MostComplete => most_complete(&distinct),
                ConflictPolicy::Reject => {
                    return Err(WarehouseError::DuplicateNaturalKey {
                        table: table.name(),
                        key: key.to_string(),
                    });
                }
            }
        };

        rows.push(chosen.clone());
    }

    stats.rows_loaded = rows.len();
    stats.duplicates_collapsed = stats.staged_rows - stats.rows_loaded;

    Ok(ResolvedRows { rows, stats })
}

/// Highest completeness wins; the earliest candidate wins a tie
fn most_complete<'a, R: DimensionSource>(candidates: &[&'a R]) -> &'a R {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.completeness() > best.completeness() {
            best = candidate;
        }
    }
    best
}

/// Load `staging` into `tables`.
///
/// Stops at the first failing insert; the caller discards `tables` in that
/// case, so a partially filled working copy is never published.
pub(crate) fn load_into(
    tables: &mut WarehouseTables,
    staging: &StagingArea,
    policy: ConflictPolicy,
    version: u64,
) -> WarehouseResult<LoadReport> {
    let start = Instant::now();
    let mut report = LoadReport::new(version, policy);

    tracing::info!(
        "Loading warehouse (batch {}, conflict policy {})",
        report.batch_id,
        policy
    );

    // Prices are stored at the warehouse scale before duplicates are compared
    let staged_products: Vec<RawProduct> = staging
        .products
        .iter()
        .cloned()
        .map(|mut product| {
            product.price = product.price.map(round_price);
            product
        })
        .collect();
    let products = resolve_dimension(&staged_products, policy, WarehouseTable::ProductDim)?;
    load_products(tables, &products.rows)?;
    report.products = products.stats;

    let customers = resolve_dimension(&staging.customers, policy, WarehouseTable::CustomerDim)?;
    load_customers(tables, &customers.rows)?;
    report.customers = customers.stats;

    report.sales_staged = staging.sales.len();
    for sale in &staging.sales {
        let product_key = tables.products.lookup(&sale.product_id);
        let customer_key = tables.customers.lookup(&sale.customer_id);

        let (Some(product_key), Some(customer_key)) = (product_key, customer_key) else {
            let mut reasons = Vec::new();
            if product_key.is_none() {
                reasons.push(RejectReason::InvalidProductId);
            }
            if customer_key.is_none() {
                reasons.push(RejectReason::InvalidCustomerId);
            }
            report.rejected_sales.push(RejectedSale {
                transaction_id: sale.transaction_id.clone(),
                product_id: sale.product_id.clone(),
                customer_id: sale.customer_id.clone(),
                reasons,
            });
            continue;
        };

        let unit_price = tables.products.get(product_key).and_then(|p| p.price);
        tables.sales.insert(
            &tables.products,
            &tables.customers,
            NewSale {
                transaction_id: sale.transaction_id.clone(),
                product_key,
                customer_key,
                quantity: sale.quantity,
                unit_price,
                transaction_date: sale.transaction_date,
            },
        )?;
        report.sales_loaded += 1;
    }

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

fn load_products(tables: &mut WarehouseTables, rows: &[RawProduct]) -> WarehouseResult<()> {
    for row in rows {
        tables
            .products
            .insert_with(&row.product_id, |product_key| ProductDim {
                product_key,
                product_id: row.product_id.clone(),
                product_name: row.product_name.clone(),
                category: row.category.clone(),
                price: row.price,
            })?;
    }
    Ok(())
}

fn load_customers(tables: &mut WarehouseTables, rows: &[RawCustomer]) -> WarehouseResult<()> {
    for row in rows {
        tables
            .customers
            .insert_with(&row.customer_id, |customer_key| CustomerDim {
                customer_key,
                customer_id: row.customer_id.clone(),
                name: row.name.clone(),
                email: row.email.clone(),
                country: row.country.clone(),
            })?;
    }
    Ok(())
}
