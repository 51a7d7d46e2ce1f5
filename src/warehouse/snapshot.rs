//! In-memory warehouse engine
//!
//! Tables are plain vectors with the indexes the schema declares: a unique
//! natural key index per dimension and three ordered indexes on the fact
//! table. A [`WarehouseSnapshot`] is never modified once published. A load
//! works on a private copy of the current tables and publishes the copy as
//! the next version only when every insert succeeded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::config::ReportsSection;
use super::reports::{ReportKind, Reports};
use super::schema::{WarehouseTable, creation_order, drop_order};
use super::{
    LoadReport, QueryResult, WarehouseBackend, WarehouseError, WarehouseResult, load,
};
use crate::models::{
    ConflictPolicy, CustomerDim, CustomerKey, ProductDim, ProductKey, SalesFact, SalesKey,
};
use crate::staging::StagingArea;

/// A row of a dimension table
pub trait DimensionRow: Clone {
    type Key: Copy + Eq + std::hash::Hash + Ord + From<u64>;

    const TABLE: WarehouseTable;

    fn key(&self) -> Self::Key;

    fn natural_key(&self) -> &str;
}

impl DimensionRow for ProductDim {
    type Key = ProductKey;

    const TABLE: WarehouseTable = WarehouseTable::ProductDim;

    fn key(&self) -> ProductKey {
        self.product_key
    }

    fn natural_key(&self) -> &str {
        &self.product_id
    }
}

impl DimensionRow for CustomerDim {
    type Key = CustomerKey;

    const TABLE: WarehouseTable = WarehouseTable::CustomerDim;

    fn key(&self) -> CustomerKey {
        self.customer_key
    }

    fn natural_key(&self) -> &str {
        &self.customer_id
    }
}

/// A dimension table with its unique natural key index
#[derive(Debug, Clone)]
pub struct DimensionTable<R: DimensionRow> {
    rows: Vec<R>,
    by_key: HashMap<R::Key, usize>,
    by_natural_key: HashMap<String, R::Key>,
    next_key: u64,
}

impl<R: DimensionRow> Default for DimensionTable<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            by_key: HashMap::new(),
            by_natural_key: HashMap::new(),
            next_key: 1,
        }
    }
}

impl<R: DimensionRow> DimensionTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row built around a freshly allocated surrogate key.
    ///
    /// Fails without allocating a key if `natural_key` is already present.
    pub fn insert_with(
        &mut self,
        natural_key: &str,
        build: impl FnOnce(R::Key) -> R,
    ) -> WarehouseResult<R::Key> {
        if self.by_natural_key.contains_key(natural_key) {
            return Err(WarehouseError::ConstraintViolation {
                table: R::TABLE.name(),
                constraint: R::TABLE.natural_key_constraint().unwrap_or("unique"),
                detail: format!("duplicate natural key '{}'", natural_key),
            });
        }

        let key = R::Key::from(self.next_key);
        self.next_key += 1;

        let row = build(key);
        self.by_key.insert(key, self.rows.len());
        self.by_natural_key.insert(natural_key.to_string(), key);
        self.rows.push(row);

        Ok(key)
    }

    pub fn get(&self, key: R::Key) -> Option<&R> {
        self.by_key.get(&key).map(|&index| &self.rows[index])
    }

    /// Look up a surrogate key by natural key
    pub fn lookup(&self, natural_key: &str) -> Option<R::Key> {
        self.by_natural_key.get(natural_key).copied()
    }

    pub fn contains(&self, key: R::Key) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Values of a fact row before its surrogate key is allocated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub transaction_id: String,
    pub product_key: ProductKey,
    pub customer_key: CustomerKey,
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub transaction_date: NaiveDate,
}

/// The fact table and its indexes
#[derive(Debug, Clone)]
pub struct SalesFactTable {
    rows: Vec<SalesFact>,
    next_key: u64,
    /// `idx_sales_date_customer`
    by_date_customer: BTreeSet<(NaiveDate, CustomerKey, SalesKey)>,
    /// `idx_sales_date_product`
    by_date_product: BTreeSet<(NaiveDate, ProductKey, SalesKey)>,
    /// `idx_sales_product`
    by_product: BTreeMap<ProductKey, Vec<SalesKey>>,
}

impl Default for SalesFactTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_key: 1,
            by_date_customer: BTreeSet::new(),
            by_date_product: BTreeSet::new(),
            by_product: BTreeMap::new(),
        }
    }
}

impl SalesFactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact row after checking both foreign keys
    pub fn insert(
        &mut self,
        products: &DimensionTable<ProductDim>,
        customers: &DimensionTable<CustomerDim>,
        sale: NewSale,
    ) -> WarehouseResult<SalesKey> {
        if !products.contains(sale.product_key) {
            return Err(WarehouseError::ConstraintViolation {
                table: WarehouseTable::SalesFact.name(),
                constraint: "fk_sales_fact_product_key",
                detail: format!("product_key {} does not exist", sale.product_key),
            });
        }
        if !customers.contains(sale.customer_key) {
            return Err(WarehouseError::ConstraintViolation {
                table: WarehouseTable::SalesFact.name(),
                constraint: "fk_sales_fact_customer_key",
                detail: format!("customer_key {} does not exist", sale.customer_key),
            });
        }

        let sales_key = SalesKey(self.next_key);
        self.next_key += 1;

        self.by_date_customer
            .insert((sale.transaction_date, sale.customer_key, sales_key));
        self.by_date_product
            .insert((sale.transaction_date, sale.product_key, sales_key));
        self.by_product
            .entry(sale.product_key)
            .or_default()
            .push(sales_key);

        self.rows.push(SalesFact {
            sales_key,
            transaction_id: sale.transaction_id,
            product_key: sale.product_key,
            customer_key: sale.customer_key,
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            transaction_date: sale.transaction_date,
        });

        Ok(sales_key)
    }

    /// Keys are dense from 1, so the row for key `k` sits at `k - 1`
    pub fn get(&self, key: SalesKey) -> Option<&SalesFact> {
        let index = usize::try_from(key.get().checked_sub(1)?).ok()?;
        self.rows.get(index)
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[SalesFact] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(transaction_date, customer_key)` index entries on or after `since`
    pub fn customers_since(
        &self,
        since: NaiveDate,
    ) -> impl Iterator<Item = (NaiveDate, CustomerKey, SalesKey)> + '_ {
        self.by_date_customer
            .range((since, CustomerKey(0), SalesKey(0))..)
            .copied()
    }

    /// Facts ordered by `(transaction_date, product_key)`
    pub fn by_date_product(&self) -> impl Iterator<Item = &SalesFact> + '_ {
        self.by_date_product
            .iter()
            .filter_map(|(_, _, key)| self.get(*key))
    }

    /// Facts grouped by product, in product key order
    pub fn by_product(&self) -> impl Iterator<Item = (ProductKey, &[SalesKey])> + '_ {
        self.by_product
            .iter()
            .map(|(product, keys)| (*product, keys.as_slice()))
    }
}

/// All warehouse tables
#[derive(Debug, Clone, Default)]
pub struct WarehouseTables {
    pub products: DimensionTable<ProductDim>,
    pub customers: DimensionTable<CustomerDim>,
    pub sales: SalesFactTable,
}

impl WarehouseTables {
    /// Empty tables, created in foreign-key order
    pub fn create() -> WarehouseResult<Self> {
        let mut tables = Self::default();
        for table in creation_order()? {
            tracing::debug!("CREATE TABLE {}", table);
            match table {
                WarehouseTable::ProductDim => tables.products = DimensionTable::new(),
                WarehouseTable::CustomerDim => tables.customers = DimensionTable::new(),
                WarehouseTable::SalesFact => tables.sales = SalesFactTable::new(),
            }
        }
        Ok(tables)
    }

    pub fn row_count(&self, table: WarehouseTable) -> usize {
        match table {
            WarehouseTable::ProductDim => self.products.len(),
            WarehouseTable::CustomerDim => self.customers.len(),
            WarehouseTable::SalesFact => self.sales.len(),
        }
    }
}

/// One published, immutable version of the warehouse
#[derive(Debug, Clone)]
pub struct WarehouseSnapshot {
    version: u64,
    created_at: DateTime<Utc>,
    tables: WarehouseTables,
}

impl WarehouseSnapshot {
    fn new(version: u64, tables: WarehouseTables) -> Self {
        Self {
            version,
            created_at: Utc::now(),
            tables,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn products(&self) -> &DimensionTable<ProductDim> {
        &self.tables.products
    }

    pub fn customers(&self) -> &DimensionTable<CustomerDim> {
        &self.tables.customers
    }

    pub fn sales(&self) -> &SalesFactTable {
        &self.tables.sales
    }

    pub fn row_count(&self, table: WarehouseTable) -> usize {
        self.tables.row_count(table)
    }

    pub fn is_empty(&self) -> bool {
        WarehouseTable::ALL
            .iter()
            .all(|table| self.row_count(*table) == 0)
    }

    /// SHA-256 of the table contents with surrogate keys replaced by
    /// natural keys.
    ///
    /// Two snapshots loaded from the same staging data have the same
    /// fingerprint whatever keys they were assigned.
    pub fn fingerprint(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        for p in self.products().rows() {
            lines.push(format!(
                "product_dim|{}|{}|{}|{}",
                p.product_id,
                p.product_name,
                p.category,
                decimal_text(p.price)
            ));
        }

        for c in self.customers().rows() {
            lines.push(format!(
                "customer_dim|{}|{}|{}|{}",
                c.customer_id,
                c.name,
                c.email.as_deref().unwrap_or("\0"),
                c.country.as_deref().unwrap_or("\0")
            ));
        }

        for f in self.sales().rows() {
            let product_id = self
                .products()
                .get(f.product_key)
                .map(|p| p.product_id.as_str())
                .unwrap_or("\0");
            let customer_id = self
                .customers()
                .get(f.customer_key)
                .map(|c| c.customer_id.as_str())
                .unwrap_or("\0");
            lines.push(format!(
                "sales_fact|{}|{}|{}|{}|{}|{}",
                f.transaction_id,
                product_id,
                customer_id,
                f.quantity,
                decimal_text(f.unit_price),
                f.transaction_date
            ));
        }

        lines.sort();

        let mut hasher = Sha256::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Scale-independent text so 9.99 and 9.990 hash alike
fn decimal_text(value: Option<Decimal>) -> String {
    value
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| "\0".to_string())
}

#[derive(Debug, Default)]
struct Published {
    current: Option<Arc<WarehouseSnapshot>>,
    last_version: u64,
}

/// Tables built from staging, waiting to become the next version
struct PendingLoad {
    base_version: u64,
    tables: WarehouseTables,
    report: LoadReport,
}

/// The in-memory warehouse: a sequence of published snapshots.
///
/// Writers serialize on the store's lock; readers take an `Arc` to the
/// current snapshot and keep it for as long as they need.
#[derive(Debug, Default)]
pub struct Warehouse {
    state: RwLock<Published>,
}

impl Warehouse {
    /// A warehouse whose schema has not been created yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A warehouse with a freshly rebuilt, empty schema
    pub fn initialized() -> WarehouseResult<Self> {
        let warehouse = Self::new();
        warehouse.rebuild_schema()?;
        Ok(warehouse)
    }

    /// Drop every warehouse table and recreate it empty.
    ///
    /// Discards all loaded data. Readers holding an older snapshot keep it.
    pub fn rebuild_schema(&self) -> WarehouseResult<Arc<WarehouseSnapshot>> {
        let mut state = self
            .state
            .write()
            .map_err(|e| WarehouseError::Lock(e.to_string()))?;

        if state.current.is_some() {
            for table in drop_order()? {
                tracing::debug!("DROP TABLE IF EXISTS {}", table);
            }
        }
        let tables = WarehouseTables::create()?;

        let version = state.last_version + 1;
        let snapshot = Arc::new(WarehouseSnapshot::new(version, tables));
        state.current = Some(Arc::clone(&snapshot));
        state.last_version = version;

        tracing::info!("Warehouse schema rebuilt (version {})", version);
        Ok(snapshot)
    }

    /// Populate the warehouse from staging.
    ///
    /// All three tables are loaded into a working copy first; the copy is
    /// published only if every insert succeeded. On error the current
    /// snapshot is unchanged. The store's lock is not held while the copy
    /// is built, so readers are never blocked by a load.
    pub fn load(
        &self,
        staging: &StagingArea,
        policy: ConflictPolicy,
    ) -> WarehouseResult<LoadReport> {
        let pending = self.prepare_load(staging, policy)?;
        self.publish(pending)
    }

    fn prepare_load(
        &self,
        staging: &StagingArea,
        policy: ConflictPolicy,
    ) -> WarehouseResult<PendingLoad> {
        let (base, base_version) = {
            let state = self
                .state
                .read()
                .map_err(|e| WarehouseError::Lock(e.to_string()))?;
            let current = state.current.clone().ok_or(WarehouseError::NotInitialized)?;
            (current, state.last_version)
        };

        let mut tables = base.tables.clone();
        let report = load::load_into(&mut tables, staging, policy, base_version + 1)?;

        Ok(PendingLoad {
            base_version,
            tables,
            report,
        })
    }

    /// Publish a prepared load unless another writer got there first
    fn publish(&self, pending: PendingLoad) -> WarehouseResult<LoadReport> {
        let mut state = self
            .state
            .write()
            .map_err(|e| WarehouseError::Lock(e.to_string()))?;

        if state.last_version != pending.base_version {
            return Err(WarehouseError::TransactionFailed(format!(
                "warehouse moved from version {} to {} during the load; nothing was published",
                pending.base_version, state.last_version
            )));
        }

        let version = pending.base_version + 1;
        state.current = Some(Arc::new(WarehouseSnapshot::new(version, pending.tables)));
        state.last_version = version;

        Ok(pending.report)
    }

    /// The current snapshot
    pub fn snapshot(&self) -> WarehouseResult<Arc<WarehouseSnapshot>> {
        let state = self
            .state
            .read()
            .map_err(|e| WarehouseError::Lock(e.to_string()))?;
        state.current.clone().ok_or(WarehouseError::NotInitialized)
    }

    /// Version of the current snapshot, or `None` before the first rebuild
    pub fn version(&self) -> Option<u64> {
        self.snapshot().ok().map(|s| s.version())
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_ok()
    }
}

impl WarehouseBackend for Warehouse {
    fn rebuild_schema(&self) -> WarehouseResult<()> {
        Warehouse::rebuild_schema(self).map(|_| ())
    }

    fn load(&self, staging: &StagingArea, policy: ConflictPolicy) -> WarehouseResult<LoadReport> {
        Warehouse::load(self, staging, policy)
    }

    fn run_report(
        &self,
        kind: ReportKind,
        config: &ReportsSection,
        as_of: NaiveDate,
    ) -> WarehouseResult<QueryResult> {
        let snapshot = self.snapshot()?;
        Reports::new(&snapshot, config).run(kind, as_of)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
