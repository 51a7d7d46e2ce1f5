//! Analytical reports
//!
//! Four read-only queries over one [`WarehouseSnapshot`]. Each report is a
//! pure function of the snapshot, the [`ReportConfig`] and, for frequent
//! customers, the `as_of` date. An empty warehouse gives empty results.
//!
//! Every report also has a SQL rendering ([`ReportKind::sql`]) that the
//! DuckDB backend executes and the CLI can print.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::ReportConfig;
use super::snapshot::WarehouseSnapshot;
use super::{QueryResult, WarehouseResult};
use crate::models::{CustomerKey, ProductKey};

/// The four reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    TopProducts,
    FrequentCustomers,
    MonthlyRevenue,
    YearlyMonthlyRevenue,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::TopProducts,
        ReportKind::FrequentCustomers,
        ReportKind::MonthlyRevenue,
        ReportKind::YearlyMonthlyRevenue,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::TopProducts => "Top products by quantity sold",
            ReportKind::FrequentCustomers => "Frequent customers",
            ReportKind::MonthlyRevenue => "Monthly revenue by category",
            ReportKind::YearlyMonthlyRevenue => "Revenue by year, month and category",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ReportKind::TopProducts => &["product_id", "product_name", "total_quantity"],
            ReportKind::FrequentCustomers => &["customer_id", "name", "purchase_count"],
            ReportKind::MonthlyRevenue => &["month", "category", "revenue"],
            ReportKind::YearlyMonthlyRevenue => &["year", "month", "category", "revenue"],
        }
    }

    /// SQL for this report with the parameters inlined
    pub fn sql(&self, config: &ReportConfig, as_of: NaiveDate) -> String {
        match self {
            ReportKind::TopProducts => format!(
                r#"SELECT p.product_id, p.product_name, CAST(SUM(f.quantity) AS BIGINT) AS total_quantity
FROM sales_fact f
JOIN product_dim p ON f.product_key = p.product_key
GROUP BY p.product_id, p.product_name
ORDER BY total_quantity DESC, p.product_id
LIMIT {}"#,
                config.top_products_limit
            ),
            ReportKind::FrequentCustomers => format!(
                r#"SELECT c.customer_id, c.name, COUNT(*) AS purchase_count
FROM sales_fact f
JOIN customer_dim c ON f.customer_key = c.customer_key
WHERE f.transaction_date >= DATE '{}'
GROUP BY c.customer_id, c.name
HAVING COUNT(*) > {}
ORDER BY purchase_count DESC, c.customer_id"#,
                window_start(as_of, config.frequent_window_days),
                config.frequent_min_purchases
            ),
            ReportKind::MonthlyRevenue => r#"SELECT CAST(date_trunc('month', f.transaction_date) AS DATE) AS month,
    p.category,
    SUM(f.quantity * f.unit_price) AS revenue
FROM sales_fact f
JOIN product_dim p ON f.product_key = p.product_key
GROUP BY 1, 2
ORDER BY 1, 2"#
                .to_string(),
            ReportKind::YearlyMonthlyRevenue => r#"SELECT CAST(EXTRACT(YEAR FROM f.transaction_date) AS INTEGER) AS year,
    CAST(EXTRACT(MONTH FROM f.transaction_date) AS INTEGER) AS month,
    p.category,
    SUM(f.quantity * f.unit_price) AS revenue
FROM sales_fact f
JOIN product_dim p ON f.product_key = p.product_key
GROUP BY 1, 2, 3
ORDER BY 1, 2, 3"#
                .to_string(),
        }
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-products" => Ok(ReportKind::TopProducts),
            "frequent-customers" => Ok(ReportKind::FrequentCustomers),
            "monthly-revenue" => Ok(ReportKind::MonthlyRevenue),
            "yearly-monthly-revenue" | "year-month-revenue" => {
                Ok(ReportKind::YearlyMonthlyRevenue)
            }
            _ => Err(format!(
                "Unknown report: {}. Use 'top-products', 'frequent-customers', 'monthly-revenue' or 'yearly-monthly-revenue'.",
                s
            )),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::TopProducts => write!(f, "top-products"),
            ReportKind::FrequentCustomers => write!(f, "frequent-customers"),
            ReportKind::MonthlyRevenue => write!(f, "monthly-revenue"),
            ReportKind::YearlyMonthlyRevenue => write!(f, "yearly-monthly-revenue"),
        }
    }
}

/// First day inside the frequent-customer window
pub fn window_start(as_of: NaiveDate, window_days: u64) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    #[serde(skip)]
    pub product_key: ProductKey,
    pub product_id: String,
    pub product_name: String,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequentCustomer {
    #[serde(skip)]
    pub customer_key: CustomerKey,
    pub customer_id: String,
    pub name: String,
    pub purchase_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCategoryRevenue {
    /// First day of the month
    pub month: NaiveDate,
    pub category: String,
    /// `None` when no row in the bucket had a price
    pub revenue: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearMonthCategoryRevenue {
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub revenue: Option<Decimal>,
}

/// SUM over nullable values: NULLs are skipped, all-NULL stays NULL
fn add_revenue(total: &mut Option<Decimal>, value: Option<Decimal>) {
    if let Some(value) = value {
        *total = Some(total.unwrap_or(Decimal::ZERO) + value);
    }
}

/// Reports over one snapshot
pub struct Reports<'a> {
    snapshot: &'a WarehouseSnapshot,
    config: &'a ReportConfig,
}

impl<'a> Reports<'a> {
    pub fn new(snapshot: &'a WarehouseSnapshot, config: &'a ReportConfig) -> Self {
        Self { snapshot, config }
    }

    /// Products by total quantity sold, largest first, at most
    /// `top_products_limit` rows. Ties go to the smaller `product_id`.
    pub fn top_products(&self) -> Vec<TopProduct> {
        let products = self.snapshot.products();
        let sales = self.snapshot.sales();

        let mut rows: Vec<TopProduct> = sales
            .by_product()
            .filter_map(|(product_key, keys)| {
                let product = products.get(product_key)?;
                let total_quantity = keys
                    .iter()
                    .filter_map(|key| sales.get(*key))
                    .map(|fact| fact.quantity)
                    .sum();
                Some(TopProduct {
                    product_key,
                    product_id: product.product_id.clone(),
                    product_name: product.product_name.clone(),
                    total_quantity,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        rows.truncate(self.config.top_products_limit);
        rows
    }

    /// Customers with more than `frequent_min_purchases` sales dated on or
    /// after `as_of - frequent_window_days`. Most purchases first, ties go
    /// to the smaller `customer_id`.
    pub fn frequent_customers(&self, as_of: NaiveDate) -> Vec<FrequentCustomer> {
        let since = window_start(as_of, self.config.frequent_window_days);

        let mut counts: HashMap<CustomerKey, u64> = HashMap::new();
        for (_, customer_key, _) in self.snapshot.sales().customers_since(since) {
            *counts.entry(customer_key).or_insert(0) += 1;
        }

        let customers = self.snapshot.customers();
        let mut rows: Vec<FrequentCustomer> = counts
            .into_iter()
            .filter(|(_, count)| *count > self.config.frequent_min_purchases)
            .filter_map(|(customer_key, purchase_count)| {
                let customer = customers.get(customer_key)?;
                Some(FrequentCustomer {
                    customer_key,
                    customer_id: customer.customer_id.clone(),
                    name: customer.name.clone(),
                    purchase_count,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.purchase_count
                .cmp(&a.purchase_count)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        rows
    }

    /// Revenue per (first day of month, category), ordered by month then
    /// category
    pub fn monthly_revenue_by_category(&self) -> Vec<MonthlyCategoryRevenue> {
        let products = self.snapshot.products();
        let mut buckets: BTreeMap<(NaiveDate, String), Option<Decimal>> = BTreeMap::new();

        for fact in self.snapshot.sales().by_date_product() {
            let Some(product) = products.get(fact.product_key) else {
                continue;
            };
            let month = fact
                .transaction_date
                .with_day(1)
                .unwrap_or(fact.transaction_date);
            let total = buckets
                .entry((month, product.category.clone()))
                .or_insert(None);
            add_revenue(total, fact.revenue());
        }

        buckets
            .into_iter()
            .map(|((month, category), revenue)| MonthlyCategoryRevenue {
                month,
                category,
                revenue,
            })
            .collect()
    }

    /// Revenue per (year, month, category), ordered by year, month, category
    pub fn year_month_revenue_by_category(&self) -> Vec<YearMonthCategoryRevenue> {
        let products = self.snapshot.products();
        let mut buckets: BTreeMap<(i32, u32, String), Option<Decimal>> = BTreeMap::new();

        for fact in self.snapshot.sales().by_date_product() {
            let Some(product) = products.get(fact.product_key) else {
                continue;
            };
            let date = fact.transaction_date;
            let total = buckets
                .entry((date.year(), date.month(), product.category.clone()))
                .or_insert(None);
            add_revenue(total, fact.revenue());
        }

        buckets
            .into_iter()
            .map(|((year, month, category), revenue)| YearMonthCategoryRevenue {
                year,
                month,
                category,
                revenue,
            })
            .collect()
    }

    /// Run one report into a generic result set
    pub fn run(&self, kind: ReportKind, as_of: NaiveDate) -> WarehouseResult<QueryResult> {
        let start = std::time::Instant::now();
        let mut result = match kind {
            ReportKind::TopProducts => QueryResult::from_rows(kind.columns(), &self.top_products()),
            ReportKind::FrequentCustomers => {
                QueryResult::from_rows(kind.columns(), &self.frequent_customers(as_of))
            }
            ReportKind::MonthlyRevenue => {
                QueryResult::from_rows(kind.columns(), &self.monthly_revenue_by_category())
            }
            ReportKind::YearlyMonthlyRevenue => {
                QueryResult::from_rows(kind.columns(), &self.year_month_revenue_by_category())
            }
        }?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Report {} returned {} rows (snapshot version {})",
            kind,
            result.row_count(),
            self.snapshot.version()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictPolicy, RawCustomer, RawProduct, RawSale};
    use crate::staging::StagingArea;
    use crate::warehouse::Warehouse;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loaded(staging: &StagingArea) -> Arc<WarehouseSnapshot> {
        let warehouse = Warehouse::initialized().unwrap();
        warehouse.load(staging, ConflictPolicy::default()).unwrap();
        warehouse.snapshot().unwrap()
    }

    #[test]
    fn test_report_kind_round_trips_through_text() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.to_string().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!(
            "top_products".parse::<ReportKind>().unwrap(),
            ReportKind::TopProducts
        );
        assert!("all".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(date(2024, 1, 1), 0), date(2024, 1, 1));
        assert_eq!(window_start(date(2024, 1, 1), 31), date(2023, 12, 1));
        assert_eq!(window_start(date(2024, 1, 1), u64::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_sql_inlines_parameters() {
        let config = ReportConfig {
            top_products_limit: 3,
            frequent_window_days: 720,
            frequent_min_purchases: 5,
        };
        let as_of = date(2024, 12, 31);
        assert!(ReportKind::TopProducts.sql(&config, as_of).ends_with("LIMIT 3"));

        let frequent = ReportKind::FrequentCustomers.sql(&config, as_of);
        assert!(frequent.contains("DATE '2023-01-11'"));
        assert!(frequent.contains("HAVING COUNT(*) > 5"));
    }

    #[test]
    fn test_empty_warehouse_reports_nothing() {
        let snapshot = loaded(&StagingArea::default());
        let config = ReportConfig::default();
        let reports = Reports::new(&snapshot, &config);

        assert!(reports.top_products().is_empty());
        assert!(reports.frequent_customers(date(2024, 1, 1)).is_empty());
        assert!(reports.monthly_revenue_by_category().is_empty());
        assert!(reports.year_month_revenue_by_category().is_empty());
        for kind in ReportKind::ALL {
            let result = reports.run(kind, date(2024, 1, 1)).unwrap();
            assert!(result.is_empty());
            assert_eq!(result.columns.len(), kind.columns().len());
        }
    }

    #[test]
    fn test_revenue_of_unpriced_bucket_is_null() {
        let staging = StagingArea::new(
            vec![
                RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("2.50").ok()),
                RawProduct::new("P2", "Mystery", "Tools", None),
                RawProduct::new("P3", "Ghost", "Unknown", None),
            ],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            vec![
                RawSale::new("T1", "P1", "C1", 2, date(2024, 3, 4)),
                RawSale::new("T2", "P2", "C1", 7, date(2024, 3, 9)),
                RawSale::new("T3", "P3", "C1", 1, date(2024, 3, 9)),
            ],
        );
        let snapshot = loaded(&staging);
        let config = ReportConfig::default();
        let monthly = Reports::new(&snapshot, &config).monthly_revenue_by_category();

        assert_eq!(
            monthly,
            vec![
                MonthlyCategoryRevenue {
                    month: date(2024, 3, 1),
                    category: "Tools".to_string(),
                    revenue: Decimal::from_str("5.00").ok(),
                },
                MonthlyCategoryRevenue {
                    month: date(2024, 3, 1),
                    category: "Unknown".to_string(),
                    revenue: None,
                },
            ]
        );
    }

    #[test]
    fn test_top_products_ties_and_limit() {
        let staging = StagingArea::new(
            vec![
                RawProduct::new("P2", "B", "Books", None),
                RawProduct::new("P1", "A", "Books", None),
                RawProduct::new("P3", "C", "Books", None),
            ],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            vec![
                RawSale::new("T1", "P2", "C1", 4, date(2024, 1, 1)),
                RawSale::new("T2", "P1", "C1", 4, date(2024, 1, 2)),
                RawSale::new("T3", "P3", "C1", 1, date(2024, 1, 3)),
            ],
        );
        let snapshot = loaded(&staging);
        let config = ReportConfig {
            top_products_limit: 2,
            ..Default::default()
        };
        let top = Reports::new(&snapshot, &config).top_products();

        let ids: Vec<&str> = top.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert_eq!(top[0].total_quantity, 4);
    }

    #[test]
    fn test_run_renders_decimal_and_date_columns() {
        let staging = StagingArea::new(
            vec![RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.99").ok())],
            vec![RawCustomer::new("C1", "Ann", None, None)],
            vec![RawSale::new("T1", "P1", "C1", 3, date(2024, 1, 5))],
        );
        let snapshot = loaded(&staging);
        let config = ReportConfig::default();
        let result = Reports::new(&snapshot, &config)
            .run(ReportKind::MonthlyRevenue, date(2024, 6, 1))
            .unwrap();

        assert_eq!(result.rows[0]["month"], "2024-01-01");
        assert_eq!(result.rows[0]["category"], "Tools");
        assert_eq!(result.rows[0]["revenue"], "29.97");
    }
}
