//! Warehouse schema
//!
//! The three warehouse tables, the foreign keys between them and the SQL
//! that creates, drops and loads them. Creation order is derived from the
//! foreign-key graph so a table is only created after every table it
//! references; drops run in the reverse order.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{WarehouseError, WarehouseResult};
use crate::models::ConflictPolicy;

/// A warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseTable {
    ProductDim,
    CustomerDim,
    SalesFact,
}

impl WarehouseTable {
    pub const ALL: [WarehouseTable; 3] = [
        WarehouseTable::ProductDim,
        WarehouseTable::CustomerDim,
        WarehouseTable::SalesFact,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WarehouseTable::ProductDim => "product_dim",
            WarehouseTable::CustomerDim => "customer_dim",
            WarehouseTable::SalesFact => "sales_fact",
        }
    }

    /// Tables this table holds foreign keys into
    pub fn references(&self) -> &'static [WarehouseTable] {
        match self {
            WarehouseTable::SalesFact => &[WarehouseTable::ProductDim, WarehouseTable::CustomerDim],
            _ => &[],
        }
    }

    /// Sequence backing the surrogate key
    pub fn key_sequence(&self) -> &'static str {
        match self {
            WarehouseTable::ProductDim => "product_key_seq",
            WarehouseTable::CustomerDim => "customer_key_seq",
            WarehouseTable::SalesFact => "sales_key_seq",
        }
    }

    pub fn create_sql(&self) -> &'static str {
        match self {
            WarehouseTable::ProductDim => warehouse_sql::CREATE_PRODUCT_DIM,
            WarehouseTable::CustomerDim => warehouse_sql::CREATE_CUSTOMER_DIM,
            WarehouseTable::SalesFact => warehouse_sql::CREATE_SALES_FACT,
        }
    }

    /// Secondary indexes as `(name, columns)`
    pub fn indexes(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            WarehouseTable::SalesFact => &[
                (
                    "idx_sales_date_customer",
                    "transaction_date, customer_key",
                ),
                ("idx_sales_date_product", "transaction_date, product_key"),
                ("idx_sales_product", "product_key"),
            ],
            _ => &[],
        }
    }

    /// Name of the unique natural key constraint, for dimensions
    pub fn natural_key_constraint(&self) -> Option<&'static str> {
        match self {
            WarehouseTable::ProductDim => Some("uq_product_dim_product_id"),
            WarehouseTable::CustomerDim => Some("uq_customer_dim_customer_id"),
            WarehouseTable::SalesFact => None,
        }
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Foreign-key dependency graph: an edge `a -> b` means `b` references `a`
pub fn dependency_graph() -> DiGraphMap<WarehouseTable, ()> {
    let mut graph = DiGraphMap::new();
    for table in WarehouseTable::ALL {
        graph.add_node(table);
    }
    for table in WarehouseTable::ALL {
        for referenced in table.references() {
            graph.add_edge(*referenced, table, ());
        }
    }
    graph
}

/// Tables in creation order: referenced tables first
pub fn creation_order() -> WarehouseResult<Vec<WarehouseTable>> {
    toposort(&dependency_graph(), None).map_err(|cycle| {
        WarehouseError::SchemaError(format!(
            "Foreign key cycle involving {}",
            cycle.node_id()
        ))
    })
}

/// Tables in drop order: referencing tables first
pub fn drop_order() -> WarehouseResult<Vec<WarehouseTable>> {
    let mut order = creation_order()?;
    order.reverse();
    Ok(order)
}

/// SQL text for the staging and warehouse schemas
pub struct WarehouseSchema;

impl WarehouseSchema {
    /// DDL for the staging tables, including `sales_rejected`
    pub fn create_staging_tables_sql() -> &'static str {
        staging_sql::CREATE_TABLES
    }

    /// Clear the staging tables before a fresh ingest
    pub fn truncate_staging_tables_sql() -> &'static str {
        staging_sql::TRUNCATE_TABLES
    }

    /// Drop every warehouse table, then its key sequence
    pub fn drop_warehouse_tables_sql() -> WarehouseResult<String> {
        let mut sql = String::new();
        for table in drop_order()? {
            sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", table.name()));
            sql.push_str(&format!(
                "DROP SEQUENCE IF EXISTS {};\n",
                table.key_sequence()
            ));
        }
        Ok(sql)
    }

    /// Create every warehouse table with its key sequence and indexes
    pub fn create_warehouse_tables_sql() -> WarehouseResult<String> {
        let mut sql = String::new();
        for table in creation_order()? {
            sql.push_str(&format!("CREATE SEQUENCE {} START 1;\n", table.key_sequence()));
            sql.push_str(table.create_sql());
            sql.push('\n');
            for (name, columns) in table.indexes() {
                sql.push_str(&format!(
                    "CREATE INDEX {} ON {} ({});\n",
                    name,
                    table.name(),
                    columns
                ));
            }
        }
        Ok(sql)
    }

    /// Full rebuild: drop then create
    pub fn rebuild_sql() -> WarehouseResult<String> {
        Ok(format!(
            "{}{}",
            Self::drop_warehouse_tables_sql()?,
            Self::create_warehouse_tables_sql()?
        ))
    }

    /// Statements that populate the warehouse from staging, in order
    pub fn load_statements(policy: ConflictPolicy) -> Vec<String> {
        vec![
            load_sql::insert_product_dim(policy),
            load_sql::insert_customer_dim(policy),
            load_sql::INSERT_SALES_FACT.to_string(),
        ]
    }
}

/// Staging table DDL
///
/// `row_num` records ingest order; the conflict policies are defined in
/// terms of it.
pub mod staging_sql {
    pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS raw_products (
    row_num BIGINT NOT NULL,
    product_id VARCHAR,
    product_name VARCHAR,
    category VARCHAR,
    price DECIMAL(18, 4)
);

CREATE TABLE IF NOT EXISTS raw_customers (
    row_num BIGINT NOT NULL,
    customer_id VARCHAR,
    name VARCHAR,
    email VARCHAR,
    country VARCHAR
);

CREATE TABLE IF NOT EXISTS raw_sales (
    row_num BIGINT NOT NULL,
    transaction_id VARCHAR,
    product_id VARCHAR,
    customer_id VARCHAR,
    quantity BIGINT,
    transaction_date DATE
);

CREATE TABLE IF NOT EXISTS sales_rejected (
    row_num BIGINT NOT NULL,
    transaction_id VARCHAR,
    product_id VARCHAR,
    customer_id VARCHAR,
    quantity BIGINT,
    transaction_date DATE,
    reject_reason VARCHAR NOT NULL
);
"#;

    pub const TRUNCATE_TABLES: &str = r#"
DELETE FROM raw_products;
DELETE FROM raw_customers;
DELETE FROM raw_sales;
DELETE FROM sales_rejected;
"#;

    pub const INSERT_PRODUCT: &str = r#"
INSERT INTO raw_products (row_num, product_id, product_name, category, price)
VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 4)))
"#;

    pub const INSERT_CUSTOMER: &str = r#"
INSERT INTO raw_customers (row_num, customer_id, name, email, country)
VALUES (?, ?, ?, ?, ?)
"#;

    pub const INSERT_SALE: &str = r#"
INSERT INTO raw_sales (row_num, transaction_id, product_id, customer_id, quantity, transaction_date)
VALUES (?, ?, ?, ?, ?, CAST(? AS DATE))
"#;
}

/// Warehouse table DDL
pub mod warehouse_sql {
    pub const CREATE_PRODUCT_DIM: &str = r#"CREATE TABLE product_dim (
    product_key BIGINT PRIMARY KEY DEFAULT nextval('product_key_seq'),
    product_id VARCHAR NOT NULL,
    product_name VARCHAR,
    category VARCHAR,
    price DECIMAL(18, 4),
    CONSTRAINT uq_product_dim_product_id UNIQUE (product_id)
);"#;

    pub const CREATE_CUSTOMER_DIM: &str = r#"CREATE TABLE customer_dim (
    customer_key BIGINT PRIMARY KEY DEFAULT nextval('customer_key_seq'),
    customer_id VARCHAR NOT NULL,
    name VARCHAR,
    email VARCHAR,
    country VARCHAR,
    CONSTRAINT uq_customer_dim_customer_id UNIQUE (customer_id)
);"#;

    pub const CREATE_SALES_FACT: &str = r#"CREATE TABLE sales_fact (
    sales_key BIGINT PRIMARY KEY DEFAULT nextval('sales_key_seq'),
    transaction_id VARCHAR,
    product_key BIGINT NOT NULL REFERENCES product_dim (product_key),
    customer_key BIGINT NOT NULL REFERENCES customer_dim (customer_key),
    quantity BIGINT NOT NULL,
    unit_price DECIMAL(18, 4),
    transaction_date DATE NOT NULL
);"#;
}

/// Load DML
pub mod load_sql {
    use crate::models::ConflictPolicy;

    /// Order in which candidate rows for one natural key are ranked
    fn ranking(policy: ConflictPolicy, completeness: &str) -> String {
        match policy {
            ConflictPolicy::FirstSeen | ConflictPolicy::Reject => "row_num".to_string(),
            ConflictPolicy::LastSeen => "row_num DESC".to_string(),
            ConflictPolicy::MostComplete => format!("{} DESC, row_num", completeness),
        }
    }

    pub fn insert_product_dim(policy: ConflictPolicy) -> String {
        let completeness = "(CASE WHEN product_name <> '' THEN 1 ELSE 0 END \
             + CASE WHEN category <> '' THEN 1 ELSE 0 END \
             + CASE WHEN price IS NOT NULL THEN 1 ELSE 0 END)";
        format!(
            r#"INSERT INTO product_dim (product_id, product_name, category, price)
SELECT product_id, product_name, category, price
FROM (
    SELECT DISTINCT ON (product_id) product_id, product_name, category, price,
        MIN(row_num) OVER (PARTITION BY product_id) AS first_row
    FROM raw_products
    ORDER BY product_id, {}
) AS chosen
ORDER BY first_row"#,
            ranking(policy, completeness)
        )
    }

    pub fn insert_customer_dim(policy: ConflictPolicy) -> String {
        let completeness = "(CASE WHEN name <> '' THEN 1 ELSE 0 END \
             + CASE WHEN email IS NOT NULL THEN 1 ELSE 0 END \
             + CASE WHEN country IS NOT NULL THEN 1 ELSE 0 END)";
        format!(
            r#"INSERT INTO customer_dim (customer_id, name, email, country)
SELECT customer_id, name, email, country
FROM (
    SELECT DISTINCT ON (customer_id) customer_id, name, email, country,
        MIN(row_num) OVER (PARTITION BY customer_id) AS first_row
    FROM raw_customers
    ORDER BY customer_id, {}
) AS chosen
ORDER BY first_row"#,
            ranking(policy, completeness)
        )
    }

    /// Inner join to both dimensions: unmatched sales are dropped
    pub const INSERT_SALES_FACT: &str = r#"INSERT INTO sales_fact (transaction_id, product_key, customer_key, quantity, unit_price, transaction_date)
SELECT s.transaction_id, p.product_key, c.customer_key, s.quantity, p.price, s.transaction_date
FROM raw_sales s
JOIN product_dim p ON s.product_id = p.product_id
JOIN customer_dim c ON s.customer_id = c.customer_id
ORDER BY s.row_num"#;

    /// Natural keys with more than one distinct attribute tuple
    pub const CONFLICTING_PRODUCTS: &str = r#"SELECT product_id
FROM (SELECT DISTINCT product_id, product_name, category, price FROM raw_products) AS d
GROUP BY product_id
HAVING COUNT(*) > 1
ORDER BY product_id"#;

    pub const CONFLICTING_CUSTOMERS: &str = r#"SELECT customer_id
FROM (SELECT DISTINCT customer_id, name, email, country FROM raw_customers) AS d
GROUP BY customer_id
HAVING COUNT(*) > 1
ORDER BY customer_id"#;

    /// Sales the fact insert dropped, each with a `;`-terminated reason list
    pub const INSERT_SALES_REJECTED: &str = r#"INSERT INTO sales_rejected (row_num, transaction_id, product_id, customer_id, quantity, transaction_date, reject_reason)
SELECT s.row_num, s.transaction_id, s.product_id, s.customer_id, s.quantity, s.transaction_date,
    concat(
        CASE WHEN p.product_key IS NULL THEN 'INVALID_PRODUCT_ID;' END,
        CASE WHEN c.customer_key IS NULL THEN 'INVALID_CUSTOMER_ID;' END
    )
FROM raw_sales s
LEFT JOIN product_dim p ON s.product_id = p.product_id
LEFT JOIN customer_dim c ON s.customer_id = c.customer_id
WHERE p.product_key IS NULL OR c.customer_key IS NULL
ORDER BY s.row_num"#;

    pub const SELECT_SALES_REJECTED: &str = r#"SELECT transaction_id, product_id, customer_id, reject_reason
FROM sales_rejected
ORDER BY row_num"#;

    pub const STAGED_ROW_COUNTS: &str = r#"SELECT
    (SELECT COUNT(*) FROM raw_products),
    (SELECT COUNT(DISTINCT product_id) FROM raw_products),
    (SELECT COUNT(*) FROM raw_customers),
    (SELECT COUNT(DISTINCT customer_id) FROM raw_customers)"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_created_before_fact() {
        let order = creation_order().unwrap();
        assert_eq!(order.len(), 3);
        let fact = order
            .iter()
            .position(|t| *t == WarehouseTable::SalesFact)
            .unwrap();
        for dim in [WarehouseTable::ProductDim, WarehouseTable::CustomerDim] {
            assert!(order.iter().position(|t| *t == dim).unwrap() < fact);
        }
    }

    #[test]
    fn test_fact_dropped_first() {
        let order = drop_order().unwrap();
        assert_eq!(order[0], WarehouseTable::SalesFact);
    }

    #[test]
    fn test_dependency_graph_edges() {
        let graph = dependency_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(WarehouseTable::ProductDim, WarehouseTable::SalesFact));
        assert!(graph.contains_edge(WarehouseTable::CustomerDim, WarehouseTable::SalesFact));
    }

    #[test]
    fn test_schema_sql_not_empty() {
        assert!(!WarehouseSchema::create_staging_tables_sql().is_empty());
        assert!(!WarehouseSchema::truncate_staging_tables_sql().is_empty());
        assert!(!WarehouseSchema::rebuild_sql().unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_sql_drops_before_creating() {
        let sql = WarehouseSchema::rebuild_sql().unwrap();
        let drop_fact = sql.find("DROP TABLE IF EXISTS sales_fact").unwrap();
        let drop_product = sql.find("DROP TABLE IF EXISTS product_dim").unwrap();
        let create_product = sql.find("CREATE TABLE product_dim").unwrap();
        let create_fact = sql.find("CREATE TABLE sales_fact").unwrap();

        assert!(drop_fact < drop_product);
        assert!(drop_product < create_product);
        assert!(create_product < create_fact);
        assert!(sql.contains("CREATE INDEX idx_sales_date_customer ON sales_fact"));
        assert!(sql.contains("CREATE INDEX idx_sales_product ON sales_fact (product_key)"));
    }

    #[test]
    fn test_load_statements_follow_policy() {
        let first = WarehouseSchema::load_statements(ConflictPolicy::FirstSeen);
        assert_eq!(first.len(), 3);
        assert!(first[0].contains("ORDER BY product_id, row_num"));

        let last = WarehouseSchema::load_statements(ConflictPolicy::LastSeen);
        assert!(last[1].contains("ORDER BY customer_id, row_num DESC"));

        let complete = WarehouseSchema::load_statements(ConflictPolicy::MostComplete);
        assert!(complete[0].contains("price IS NOT NULL"));
        assert!(complete[2].starts_with("INSERT INTO sales_fact"));
    }

    #[test]
    fn test_sales_rejected_is_staging() {
        let create = WarehouseSchema::create_staging_tables_sql();
        assert!(create.contains("CREATE TABLE IF NOT EXISTS sales_rejected"));
        assert!(create.contains("reject_reason VARCHAR NOT NULL"));
        assert!(WarehouseSchema::truncate_staging_tables_sql().contains("DELETE FROM sales_rejected"));
        assert!(load_sql::INSERT_SALES_REJECTED.contains("'INVALID_PRODUCT_ID;'"));
        assert!(load_sql::INSERT_SALES_REJECTED.contains("'INVALID_CUSTOMER_ID;'"));
    }

    #[test]
    fn test_price_columns_match_price_scale() {
        let scale = format!("DECIMAL(18, {})", crate::models::PRICE_SCALE);
        assert!(staging_sql::CREATE_TABLES.contains(&scale));
        assert!(staging_sql::INSERT_PRODUCT.contains(&scale));
        assert!(warehouse_sql::CREATE_PRODUCT_DIM.contains(&scale));
        assert!(warehouse_sql::CREATE_SALES_FACT.contains(&scale));
    }

    #[test]
    fn test_table_metadata() {
        assert_eq!(WarehouseTable::SalesFact.to_string(), "sales_fact");
        assert_eq!(WarehouseTable::ProductDim.indexes().len(), 0);
        assert_eq!(WarehouseTable::SalesFact.indexes().len(), 3);
        assert!(WarehouseTable::SalesFact.natural_key_constraint().is_none());
        assert_eq!(
            WarehouseTable::CustomerDim.natural_key_constraint(),
            Some("uq_customer_dim_customer_id")
        );
    }
}
