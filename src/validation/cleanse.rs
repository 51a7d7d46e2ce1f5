//! Record-level cleansing of source extracts into staging rows.
//!
//! Rules per entity:
//!
//! | entity    | dropped                                              | nulled                          |
//! |-----------|------------------------------------------------------|---------------------------------|
//! | product   | blank `product_id` / `product_name`                  | non-numeric or negative `price` |
//! | customer  | blank `customer_id` / `name`                         | malformed `email`, blank `country` |
//! | sale      | blank keys or date, bad or non-positive `quantity`, unparseable date | -               |
//!
//! Product categories are mapped onto [`Category`]; anything unrecognised
//! becomes `Unknown`. Duplicate natural keys are left alone here: resolving
//! them is the load's job.

use serde::{Deserialize, Serialize};

use super::input::{
    ValidationError, optional_text, parse_price, parse_quantity, parse_transaction_date, require,
    validate_email,
};
use crate::models::{Category, RawCustomer, RawProduct, RawSale};
use crate::staging::StagingArea;
use crate::staging::ingest::{CustomerRecord, ProductRecord, SaleRecord, SourceBatch};

/// Issue counts for the product extract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIssues {
    pub raw_rows: usize,
    /// Rows whose category was not one of the canonical categories
    pub unknown_category: usize,
    /// Rows dropped for a blank id or name
    pub missing_critical: usize,
    /// Prices that were not numbers, set to NULL
    pub invalid_price: usize,
    /// Negative prices, set to NULL
    pub negative_price: usize,
    pub clean_rows: usize,
}

/// Issue counts for the customer extract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerIssues {
    pub raw_rows: usize,
    /// Rows dropped for a blank id or name
    pub missing_critical: usize,
    /// Malformed emails, set to NULL
    pub invalid_email: usize,
    pub clean_rows: usize,
}

/// Issue counts for the sales extract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleIssues {
    pub raw_rows: usize,
    /// Rows dropped for a blank transaction id, product id, customer id or date
    pub missing_critical: usize,
    /// Rows dropped for a quantity that is not an integer
    pub invalid_quantity: usize,
    /// Rows dropped for a quantity of zero or less
    pub non_positive_quantity: usize,
    /// Rows dropped for a date in no known layout
    pub invalid_date: usize,
    pub clean_rows: usize,
}

/// Outcome of cleansing one [`SourceBatch`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanseReport {
    pub products: ProductIssues,
    pub customers: CustomerIssues,
    pub sales: SaleIssues,
}

impl CleanseReport {
    /// Rows removed across all three extracts
    pub fn rows_dropped(&self) -> usize {
        (self.products.raw_rows - self.products.clean_rows)
            + (self.customers.raw_rows - self.customers.clean_rows)
            + (self.sales.raw_rows - self.sales.clean_rows)
    }
}

/// Cleanse all three extracts into a staging area
pub fn cleanse(batch: SourceBatch) -> (StagingArea, CleanseReport) {
    let (products, product_issues) = cleanse_products(batch.products);
    let (customers, customer_issues) = cleanse_customers(batch.customers);
    let (sales, sale_issues) = cleanse_sales(batch.sales);

    let report = CleanseReport {
        products: product_issues,
        customers: customer_issues,
        sales: sale_issues,
    };

    (StagingArea::new(products, customers, sales), report)
}

pub fn cleanse_products(records: Vec<ProductRecord>) -> (Vec<RawProduct>, ProductIssues) {
    let mut issues = ProductIssues {
        raw_rows: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let category = Category::normalize(&record.category);
        if category == Category::Unknown {
            issues.unknown_category += 1;
        }

        let (Ok(product_id), Ok(product_name)) = (
            require("product_id", &record.product_id),
            require("product_name", &record.product_name),
        ) else {
            issues.missing_critical += 1;
            continue;
        };

        let price = match parse_price(&record.price) {
            Ok(price) => price,
            Err(ValidationError::Negative { .. }) => {
                issues.negative_price += 1;
                None
            }
            Err(_) => {
                issues.invalid_price += 1;
                None
            }
        };

        rows.push(RawProduct::new(
            product_id,
            product_name,
            category.as_str(),
            price,
        ));
    }

    issues.clean_rows = rows.len();
    if issues.unknown_category > 0 {
        tracing::warn!(
            "[products] {} rows with unknown category; setting to 'Unknown'",
            issues.unknown_category
        );
    }
    if issues.missing_critical > 0 {
        tracing::warn!(
            "[products] {} rows with missing product_id/product_name dropped",
            issues.missing_critical
        );
    }
    if issues.invalid_price > 0 {
        tracing::warn!(
            "[products] {} rows with non-numeric price; price set to NULL",
            issues.invalid_price
        );
    }
    if issues.negative_price > 0 {
        tracing::warn!(
            "[products] {} rows with negative price; price set to NULL",
            issues.negative_price
        );
    }
    tracing::info!(
        "[products] {} raw rows, {} clean rows",
        issues.raw_rows,
        issues.clean_rows
    );

    (rows, issues)
}

pub fn cleanse_customers(records: Vec<CustomerRecord>) -> (Vec<RawCustomer>, CustomerIssues) {
    let mut issues = CustomerIssues {
        raw_rows: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let (Ok(customer_id), Ok(name)) = (
            require("customer_id", &record.customer_id),
            require("name", &record.name),
        ) else {
            issues.missing_critical += 1;
            continue;
        };

        let email = match validate_email(&record.email) {
            Ok(email) => Some(email),
            Err(ValidationError::Empty(_)) => None,
            Err(_) => {
                issues.invalid_email += 1;
                None
            }
        };

        rows.push(RawCustomer::new(
            customer_id,
            name,
            email,
            optional_text(&record.country),
        ));
    }

    issues.clean_rows = rows.len();
    if issues.missing_critical > 0 {
        tracing::warn!(
            "[customers] {} rows with missing customer_id/name dropped",
            issues.missing_critical
        );
    }
    if issues.invalid_email > 0 {
        tracing::warn!(
            "[customers] {} rows with invalid email format; email set to NULL",
            issues.invalid_email
        );
    }
    tracing::info!(
        "[customers] {} raw rows, {} clean rows",
        issues.raw_rows,
        issues.clean_rows
    );

    (rows, issues)
}

pub fn cleanse_sales(records: Vec<SaleRecord>) -> (Vec<RawSale>, SaleIssues) {
    let mut issues = SaleIssues {
        raw_rows: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let (Ok(transaction_id), Ok(product_id), Ok(customer_id), Ok(_)) = (
            require("transaction_id", &record.transaction_id),
            require("product_id", &record.product_id),
            require("customer_id", &record.customer_id),
            require("transaction_date", &record.transaction_date),
        ) else {
            issues.missing_critical += 1;
            continue;
        };

        let quantity = match parse_quantity(&record.quantity) {
            Ok(quantity) => quantity,
            Err(ValidationError::NonPositive { .. }) => {
                issues.non_positive_quantity += 1;
                continue;
            }
            Err(_) => {
                issues.invalid_quantity += 1;
                continue;
            }
        };

        let Ok(transaction_date) = parse_transaction_date(&record.transaction_date) else {
            issues.invalid_date += 1;
            continue;
        };

        rows.push(RawSale::new(
            transaction_id,
            product_id,
            customer_id,
            quantity,
            transaction_date,
        ));
    }

    issues.clean_rows = rows.len();
    if issues.missing_critical > 0 {
        tracing::warn!(
            "[sales] {} rows with missing critical fields dropped",
            issues.missing_critical
        );
    }
    if issues.invalid_quantity > 0 {
        tracing::warn!(
            "[sales] {} rows with non-integer quantity dropped",
            issues.invalid_quantity
        );
    }
    if issues.non_positive_quantity > 0 {
        tracing::warn!(
            "[sales] {} rows with non-positive quantity dropped",
            issues.non_positive_quantity
        );
    }
    if issues.invalid_date > 0 {
        tracing::warn!(
            "[sales] {} rows with invalid transaction_date dropped",
            issues.invalid_date
        );
    }
    tracing::info!(
        "[sales] {} raw rows, {} clean rows",
        issues.raw_rows,
        issues.clean_rows
    );

    (rows, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn product(id: &str, name: &str, category: &str, price: &str) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            product_name: name.to_string(),
            category: category.to_string(),
            price: price.to_string(),
        }
    }

    fn customer(id: &str, name: &str, email: &str, country: &str) -> CustomerRecord {
        CustomerRecord {
            customer_id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            country: country.to_string(),
        }
    }

    fn sale(id: &str, product_id: &str, customer_id: &str, qty: &str, date: &str) -> SaleRecord {
        SaleRecord {
            transaction_id: id.to_string(),
            product_id: product_id.to_string(),
            customer_id: customer_id.to_string(),
            quantity: qty.to_string(),
            transaction_date: date.to_string(),
        }
    }

    #[test]
    fn test_cleanse_products() {
        let (rows, issues) = cleanse_products(vec![
            product("P0001", "Wireless Mouse", " electronics ", "19.99"),
            product("P0002", "", "Books", "5.00"),
            product("P0003", "Yoga Mat", "SPORTS", "N/A"),
            product("P0004", "Table Lamp", "Garden", "-12.50"),
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].category, "Electronics");
        assert_eq!(rows[0].price, Some(Decimal::from_str("19.99").unwrap()));
        assert_eq!(rows[1].category, "Sports");
        assert_eq!(rows[1].price, None);
        assert_eq!(rows[2].category, "Unknown");
        assert_eq!(rows[2].price, None);

        assert_eq!(issues.raw_rows, 4);
        assert_eq!(issues.missing_critical, 1);
        assert_eq!(issues.invalid_price, 1);
        assert_eq!(issues.negative_price, 1);
        assert_eq!(issues.unknown_category, 1);
        assert_eq!(issues.clean_rows, 3);
    }

    #[test]
    fn test_cleanse_customers_keeps_duplicates() {
        let (rows, issues) = cleanse_customers(vec![
            customer("C0001", "Ann Lee", "ann@example.com", "Canada"),
            customer("C0001", "Ann B. Lee", "annexample.com", ""),
            customer("", "Nobody", "n@example.com", "France"),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].email, None);
        assert_eq!(rows[1].country, None);
        assert_eq!(issues.invalid_email, 1);
        assert_eq!(issues.missing_critical, 1);
    }

    #[test]
    fn test_cleanse_sales() {
        let (rows, issues) = cleanse_sales(vec![
            sale("T000001", "P0001", "C0001", "3", "2024/01/05"),
            sale("T000002", "", "C0001", "1", "2024-01-06"),
            sale("T000003", "P0001", "C0001", "0", "2024-01-06"),
            sale("T000004", "P0001", "C0001", "-2", "2024-01-06"),
            sale("T000005", "P0001", "C0001", "two", "2024-01-06"),
            sale("T000006", "P0001", "C0001", "2", "sometime"),
            sale("T000007", "P0002", "C0002", "2", "Feb 10 2024"),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].transaction_date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(
            rows[1].transaction_date,
            NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
        );
        assert_eq!(issues.missing_critical, 1);
        assert_eq!(issues.non_positive_quantity, 2);
        assert_eq!(issues.invalid_quantity, 1);
        assert_eq!(issues.invalid_date, 1);
        assert_eq!(issues.clean_rows, 2);
    }

    #[test]
    fn test_cleanse_report_rows_dropped() {
        let batch = SourceBatch {
            products: vec![product("P0001", "", "Books", "1")],
            customers: vec![customer("C0001", "Ann", "", "")],
            sales: vec![sale("T1", "P0001", "C0001", "0", "2024-01-01")],
        };

        let (area, report) = cleanse(batch);
        assert_eq!(report.rows_dropped(), 2);
        assert!(area.products.is_empty());
        assert_eq!(area.customers.len(), 1);
        assert!(area.sales.is_empty());
    }
}
