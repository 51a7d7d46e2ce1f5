//! Staging rows
//!
//! The landing zone of the pipeline. Rows carry column typing only: no
//! uniqueness, no referential integrity. A sale references its product and
//! customer by natural key value and nothing checks that they exist.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// A staging row that feeds a dimension table
pub trait DimensionSource: Clone + Eq + Hash {
    /// Business key the dimension deduplicates on
    fn natural_key(&self) -> &str;

    /// Number of populated descriptive attributes
    fn completeness(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub price: Option<Decimal>,
}

impl RawProduct {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        category: impl Into<String>,
        price: Option<Decimal>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            category: category.into(),
            price,
        }
    }
}

impl DimensionSource for RawProduct {
    fn natural_key(&self) -> &str {
        &self.product_id
    }

    fn completeness(&self) -> usize {
        usize::from(!self.product_name.is_empty())
            + usize::from(!self.category.is_empty())
            + usize::from(self.price.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCustomer {
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    pub country: Option<String>,
}

impl RawCustomer {
    pub fn new(
        customer_id: impl Into<String>,
        name: impl Into<String>,
        email: Option<String>,
        country: Option<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            name: name.into(),
            email,
            country,
        }
    }
}

impl DimensionSource for RawCustomer {
    fn natural_key(&self) -> &str {
        &self.customer_id
    }

    fn completeness(&self) -> usize {
        usize::from(!self.name.is_empty())
            + usize::from(self.email.is_some())
            + usize::from(self.country.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSale {
    pub transaction_id: String,
    /// Product natural key, unenforced
    pub product_id: String,
    /// Customer natural key, unenforced
    pub customer_id: String,
    pub quantity: i64,
    pub transaction_date: NaiveDate,
}

impl RawSale {
    pub fn new(
        transaction_id: impl Into<String>,
        product_id: impl Into<String>,
        customer_id: impl Into<String>,
        quantity: i64,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            product_id: product_id.into(),
            customer_id: customer_id.into(),
            quantity,
            transaction_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_product_completeness() {
        let full = RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.99").ok());
        let no_price = RawProduct::new("P1", "Widget", "Tools", None);
        assert_eq!(full.completeness(), 3);
        assert_eq!(no_price.completeness(), 2);
        assert_eq!(full.natural_key(), "P1");
    }

    #[test]
    fn test_customer_completeness() {
        let customer = RawCustomer::new("C1", "Ann", Some("a@x.com".to_string()), None);
        assert_eq!(customer.completeness(), 2);
        assert_eq!(customer.natural_key(), "C1");
    }

    #[test]
    fn test_identical_products_are_equal() {
        let a = RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.99").ok());
        let b = RawProduct::new("P1", "Widget", "Tools", Decimal::from_str("9.990").ok());
        assert_eq!(a, b);
    }
}
