//! Warehouse rows: two dimensions and one fact table
//!
//! Surrogate keys are newtypes so a product key can never be joined
//! against the customer dimension by accident.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! surrogate_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_key!(
    /// Surrogate key of `product_dim`
    ProductKey
);
surrogate_key!(
    /// Surrogate key of `customer_dim`
    CustomerKey
);
surrogate_key!(
    /// Surrogate key of `sales_fact`
    SalesKey
);

/// Decimal places kept for prices, matching the `DECIMAL(18, 4)` columns
pub const PRICE_SCALE: u32 = 4;

/// Round a price to [`PRICE_SCALE`] places, halves away from zero
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDim {
    pub product_key: ProductKey,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDim {
    pub customer_key: CustomerKey,
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFact {
    pub sales_key: SalesKey,
    pub transaction_id: String,
    pub product_key: ProductKey,
    pub customer_key: CustomerKey,
    pub quantity: i64,
    /// Product dimension price at load time
    pub unit_price: Option<Decimal>,
    pub transaction_date: NaiveDate,
}

impl SalesFact {
    /// `quantity * unit_price`, or `None` when the price is unknown
    pub fn revenue(&self) -> Option<Decimal> {
        self.unit_price.map(|price| price * Decimal::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fact(unit_price: Option<Decimal>) -> SalesFact {
        SalesFact {
            sales_key: SalesKey(1),
            transaction_id: "T1".to_string(),
            product_key: ProductKey(1),
            customer_key: CustomerKey(1),
            quantity: 3,
            unit_price,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    #[test]
    fn test_revenue_is_exact() {
        let revenue = fact(Decimal::from_str("9.99").ok()).revenue().unwrap();
        assert_eq!(revenue, Decimal::from_str("29.97").unwrap());
    }

    #[test]
    fn test_revenue_without_price() {
        assert!(fact(None).revenue().is_none());
    }

    #[test]
    fn test_surrogate_key_serializes_transparently() {
        assert_eq!(serde_json::to_string(&ProductKey(7)).unwrap(), "7");
        assert_eq!(CustomerKey::from(3).get(), 3);
        assert_eq!(SalesKey(12).to_string(), "12");
    }
}
