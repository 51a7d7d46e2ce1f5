//! Field-level validation for staging input.
//!
//! Source files arrive as text. These functions turn one text field into a
//! typed value or explain why they cannot. Record-level decisions (drop the
//! row, null the field) are made by [`super::cleanse`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::models::round_price;

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));

/// Date layouts seen in sales exports, tried in order.
pub const TRANSACTION_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d %Y", "%d %b %Y"];

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),

    /// Input is negative where only non-negative values make sense
    #[error("{field} cannot be negative: {value}")]
    Negative { field: &'static str, value: String },

    /// Input is zero or negative where only positive values make sense
    #[error("{field} must be positive: {value}")]
    NonPositive { field: &'static str, value: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Require a non-blank value, returning it trimmed.
///
/// # Examples
///
/// ```
/// use sales_warehouse::validation::input::require;
///
/// assert_eq!(require("product_id", "  P0001 ").unwrap(), "P0001");
/// assert!(require("product_id", "   ").is_err());
/// ```
pub fn require<'a>(field: &'static str, raw: &'a str) -> ValidationResult<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed)
}

/// Parse an optional blank-means-null text field.
pub fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a product price.
///
/// Blank is `Ok(None)`; non-numeric text (e.g. `N/A`) and negative
/// amounts are errors.
///
/// # Examples
///
/// ```
/// use sales_warehouse::validation::input::parse_price;
///
/// assert!(parse_price("19.99").unwrap().is_some());
/// assert!(parse_price("").unwrap().is_none());
/// assert!(parse_price("N/A").is_err());
/// assert!(parse_price("-5.00").is_err());
/// assert_eq!(parse_price("1.23456").unwrap().unwrap().to_string(), "1.2346");
/// ```
pub fn parse_price(raw: &str) -> ValidationResult<Option<Decimal>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let price = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ValidationError::InvalidFormat("price", trimmed.to_string()))?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::Negative {
            field: "price",
            value: trimmed.to_string(),
        });
    }

    Ok(Some(round_price(price)))
}

/// Parse a sale quantity. Integral decimals such as `3.0` are accepted.
///
/// # Examples
///
/// ```
/// use sales_warehouse::validation::input::parse_quantity;
///
/// assert_eq!(parse_quantity("3").unwrap(), 3);
/// assert_eq!(parse_quantity("4.0").unwrap(), 4);
/// assert!(parse_quantity("0").is_err());
/// assert!(parse_quantity("three").is_err());
/// ```
pub fn parse_quantity(raw: &str) -> ValidationResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("quantity"));
    }

    let quantity = match trimmed.parse::<i64>() {
        Ok(q) => q,
        Err(_) => {
            let decimal = Decimal::from_str(trimmed)
                .map_err(|_| ValidationError::InvalidFormat("quantity", trimmed.to_string()))?;
            if !decimal.fract().is_zero() {
                return Err(ValidationError::InvalidFormat(
                    "quantity",
                    trimmed.to_string(),
                ));
            }
            decimal
                .to_i64()
                .ok_or_else(|| ValidationError::InvalidFormat("quantity", trimmed.to_string()))?
        }
    };

    if quantity <= 0 {
        return Err(ValidationError::NonPositive {
            field: "quantity",
            value: trimmed.to_string(),
        });
    }

    Ok(quantity)
}

/// Parse a transaction date in any of [`TRANSACTION_DATE_FORMATS`].
///
/// A trailing time component after the date (`2024-01-05 13:45:00`) is ignored.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use sales_warehouse::validation::input::parse_transaction_date;
///
/// let expected = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// assert_eq!(parse_transaction_date("2024-03-07").unwrap(), expected);
/// assert_eq!(parse_transaction_date("2024/03/07").unwrap(), expected);
/// assert_eq!(parse_transaction_date("Mar 07 2024").unwrap(), expected);
/// assert!(parse_transaction_date("07.03.2024").is_err());
/// ```
pub fn parse_transaction_date(raw: &str) -> ValidationResult<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("transaction_date"));
    }

    for format in TRANSACTION_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    // ISO timestamps: keep the date part
    if let Some((date_part, _)) = trimmed.split_once(|c: char| c == ' ' || c == 'T')
        && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
    {
        return Ok(date);
    }

    Err(ValidationError::InvalidFormat(
        "transaction_date",
        trimmed.to_string(),
    ))
}

/// Validate an email address, returning it trimmed.
///
/// # Examples
///
/// ```
/// use sales_warehouse::validation::input::validate_email;
///
/// assert!(validate_email("ann@example.com").is_ok());
/// assert!(validate_email("annexample.com").is_err());
/// ```
pub fn validate_email(raw: &str) -> ValidationResult<String> {
    let trimmed = require("email", raw)?;
    if !RE_EMAIL.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email", trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}
