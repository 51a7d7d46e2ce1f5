//! Enums shared across the pipeline
//!
//! Serde names use `kebab-case` so the values read naturally in
//! `.warehouse.toml` and on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the load resolves several staging rows sharing one natural key
/// but carrying different attribute values.
///
/// Identical duplicate rows always collapse to one dimension row; the
/// policy only matters for conflicting duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep the first row seen in staging order
    FirstSeen,
    /// Keep the last row seen in staging order
    LastSeen,
    /// Keep the row with the most populated attributes, first seen on ties
    #[default]
    MostComplete,
    /// Fail the whole load
    Reject,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "first-seen" | "first" => Ok(ConflictPolicy::FirstSeen),
            "last-seen" | "last" => Ok(ConflictPolicy::LastSeen),
            "most-complete" => Ok(ConflictPolicy::MostComplete),
            "reject" => Ok(ConflictPolicy::Reject),
            _ => Err(format!(
                "Unknown conflict policy: {}. Use 'first-seen', 'last-seen', 'most-complete' or 'reject'.",
                s
            )),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::FirstSeen => write!(f, "first-seen"),
            ConflictPolicy::LastSeen => write!(f, "last-seen"),
            ConflictPolicy::MostComplete => write!(f, "most-complete"),
            ConflictPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Canonical product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    Home,
    Sports,
    Unknown,
}

impl Category {
    /// Map free-form category text onto a canonical category.
    ///
    /// Matching ignores surrounding whitespace and case; anything that is
    /// not one of the five known categories becomes `Unknown`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "electronics" => Category::Electronics,
            "clothing" => Category::Clothing,
            "books" => Category::Books,
            "home" => Category::Home,
            "sports" => Category::Sports,
            _ => Category::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Books => "Books",
            Category::Home => "Home",
            Category::Sports => "Sports",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a staged sale did not make it into the fact table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    InvalidProductId,
    InvalidCustomerId,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidProductId => write!(f, "INVALID_PRODUCT_ID"),
            RejectReason::InvalidCustomerId => write!(f, "INVALID_CUSTOMER_ID"),
        }
    }
}

impl FromStr for RejectReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INVALID_PRODUCT_ID" => Ok(RejectReason::InvalidProductId),
            "INVALID_CUSTOMER_ID" => Ok(RejectReason::InvalidCustomerId),
            _ => Err(format!("Unknown reject reason: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_policy_from_str() {
        assert_eq!(
            "most-complete".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::MostComplete
        );
        assert_eq!(
            "FIRST_SEEN".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::FirstSeen
        );
        assert_eq!("last".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::LastSeen);
        assert_eq!("reject".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Reject);
        assert!("newest".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_conflict_policy_display_roundtrips() {
        for policy in [
            ConflictPolicy::FirstSeen,
            ConflictPolicy::LastSeen,
            ConflictPolicy::MostComplete,
            ConflictPolicy::Reject,
        ] {
            assert_eq!(policy.to_string().parse::<ConflictPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_category_normalize() {
        assert_eq!(Category::normalize("  ELECTRONICS "), Category::Electronics);
        assert_eq!(Category::normalize("clothing"), Category::Clothing);
        assert_eq!(Category::normalize("Home"), Category::Home);
        assert_eq!(Category::normalize("Garden"), Category::Unknown);
        assert_eq!(Category::normalize(""), Category::Unknown);
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::InvalidProductId.to_string(), "INVALID_PRODUCT_ID");
        assert_eq!(
            "invalid_customer_id".parse::<RejectReason>().unwrap(),
            RejectReason::InvalidCustomerId
        );
        assert!("MISSING_DATE".parse::<RejectReason>().is_err());
        assert_eq!(
            serde_json::to_string(&RejectReason::InvalidCustomerId).unwrap(),
            "\"INVALID_CUSTOMER_ID\""
        );
    }
}
