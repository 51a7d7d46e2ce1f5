//! Validation functionality
//!
//! Provides validation logic for:
//! - Field-level parsing and checks of source text (`input`)
//! - Record-level cleansing of source extracts into staging rows (`cleanse`)

pub mod cleanse;
pub mod input;

pub use cleanse::{CleanseReport, CustomerIssues, ProductIssues, SaleIssues, cleanse};
pub use input::{ValidationError, ValidationResult};
