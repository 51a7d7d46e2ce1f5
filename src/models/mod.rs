//! Models module
//!
//! Defines the row types of the two warehouse layers:
//! - Staging rows (`RawProduct`, `RawCustomer`, `RawSale`), loosely typed and unconstrained
//! - Warehouse rows (`ProductDim`, `CustomerDim`, `SalesFact`), keyed by surrogate keys

pub mod enums;
pub mod staging;
pub mod warehouse;

pub use enums::*;
pub use staging::{DimensionSource, RawCustomer, RawProduct, RawSale};
pub use warehouse::{
    CustomerDim, CustomerKey, PRICE_SCALE, ProductDim, ProductKey, SalesFact, SalesKey, round_price,
};
