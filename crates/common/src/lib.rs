//! Identifier types shared by every crate of the order management service.

pub mod types;

pub use types::{OrderId, Sku, UserId};
