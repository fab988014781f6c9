//! Domain layer for the order management service.
//!
//! This crate provides the core domain model including:
//! - Order, Item and the OrderStatus lifecycle state machine
//! - OrderEvent audit records written on every status change
//! - StockLevel, the per-SKU total/reserved counter pair and its invariants

pub mod order;
pub mod stock;

pub use common::{OrderId, Sku, UserId};
pub use order::{Item, Order, OrderError, OrderEvent, OrderStatus, validate_items};
pub use stock::{StockError, StockLevel};
