//! Order record and related types.

mod events;
mod state;
mod value_objects;

pub use events::OrderEvent;
pub use state::OrderStatus;
pub use value_objects::{Item, Order, validate_items};

use thiserror::Error;

/// Errors raised when an order request is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// User ID must be strictly positive.
    #[error("Invalid user id: {user_id} (must be greater than 0)")]
    InvalidUser { user_id: i64 },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// SKU must be strictly positive.
    #[error("Invalid sku at item {index}: 0")]
    InvalidSku { index: usize },

    /// Invalid quantity.
    #[error("Invalid count for sku {sku}: {count} (must be greater than 0)")]
    InvalidCount { sku: u32, count: u32 },
}
