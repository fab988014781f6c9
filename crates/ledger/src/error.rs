use common::{OrderId, Sku};
use domain::{OrderStatus, StockError};
use thiserror::Error;

/// Errors that can occur when interacting with the ledgers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Not enough unreserved units of the SKU.
    #[error("Insufficient stock for sku {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// A release asked for more units than are currently held.
    #[error("Insufficient reservation for sku {sku}: requested {requested}, reserved {reserved}")]
    InsufficientReservation {
        sku: Sku,
        requested: u32,
        reserved: u32,
    },

    /// A counter would exceed its range.
    #[error("Stock counter overflow for sku {0}")]
    Overflow(Sku),

    /// The SKU has never been stocked.
    #[error("Sku not found: {0}")]
    SkuNotFound(Sku),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A compare-and-set on the order status lost against another writer.
    #[error("Status conflict for order {order_id}: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A stored row holds a value the domain cannot represent.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The storage backend could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stock seed file could not be read.
    #[error("Seed file error: {0}")]
    Seed(#[from] std::io::Error),
}

impl LedgerError {
    /// Attaches the SKU to a counter invariant violation.
    pub fn from_stock(sku: Sku, err: StockError) -> Self {
        match err {
            StockError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                sku,
                requested,
                available,
            },
            StockError::InsufficientReservation {
                requested,
                reserved,
            } => LedgerError::InsufficientReservation {
                sku,
                requested,
                reserved,
            },
            StockError::Overflow => LedgerError::Overflow(sku),
        }
    }

    /// Returns true for failures of the storage itself rather than business
    /// outcomes; these are the only ones worth retrying.
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::CorruptRecord(_)
                | LedgerError::Unavailable(_)
                | LedgerError::Database(_)
                | LedgerError::Migration(_)
                | LedgerError::Serialization(_)
                | LedgerError::Seed(_)
        )
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_stock_keeps_quantities() {
        let err = LedgerError::from_stock(
            Sku::new(100),
            StockError::InsufficientStock {
                requested: 5,
                available: 3,
            },
        );
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                sku,
                requested: 5,
                available: 3
            } if sku == Sku::new(100)
        ));
        assert_eq!(
            err.to_string(),
            "Insufficient stock for sku 100: requested 5, available 3"
        );
    }

    #[test]
    fn business_outcomes_are_not_storage_faults() {
        assert!(!LedgerError::SkuNotFound(Sku::new(1)).is_storage_fault());
        assert!(!LedgerError::OrderNotFound(OrderId::new(1)).is_storage_fault());
        assert!(LedgerError::Unavailable("down".to_string()).is_storage_fault());
        assert!(LedgerError::Database(sqlx::Error::PoolTimedOut).is_storage_fault());
    }
}
