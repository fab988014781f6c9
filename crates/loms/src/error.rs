//! Orchestrator error types.

use common::{OrderId, Sku};
use domain::{OrderError, OrderStatus};
use ledger::LedgerError;
use thiserror::Error;

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InsufficientStock,
    Conflict,
    CompensationFailure,
    StorageFault,
}

/// Errors that can occur during orchestrator operations.
#[derive(Debug, Error)]
pub enum LomsError {
    /// The request is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] OrderError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The SKU has no stock record.
    #[error("Sku not found: {0}")]
    SkuNotFound(Sku),

    /// Not enough unreserved units to satisfy an item.
    #[error("Insufficient stock for sku {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// The order's status does not allow the operation.
    #[error("Cannot {operation} order {order_id} in status {status}")]
    InvalidTransition {
        order_id: OrderId,
        operation: &'static str,
        status: OrderStatus,
    },

    /// A step failed and undoing the steps before it failed as well.
    ///
    /// Stock counters or order status may be left inconsistent and need
    /// manual repair.
    #[error("Compensation '{step}' failed for order {order_id} after: {cause}")]
    CompensationFailed {
        order_id: OrderId,
        step: &'static str,
        cause: Box<LomsError>,
        #[source]
        source: LedgerError,
    },

    /// Ledger error that is not a business outcome.
    #[error("Storage error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: LedgerError,
    },
}

impl LomsError {
    /// Wraps a ledger error raised by `operation`.
    ///
    /// Business outcomes keep their own variants; everything else is
    /// reported as a storage error tagged with the operation.
    pub fn ledger(operation: &'static str, err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                sku,
                requested,
                available,
            } => LomsError::InsufficientStock {
                sku,
                requested,
                available,
            },
            LedgerError::SkuNotFound(sku) => LomsError::SkuNotFound(sku),
            LedgerError::OrderNotFound(order_id) => LomsError::OrderNotFound(order_id),
            source => LomsError::Storage { operation, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LomsError::InvalidInput(_) => ErrorKind::InvalidInput,
            LomsError::OrderNotFound(_) | LomsError::SkuNotFound(_) => ErrorKind::NotFound,
            LomsError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            LomsError::InvalidTransition { .. } => ErrorKind::Conflict,
            LomsError::CompensationFailed { .. } => ErrorKind::CompensationFailure,
            LomsError::Storage { source, .. } if source.is_storage_fault() => {
                ErrorKind::StorageFault
            }
            LomsError::Storage { .. } => ErrorKind::Conflict,
        }
    }

    /// Only storage faults may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageFault
    }
}

/// Convenience type alias for orchestrator results.
pub type Result<T> = std::result::Result<T, LomsError>;
