//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// New ──┬──► AwaitingPayment ──┬──► Payed
///       │                      └──► Cancelled
///       ├──► Failed
///       └──► Cancelled
/// ```
///
/// The discriminants are the persisted status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is persisted and its stock is being reserved.
    #[default]
    New = 0,

    /// All items are reserved, waiting for the customer to pay.
    AwaitingPayment = 1,

    /// Reservation failed and was rolled back (terminal state).
    Failed = 2,

    /// Payment accepted, held stock left the inventory (terminal state).
    Payed = 3,

    /// Order was cancelled and its holds released (terminal state).
    Cancelled = 4,
}

impl OrderStatus {
    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::AwaitingPayment)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Failed | OrderStatus::Payed | OrderStatus::Cancelled
        )
    }

    /// Returns true if `next` is a legal lifecycle step from this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (New, AwaitingPayment)
                | (New, Failed)
                | (New, Cancelled)
                | (AwaitingPayment, Payed)
                | (AwaitingPayment, Cancelled)
        )
    }

    /// Returns the persisted status code.
    pub fn code(&self) -> i16 {
        *self as i16
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::New),
            1 => Some(OrderStatus::AwaitingPayment),
            2 => Some(OrderStatus::Failed),
            3 => Some(OrderStatus::Payed),
            4 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::AwaitingPayment => "AwaitingPayment",
            OrderStatus::Failed => "Failed",
            OrderStatus::Payed => "Payed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Returns the audit event type recorded when an order enters this status.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Failed => "failed",
            OrderStatus::Payed => "payed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
