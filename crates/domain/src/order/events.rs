//! Order audit events.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// Records that an order entered a status.
///
/// The order ledger appends one of these on creation and on every status
/// change, so an order's history can be read back in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Creates an event stamped with the current time.
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            occurred_at: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.status.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_follows_status() {
        let event = OrderEvent::new(OrderId::new(3), OrderStatus::AwaitingPayment);
        assert_eq!(event.event_type(), "awaiting_payment");
        assert_eq!(event.order_id, OrderId::new(3));
    }
}
