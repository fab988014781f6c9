//! Read models returned by the orchestrator queries.

use common::{Sku, UserId};
use domain::{Item, Order, OrderStatus};
use serde::Serialize;

/// Snapshot of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderInfo {
    pub status: OrderStatus,
    pub user_id: UserId,
    pub items: Vec<Item>,
}

impl From<Order> for OrderInfo {
    fn from(order: Order) -> Self {
        Self {
            status: order.status,
            user_id: order.user_id,
            items: order.items,
        }
    }
}

/// Units of a SKU that can still be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StocksInfo {
    pub sku: Sku,
    pub available_count: u32,
}
