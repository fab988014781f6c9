use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Item, Order, OrderEvent, OrderStatus};

use crate::Result;

/// The order ledger: order records, their status and status history.
///
/// The ledger does not judge whether a status change is a legal lifecycle
/// step; that is the orchestrator's job. It only guarantees that
/// [`transition`](Self::transition) is an atomic compare-and-set.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Persists a new order in `New` status and returns its ID.
    async fn create(&self, user_id: UserId, items: Vec<Item>) -> Result<OrderId>;

    /// Overwrites the status unconditionally.
    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;

    /// Moves the order from `from` to `to`.
    ///
    /// Fails with `StatusConflict` when the stored status is not `from`.
    async fn transition(&self, order_id: OrderId, from: OrderStatus, to: OrderStatus)
    -> Result<()>;

    /// Loads an order.
    async fn get_by_id(&self, order_id: OrderId) -> Result<Order>;

    /// Returns the order's status history, oldest first.
    async fn events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>>;
}
