use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Sku, UserId};
use domain::{Item, Order, OrderEvent, OrderStatus, StockError, StockLevel};
use tokio::sync::RwLock;

use crate::{LedgerError, OrdersRepository, Result, SkuCounts, StocksStorage};

#[derive(Debug, Default)]
struct InMemoryStocksState {
    stocks: HashMap<Sku, StockLevel>,
    unavailable: bool,
    fail_on_release: bool,
    fail_on_rollback: bool,
    fail_on_restore: bool,
}

impl InMemoryStocksState {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("stock ledger offline".to_string()));
        }
        Ok(())
    }

    /// Computes every new level before writing any, so a failing SKU leaves
    /// the whole batch unapplied.
    fn apply_batch<F>(&mut self, items: &SkuCounts, op: F) -> Result<()>
    where
        F: Fn(&StockLevel, u32) -> std::result::Result<StockLevel, StockError>,
    {
        self.check_available()?;

        let mut updated = Vec::with_capacity(items.len());
        for (&sku, &count) in items {
            let level = self
                .stocks
                .get(&sku)
                .ok_or(LedgerError::SkuNotFound(sku))?;
            let next = op(level, count).map_err(|e| LedgerError::from_stock(sku, e))?;
            updated.push((sku, next));
        }

        self.stocks.extend(updated);
        Ok(())
    }
}

/// In-memory stock ledger.
///
/// Each operation runs under a single write guard, which makes every
/// read-check-write linearizable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStocksStorage {
    state: Arc<RwLock<InMemoryStocksState>>,
}

impl InMemoryStocksStorage {
    /// Creates an empty stock ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stock ledger holding the given levels.
    pub fn with_stocks(stocks: impl IntoIterator<Item = (Sku, StockLevel)>) -> Self {
        let state = InMemoryStocksState {
            stocks: stocks.into_iter().collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Makes every operation fail with a storage fault.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Configures `release_on_cancel` to fail.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.write().await.fail_on_release = fail;
    }

    /// Configures `rollback_reservation` to fail.
    pub async fn set_fail_on_rollback(&self, fail: bool) {
        self.state.write().await.fail_on_rollback = fail;
    }

    /// Configures `restore_consumed` to fail.
    pub async fn set_fail_on_restore(&self, fail: bool) {
        self.state.write().await.fail_on_restore = fail;
    }

    /// Returns the number of stocked SKUs.
    pub async fn sku_count(&self) -> usize {
        self.state.read().await.stocks.len()
    }
}

#[async_trait]
impl StocksStorage for InMemoryStocksStorage {
    async fn reserve(&self, sku: Sku, count: u32) -> Result<()> {
        let mut state = self.state.write().await;
        state.apply_batch(&SkuCounts::from([(sku, count)]), StockLevel::reserve)
    }

    async fn release_on_cancel(&self, items: &SkuCounts) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_release {
            return Err(LedgerError::Unavailable("release rejected".to_string()));
        }
        state.apply_batch(items, StockLevel::release)
    }

    async fn consume_on_pay(&self, items: &SkuCounts) -> Result<()> {
        let mut state = self.state.write().await;
        state.apply_batch(items, StockLevel::consume)
    }

    async fn rollback_reservation(&self, items: &SkuCounts) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_rollback {
            return Err(LedgerError::Unavailable("rollback rejected".to_string()));
        }
        state.apply_batch(items, StockLevel::release)
    }

    async fn restore_consumed(&self, items: &SkuCounts) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_restore {
            return Err(LedgerError::Unavailable("restore rejected".to_string()));
        }
        state.apply_batch(items, StockLevel::restore)
    }

    async fn get_availability(&self, sku: Sku) -> Result<StockLevel> {
        let state = self.state.read().await;
        state.check_available()?;
        state
            .stocks
            .get(&sku)
            .copied()
            .ok_or(LedgerError::SkuNotFound(sku))
    }

    async fn upsert_stock(&self, sku: Sku, total_count: u32) -> Result<StockLevel> {
        let mut state = self.state.write().await;
        state.check_available()?;
        let current = state.stocks.get(&sku).copied().unwrap_or_default();
        let next = current
            .with_total(total_count)
            .map_err(|e| LedgerError::from_stock(sku, e))?;
        state.stocks.insert(sku, next);
        Ok(next)
    }

    async fn insert_stock_if_absent(&self, sku: Sku, level: StockLevel) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.stocks.contains_key(&sku) {
            return Ok(false);
        }
        state.stocks.insert(sku, level);
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct InMemoryOrdersState {
    orders: HashMap<OrderId, Order>,
    events: HashMap<OrderId, Vec<OrderEvent>>,
    last_id: OrderId,
}

impl InMemoryOrdersState {
    fn order_mut(&mut self, order_id: OrderId) -> Result<&mut Order> {
        self.orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))
    }

    fn record(&mut self, order_id: OrderId, status: OrderStatus) {
        self.events
            .entry(order_id)
            .or_default()
            .push(OrderEvent::new(order_id, status));
    }
}

/// In-memory order ledger.
///
/// IDs are handed out from 1 upwards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrdersRepository {
    state: Arc<RwLock<InMemoryOrdersState>>,
}

impl InMemoryOrdersRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrdersRepository for InMemoryOrdersRepository {
    async fn create(&self, user_id: UserId, items: Vec<Item>) -> Result<OrderId> {
        let mut state = self.state.write().await;
        let order_id = state.last_id.next();
        state.last_id = order_id;
        state
            .orders
            .insert(order_id, Order::new(order_id, user_id, items));
        state.record(order_id, OrderStatus::New);
        Ok(order_id)
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.status = status;
        state.record(order_id, status);
        Ok(())
    }

    async fn transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state.order_mut(order_id)?;
        if order.status != from {
            return Err(LedgerError::StatusConflict {
                order_id,
                expected: from,
                actual: order.status,
            });
        }
        order.status = to;
        state.record(order_id, to);
        Ok(())
    }

    async fn get_by_id(&self, order_id: OrderId) -> Result<Order> {
        self.state
            .read()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(LedgerError::OrderNotFound(order_id))
    }

    async fn events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>> {
        let state = self.state.read().await;
        if !state.orders.contains_key(&order_id) {
            return Err(LedgerError::OrderNotFound(order_id));
        }
        Ok(state.events.get(&order_id).cloned().unwrap_or_default())
    }
}
