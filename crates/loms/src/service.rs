//! The reservation orchestrator.

use std::time::Instant;

use common::{OrderId, Sku, UserId};
use domain::{Item, Order, OrderEvent, OrderStatus, validate_items};
use ledger::{LedgerError, OrdersRepository, SkuCounts, StocksStorage};

use crate::error::{LomsError, Result};
use crate::responses::{OrderInfo, StocksInfo};

const STEP_ROLLBACK_RESERVATION: &str = "rollback_reservation";
const STEP_MARK_FAILED: &str = "mark_failed";
const STEP_RESTORE_CONSUMED: &str = "restore_consumed";
const STEP_REVERT_PAY: &str = "revert_pay";
const STEP_REVERT_CANCEL: &str = "revert_cancel";

/// Drives orders through their lifecycle and keeps stock holds in step.
///
/// The service holds no locks of its own. Stock counters rely on the
/// atomicity of [`StocksStorage`]; concurrent lifecycle changes of the same
/// order are serialized by claiming each status change with a
/// compare-and-set through [`OrdersRepository::transition`].
#[derive(Debug, Clone)]
pub struct LomsService<O, S>
where
    O: OrdersRepository,
    S: StocksStorage,
{
    orders: O,
    stocks: S,
}

impl<O, S> LomsService<O, S>
where
    O: OrdersRepository,
    S: StocksStorage,
{
    pub fn new(orders: O, stocks: S) -> Self {
        Self { orders, stocks }
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn stocks(&self) -> &S {
        &self.stocks
    }

    /// Creates an order and reserves stock for every item.
    ///
    /// Items are reserved one at a time in request order. On the first
    /// failure the units already held are rolled back, the order ends in
    /// `Failed` and the triggering error is returned. On success the order
    /// is left in `AwaitingPayment`.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn order_create(&self, user_id: UserId, items: Vec<Item>) -> Result<OrderId> {
        let started = Instant::now();
        let result = self.create_and_reserve(user_id, items).await;
        record_duration("order_create", started);
        result
    }

    /// Pays an order, turning its holds into permanent deductions.
    ///
    /// On failure the units consumed so far are restored and the order goes
    /// back to `AwaitingPayment`.
    #[tracing::instrument(skip(self))]
    pub async fn order_pay(&self, order_id: OrderId) -> Result<()> {
        let started = Instant::now();
        let result = self.pay(order_id).await;
        record_duration("order_pay", started);
        result
    }

    /// Cancels a non-terminal order and releases whatever it holds.
    #[tracing::instrument(skip(self))]
    pub async fn order_cancel(&self, order_id: OrderId) -> Result<()> {
        let started = Instant::now();
        let result = self.cancel(order_id).await;
        record_duration("order_cancel", started);
        result
    }

    #[tracing::instrument(skip(self))]
    pub async fn order_info(&self, order_id: OrderId) -> Result<OrderInfo> {
        Ok(self.load(order_id).await?.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn stocks_info(&self, sku: Sku) -> Result<StocksInfo> {
        let level = self
            .stocks
            .get_availability(sku)
            .await
            .map_err(|e| LomsError::ledger("get_availability", e))?;

        Ok(StocksInfo {
            sku,
            available_count: level.available(),
        })
    }

    /// Returns the status history of an order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn order_events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>> {
        self.orders
            .events(order_id)
            .await
            .map_err(|e| LomsError::ledger("events", e))
    }

    async fn create_and_reserve(&self, user_id: UserId, items: Vec<Item>) -> Result<OrderId> {
        validate_items(user_id, &items)?;

        let order_id = self
            .orders
            .create(user_id, items.clone())
            .await
            .map_err(|e| LomsError::ledger("create", e))?;

        let mut reserved = SkuCounts::new();
        for item in &items {
            if let Err(e) = self.stocks.reserve(item.sku, item.count).await {
                let cause = LomsError::ledger("reserve", e);
                tracing::warn!(%order_id, sku = %item.sku, error = %cause, "reservation failed");
                return Err(self.fail_create(order_id, &reserved, cause).await);
            }
            *reserved.entry(item.sku).or_insert(0) += item.count;
        }

        match self
            .orders
            .transition(order_id, OrderStatus::New, OrderStatus::AwaitingPayment)
            .await
        {
            Ok(()) => {
                metrics::counter!("loms_orders_created_total").increment(1);
                tracing::info!(%order_id, %user_id, "order awaiting payment");
                Ok(order_id)
            }
            Err(LedgerError::StatusConflict { actual, .. }) => {
                // Cancelled while reserving: the cancel released nothing, so
                // the holds taken here are ours to give back.
                tracing::warn!(%order_id, status = %actual, "order changed during reservation");
                let cause = LomsError::InvalidTransition {
                    order_id,
                    operation: "create",
                    status: actual,
                };
                if let Err(source) = self.compensate(STEP_ROLLBACK_RESERVATION, || {
                    self.stocks.rollback_reservation(&reserved)
                })
                .await
                {
                    return Err(compensation_failed(
                        order_id,
                        STEP_ROLLBACK_RESERVATION,
                        cause,
                        source,
                    ));
                }
                Err(cause)
            }
            Err(e) => {
                let cause = LomsError::ledger("transition", e);
                Err(self.fail_create(order_id, &reserved, cause).await)
            }
        }
    }

    /// Undoes a partial reservation and marks the order failed.
    async fn fail_create(
        &self,
        order_id: OrderId,
        reserved: &SkuCounts,
        cause: LomsError,
    ) -> LomsError {
        metrics::counter!("loms_orders_failed_total").increment(1);

        let rollback = if reserved.is_empty() {
            Ok(())
        } else {
            self.compensate(STEP_ROLLBACK_RESERVATION, || {
                self.stocks.rollback_reservation(reserved)
            })
            .await
        };

        match self
            .orders
            .transition(order_id, OrderStatus::New, OrderStatus::Failed)
            .await
        {
            Ok(()) => tracing::info!(%order_id, "order failed"),
            Err(LedgerError::StatusConflict { actual, .. }) => {
                tracing::warn!(%order_id, status = %actual, "order no longer new, not marking failed");
            }
            Err(e) => {
                tracing::error!(
                    %order_id,
                    step = STEP_MARK_FAILED,
                    error = %e,
                    "could not mark order failed"
                );
            }
        }

        match rollback {
            Ok(()) => cause,
            Err(source) => {
                compensation_failed(order_id, STEP_ROLLBACK_RESERVATION, cause, source)
            }
        }
    }

    async fn pay(&self, order_id: OrderId) -> Result<()> {
        let order = self.load(order_id).await?;
        if !order.status.can_pay() {
            return Err(LomsError::InvalidTransition {
                order_id,
                operation: "pay",
                status: order.status,
            });
        }
        self.claim(order_id, order.status, OrderStatus::Payed, "pay")
            .await?;

        let mut consumed = SkuCounts::new();
        for item in &order.items {
            let held = SkuCounts::from([(item.sku, item.count)]);
            if let Err(e) = self.stocks.consume_on_pay(&held).await {
                let cause = LomsError::ledger("consume_on_pay", e);
                tracing::warn!(%order_id, sku = %item.sku, error = %cause, "payment consume failed");
                return Err(self.abort_pay(order_id, &consumed, cause).await);
            }
            *consumed.entry(item.sku).or_insert(0) += item.count;
        }

        metrics::counter!("loms_orders_payed_total").increment(1);
        tracing::info!(%order_id, "order payed");
        Ok(())
    }

    /// Restores consumed units and hands the order back to `AwaitingPayment`.
    ///
    /// Both steps are attempted; the first compensation failure wins.
    async fn abort_pay(
        &self,
        order_id: OrderId,
        consumed: &SkuCounts,
        cause: LomsError,
    ) -> LomsError {
        let restore = if consumed.is_empty() {
            Ok(())
        } else {
            self.compensate(STEP_RESTORE_CONSUMED, || {
                self.stocks.restore_consumed(consumed)
            })
            .await
        };

        let revert = self
            .compensate(STEP_REVERT_PAY, || {
                self.orders
                    .transition(order_id, OrderStatus::Payed, OrderStatus::AwaitingPayment)
            })
            .await;

        match (restore, revert) {
            (Err(source), _) => {
                compensation_failed(order_id, STEP_RESTORE_CONSUMED, cause, source)
            }
            (Ok(()), Err(source)) => {
                compensation_failed(order_id, STEP_REVERT_PAY, cause, source)
            }
            (Ok(()), Ok(())) => cause,
        }
    }

    async fn cancel(&self, order_id: OrderId) -> Result<()> {
        let order = self.load(order_id).await?;
        if !order.status.can_cancel() {
            return Err(LomsError::InvalidTransition {
                order_id,
                operation: "cancel",
                status: order.status,
            });
        }
        let prior = order.status;
        self.claim(order_id, prior, OrderStatus::Cancelled, "cancel")
            .await?;

        // A `New` order is still being reserved; its create call rolls back
        // the holds once it sees the cancellation.
        if prior == OrderStatus::AwaitingPayment {
            let held = order.sku_counts();
            if let Err(e) = self.stocks.release_on_cancel(&held).await {
                let cause = LomsError::ledger("release_on_cancel", e);
                tracing::warn!(%order_id, error = %cause, "release failed");
                if let Err(source) = self
                    .compensate(STEP_REVERT_CANCEL, || {
                        self.orders
                            .transition(order_id, OrderStatus::Cancelled, prior)
                    })
                    .await
                {
                    return Err(compensation_failed(
                        order_id,
                        STEP_REVERT_CANCEL,
                        cause,
                        source,
                    ));
                }
                return Err(cause);
            }
        }

        metrics::counter!("loms_orders_cancelled_total").increment(1);
        tracing::info!(%order_id, %prior, "order cancelled");
        Ok(())
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_by_id(order_id)
            .await
            .map_err(|e| LomsError::ledger("get_by_id", e))
    }

    /// Claims a status change, reporting a lost race as an invalid transition.
    async fn claim(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        operation: &'static str,
    ) -> Result<()> {
        match self.orders.transition(order_id, from, to).await {
            Ok(()) => Ok(()),
            Err(LedgerError::StatusConflict { actual, .. }) => {
                Err(LomsError::InvalidTransition {
                    order_id,
                    operation,
                    status: actual,
                })
            }
            Err(e) => Err(LomsError::ledger("transition", e)),
        }
    }

    /// Runs one compensating step and records its outcome.
    async fn compensate<F, Fut>(&self, step: &'static str, run: F) -> ledger::Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ledger::Result<()>>,
    {
        match run().await {
            Ok(()) => {
                metrics::counter!("loms_compensations_total", "step" => step, "outcome" => "succeeded")
                    .increment(1);
                tracing::warn!(step, "compensation step completed");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("loms_compensations_total", "step" => step, "outcome" => "failed")
                    .increment(1);
                tracing::error!(step, error = %e, "compensation step failed");
                Err(e)
            }
        }
    }
}

fn compensation_failed(
    order_id: OrderId,
    step: &'static str,
    cause: LomsError,
    source: LedgerError,
) -> LomsError {
    LomsError::CompensationFailed {
        order_id,
        step,
        cause: Box::new(cause),
        source,
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    metrics::histogram!("loms_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
