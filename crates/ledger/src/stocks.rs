use std::collections::BTreeMap;

use async_trait::async_trait;
use common::Sku;
use domain::StockLevel;

use crate::Result;

/// Quantities keyed by SKU.
///
/// Ordered so that backends which lock rows take locks in ascending SKU
/// order.
pub type SkuCounts = BTreeMap<Sku, u32>;

/// The stock ledger: per-SKU total and reserved counters.
///
/// Every mutation is a read-check-write on one or more SKUs and must run as
/// one indivisible unit: two concurrent reservations against the same SKU
/// never both observe the same availability. Batch operations apply all of
/// their SKUs or none of them. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait StocksStorage: Send + Sync {
    /// Holds `count` units of `sku`.
    ///
    /// Fails with `InsufficientStock` and changes nothing when fewer than
    /// `count` units are available.
    async fn reserve(&self, sku: Sku, count: u32) -> Result<()>;

    /// Returns the held units of a cancelled order to availability.
    async fn release_on_cancel(&self, items: &SkuCounts) -> Result<()>;

    /// Converts held units into a permanent deduction from inventory.
    ///
    /// Fails with `InsufficientStock` when a SKU holds fewer units than
    /// requested.
    async fn consume_on_pay(&self, items: &SkuCounts) -> Result<()>;

    /// Compensates a batch of successful [`reserve`](Self::reserve) calls.
    async fn rollback_reservation(&self, items: &SkuCounts) -> Result<()>;

    /// Compensates a successful [`consume_on_pay`](Self::consume_on_pay).
    async fn restore_consumed(&self, items: &SkuCounts) -> Result<()>;

    /// Reads the counters of a SKU.
    async fn get_availability(&self, sku: Sku) -> Result<StockLevel>;

    /// Creates a SKU or replaces its total, keeping existing holds.
    async fn upsert_stock(&self, sku: Sku, total_count: u32) -> Result<StockLevel>;

    /// Creates a SKU with the given counters unless it already exists.
    ///
    /// Returns `false` and leaves the stored counters untouched when the SKU
    /// is already present.
    async fn insert_stock_if_absent(&self, sku: Sku, level: StockLevel) -> Result<bool>;
}
