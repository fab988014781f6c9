use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, Sku, UserId};
use domain::{Item, Order, OrderEvent, OrderStatus, StockError, StockLevel};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{LedgerError, OrdersRepository, Result, SkuCounts, StocksStorage};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

fn column_u32(row: &PgRow, column: &str) -> Result<u32> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw)
        .map_err(|_| LedgerError::CorruptRecord(format!("{column} out of range: {raw}")))
}

fn decode_status(code: i16) -> Result<OrderStatus> {
    OrderStatus::from_code(code)
        .ok_or_else(|| LedgerError::CorruptRecord(format!("unknown order status code {code}")))
}

/// PostgreSQL-backed stock ledger.
///
/// Every mutation runs in its own transaction and takes `FOR UPDATE` row
/// locks before checking the counters, so concurrent writers to one SKU are
/// serialized by the database.
#[derive(Clone)]
pub struct PostgresStocksStorage {
    pool: PgPool,
}

impl PostgresStocksStorage {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_stock(conn: &mut PgConnection, sku: Sku) -> Result<Option<StockLevel>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT total_count, reserved FROM stocks WHERE sku = $1 FOR UPDATE")
                .bind(i64::from(sku.as_u32()))
                .fetch_optional(&mut *conn)
                .await?;

        match row {
            Some(row) => {
                let level = StockLevel::new(
                    column_u32(&row, "total_count")?,
                    column_u32(&row, "reserved")?,
                )
                .map_err(|e| LedgerError::CorruptRecord(format!("sku {sku}: {e}")))?;
                Ok(Some(level))
            }
            None => Ok(None),
        }
    }

    async fn write_stock(conn: &mut PgConnection, sku: Sku, level: StockLevel) -> Result<()> {
        sqlx::query("UPDATE stocks SET total_count = $2, reserved = $3 WHERE sku = $1")
            .bind(i64::from(sku.as_u32()))
            .bind(i64::from(level.total_count))
            .bind(i64::from(level.reserved))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Applies `op` to every SKU inside one transaction.
    ///
    /// `SkuCounts` iterates in ascending SKU order, which fixes the lock
    /// order across concurrent batches.
    async fn apply_batch<F>(&self, items: &SkuCounts, op: F) -> Result<()>
    where
        F: Fn(&StockLevel, u32) -> std::result::Result<StockLevel, StockError> + Send + Sync,
    {
        let mut tx = self.pool.begin().await?;

        for (&sku, &count) in items {
            let level = Self::lock_stock(&mut tx, sku)
                .await?
                .ok_or(LedgerError::SkuNotFound(sku))?;
            let next = op(&level, count).map_err(|e| LedgerError::from_stock(sku, e))?;
            Self::write_stock(&mut tx, sku, next).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StocksStorage for PostgresStocksStorage {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn reserve(&self, sku: Sku, count: u32) -> Result<()> {
        self.apply_batch(&SkuCounts::from([(sku, count)]), StockLevel::reserve)
            .await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn release_on_cancel(&self, items: &SkuCounts) -> Result<()> {
        self.apply_batch(items, StockLevel::release).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn consume_on_pay(&self, items: &SkuCounts) -> Result<()> {
        self.apply_batch(items, StockLevel::consume).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn rollback_reservation(&self, items: &SkuCounts) -> Result<()> {
        self.apply_batch(items, StockLevel::release).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn restore_consumed(&self, items: &SkuCounts) -> Result<()> {
        self.apply_batch(items, StockLevel::restore).await
    }

    async fn get_availability(&self, sku: Sku) -> Result<StockLevel> {
        let row: Option<PgRow> =
            sqlx::query("SELECT total_count, reserved FROM stocks WHERE sku = $1")
                .bind(i64::from(sku.as_u32()))
                .fetch_optional(&self.pool)
                .await?;

        let row = row.ok_or(LedgerError::SkuNotFound(sku))?;
        StockLevel::new(
            column_u32(&row, "total_count")?,
            column_u32(&row, "reserved")?,
        )
        .map_err(|e| LedgerError::CorruptRecord(format!("sku {sku}: {e}")))
    }

    async fn upsert_stock(&self, sku: Sku, total_count: u32) -> Result<StockLevel> {
        let mut tx = self.pool.begin().await?;

        let next = match Self::lock_stock(&mut tx, sku).await? {
            Some(current) => {
                let next = current
                    .with_total(total_count)
                    .map_err(|e| LedgerError::from_stock(sku, e))?;
                Self::write_stock(&mut tx, sku, next).await?;
                next
            }
            None => {
                sqlx::query("INSERT INTO stocks (sku, total_count, reserved) VALUES ($1, $2, 0)")
                    .bind(i64::from(sku.as_u32()))
                    .bind(i64::from(total_count))
                    .execute(&mut *tx)
                    .await?;
                StockLevel {
                    total_count,
                    reserved: 0,
                }
            }
        };

        tx.commit().await?;
        Ok(next)
    }

    async fn insert_stock_if_absent(&self, sku: Sku, level: StockLevel) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO stocks (sku, total_count, reserved)
            VALUES ($1, $2, $3)
            ON CONFLICT (sku) DO NOTHING
            "#,
        )
        .bind(i64::from(sku.as_u32()))
        .bind(i64::from(level.total_count))
        .bind(i64::from(level.reserved))
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() == 1)
    }
}

/// PostgreSQL-backed order ledger.
#[derive(Clone)]
pub struct PostgresOrdersRepository {
    pool: PgPool,
}

impl PostgresOrdersRepository {
    /// Creates a new PostgreSQL order ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn record_event(conn: &mut PgConnection, event: &OrderEvent) -> Result<()> {
        sqlx::query("INSERT INTO order_events (order_id, status, occurred_at) VALUES ($1, $2, $3)")
            .bind(event.order_id.as_i64())
            .bind(event.status.code())
            .bind(event.occurred_at)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let Json(items): Json<Vec<Item>> = row.try_get("items")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            status: decode_status(row.try_get("status")?)?,
            items,
        })
    }

    fn row_to_event(row: PgRow) -> Result<OrderEvent> {
        Ok(OrderEvent {
            order_id: OrderId::new(row.try_get("order_id")?),
            status: decode_status(row.try_get("status")?)?,
            occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
        })
    }
}

#[async_trait]
impl OrdersRepository for PostgresOrdersRepository {
    #[tracing::instrument(skip(self, items), level = "debug")]
    async fn create(&self, user_id: UserId, items: Vec<Item>) -> Result<OrderId> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, status, items) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id.as_i64())
        .bind(OrderStatus::New.code())
        .bind(Json(&items))
        .fetch_one(&mut *tx)
        .await?;

        let order_id = OrderId::new(id);
        Self::record_event(&mut tx, &OrderEvent::new(order_id, OrderStatus::New)).await?;

        tx.commit().await?;
        Ok(order_id)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id.as_i64())
            .bind(status.code())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(LedgerError::OrderNotFound(order_id));
        }

        Self::record_event(&mut tx, &OrderEvent::new(order_id, status)).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(order_id.as_i64())
        .bind(from.code())
        .bind(to.code())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: Option<i16> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(order_id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;

            return match actual {
                Some(code) => Err(LedgerError::StatusConflict {
                    order_id,
                    expected: from,
                    actual: decode_status(code)?,
                }),
                None => Err(LedgerError::OrderNotFound(order_id)),
            };
        }

        Self::record_event(&mut tx, &OrderEvent::new(order_id, to)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, order_id: OrderId) -> Result<Order> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, user_id, status, items FROM orders WHERE id = $1")
                .bind(order_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order)
            .unwrap_or(Err(LedgerError::OrderNotFound(order_id)))
    }

    async fn events(&self, order_id: OrderId) -> Result<Vec<OrderEvent>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(LedgerError::OrderNotFound(order_id));
        }

        let rows = sqlx::query(
            r#"
            SELECT order_id, status, occurred_at
            FROM order_events
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
