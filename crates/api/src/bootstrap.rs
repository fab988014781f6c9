//! Storage setup performed before the server starts accepting requests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ledger::{
    InMemoryOrdersRepository, InMemoryStocksStorage, LedgerError, PostgresOrdersRepository,
    PostgresStocksStorage, StocksStorage,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::Config;
use crate::routes::AppState;

/// How long a single connection attempt may take.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Could not connect to database: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Opens a connection pool, retrying with a fixed delay.
///
/// At least one attempt is made. Every failure is logged; the last one is
/// returned once the attempts run out.
pub async fn connect_with_retry(
    url: &str,
    attempts: u32,
    delay: Duration,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await;

        match result {
            Ok(pool) => {
                tracing::info!(attempt, "connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, attempts, error = %e, "database connection failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "database connection failed, giving up");
                return Err(e);
            }
        }
    }
}

/// Loads the seed file, if one is configured, into the stock ledger.
pub async fn seed_stocks<S>(storage: &S, path: Option<&Path>) -> Result<usize, LedgerError>
where
    S: StocksStorage,
{
    let Some(path) = path else {
        return Ok(0);
    };
    let seed = ledger::load_seed(path)?;
    ledger::apply_seed(storage, &seed).await
}

/// Builds application state over PostgreSQL ledgers.
///
/// Connects with retry, runs pending migrations and applies the stock seed.
pub async fn postgres_state(
    config: &Config,
    url: &str,
) -> Result<Arc<AppState<PostgresOrdersRepository, PostgresStocksStorage>>, StartupError> {
    let pool = connect_with_retry(
        url,
        config.db_connect_attempts,
        config.db_connect_delay,
        config.db_max_connections,
    )
    .await?;
    ledger::run_migrations(&pool).await?;

    let stocks = PostgresStocksStorage::new(pool.clone());
    seed_stocks(&stocks, config.stocks_seed_path.as_deref()).await?;

    Ok(crate::create_default_state(
        PostgresOrdersRepository::new(pool),
        stocks,
        "postgres",
    ))
}

/// Builds application state over in-memory ledgers.
pub async fn memory_state(
    config: &Config,
) -> Result<Arc<AppState<InMemoryOrdersRepository, InMemoryStocksStorage>>, StartupError> {
    let stocks = InMemoryStocksStorage::new();
    seed_stocks(&stocks, config.stocks_seed_path.as_deref()).await?;

    Ok(crate::create_default_state(
        InMemoryOrdersRepository::new(),
        stocks,
        "memory",
    ))
}
