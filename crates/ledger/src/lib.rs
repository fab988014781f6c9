//! Stock and order ledgers.
//!
//! The reservation orchestrator talks to storage only through the
//! [`StocksStorage`] and [`OrdersRepository`] traits defined here. Two
//! backends are provided: an in-memory one for tests and local runs, and a
//! PostgreSQL one built on `sqlx`.

pub mod error;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod seed;
pub mod stocks;

pub use common::{OrderId, Sku, UserId};
pub use error::{LedgerError, Result};
pub use memory::{InMemoryOrdersRepository, InMemoryStocksStorage};
pub use orders::OrdersRepository;
pub use postgres::{PostgresOrdersRepository, PostgresStocksStorage, run_migrations};
pub use seed::{StockSeed, apply_seed, load_seed};
pub use stocks::{SkuCounts, StocksStorage};
