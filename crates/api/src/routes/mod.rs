//! HTTP handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod stocks;

use ledger::{OrdersRepository, StocksStorage};
use loms::LomsService;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
#[derive(Debug)]
pub struct AppState<O: OrdersRepository, S: StocksStorage> {
    pub service: LomsService<O, S>,
    /// Name of the storage backend, reported by `/health`.
    pub backend: &'static str,
}

impl<O: OrdersRepository, S: StocksStorage> AppState<O, S> {
    pub fn new(service: LomsService<O, S>, backend: &'static str) -> Self {
        Self { service, backend }
    }
}

/// Parses a positive integer path segment.
fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    match raw.parse::<T>() {
        Ok(id) if id > T::default() => Ok(id),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid {what}: {raw} (must be a positive integer)"
        ))),
    }
}
