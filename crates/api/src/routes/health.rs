//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use ledger::{OrdersRepository, StocksStorage};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: reports liveness and the storage backend in use.
pub async fn check<O, S>(State(state): State<Arc<AppState<O, S>>>) -> Json<HealthResponse>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    Json(HealthResponse {
        status: "ok",
        storage: state.backend,
    })
}
