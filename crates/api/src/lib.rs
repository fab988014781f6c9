//! HTTP API server for the order and stock reservation service.
//!
//! Provides REST endpoints for creating, paying and cancelling orders and
//! for reading stock availability, with structured logging (tracing) and
//! Prometheus metrics.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ledger::{OrdersRepository, StocksStorage};
use loms::LomsService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, S>(state: Arc<AppState<O, S>>, metrics_handle: PrometheusHandle) -> Router
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<O, S>))
        .route("/orders", post(routes::orders::create::<O, S>))
        .route("/orders/{id}", get(routes::orders::get::<O, S>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<O, S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<O, S>))
        .route("/orders/{id}/events", get(routes::orders::events::<O, S>))
        .route("/stocks/{sku}", get(routes::stocks::info::<O, S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wraps a pair of ledgers into application state.
pub fn create_default_state<O, S>(
    orders: O,
    stocks: S,
    backend: &'static str,
) -> Arc<AppState<O, S>>
where
    O: OrdersRepository,
    S: StocksStorage,
{
    Arc::new(AppState::new(LomsService::new(orders, stocks), backend))
}
