//! Stock availability endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::Sku;
use ledger::{OrdersRepository, StocksStorage};
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct StocksInfoResponse {
    pub sku: u32,
    pub count: u32,
}

/// GET /stocks/:sku: units of a SKU that can still be reserved.
#[tracing::instrument(skip(state))]
pub async fn info<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(sku): Path<String>,
) -> Result<Json<StocksInfoResponse>, ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    let sku = Sku::new(parse_id(&sku, "sku")?);
    let info = state.service.stocks_info(sku).await?;

    Ok(Json(StocksInfoResponse {
        sku: info.sku.as_u32(),
        count: info.available_count,
    }))
}
