//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::Item;
use ledger::{OrdersRepository, StocksStorage};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user: i64,
    pub items: Vec<ItemPayload>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemPayload {
    pub sku: u32,
    pub count: u32,
}

impl From<ItemPayload> for Item {
    fn from(item: ItemPayload) -> Self {
        Item::new(item.sku, item.count)
    }
}

impl From<Item> for ItemPayload {
    fn from(item: Item) -> Self {
        Self {
            sku: item.sku.as_u32(),
            count: item.count,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: i64,
}

#[derive(Serialize)]
pub struct OrderInfoResponse {
    pub status: String,
    pub user: i64,
    pub items: Vec<ItemPayload>,
}

#[derive(Serialize)]
pub struct OrderEventResponse {
    pub order_id: i64,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
}

/// Empty JSON object returned by state-changing calls.
#[derive(Serialize)]
pub struct Empty {}

// -- Handlers --

/// POST /orders: create an order and reserve its items.
#[tracing::instrument(skip(state, payload))]
pub async fn create<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let items = req.items.into_iter().map(Item::from).collect();
    let order_id = state
        .service
        .order_create(UserId::new(req.user), items)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: order_id.as_i64(),
        }),
    ))
}

/// GET /orders/:id: order status, owner and items.
#[tracing::instrument(skip(state))]
pub async fn get<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderInfoResponse>, ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    let info = state.service.order_info(parse_order_id(&id)?).await?;

    Ok(Json(OrderInfoResponse {
        status: info.status.to_string(),
        user: info.user_id.as_i64(),
        items: info.items.into_iter().map(ItemPayload::from).collect(),
    }))
}

/// POST /orders/:id/pay: pay an order awaiting payment.
#[tracing::instrument(skip(state))]
pub async fn pay<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<String>,
) -> Result<Json<Empty>, ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    state.service.order_pay(parse_order_id(&id)?).await?;
    Ok(Json(Empty {}))
}

/// POST /orders/:id/cancel: cancel an order and release its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<String>,
) -> Result<Json<Empty>, ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    state.service.order_cancel(parse_order_id(&id)?).await?;
    Ok(Json(Empty {}))
}

/// GET /orders/:id/events: status history of an order, oldest first.
#[tracing::instrument(skip(state))]
pub async fn events<O, S>(
    State(state): State<Arc<AppState<O, S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderEventResponse>>, ApiError>
where
    O: OrdersRepository + 'static,
    S: StocksStorage + 'static,
{
    let events = state.service.order_events(parse_order_id(&id)?).await?;

    let responses = events
        .into_iter()
        .map(|e| OrderEventResponse {
            order_id: e.order_id.as_i64(),
            status: e.status.to_string(),
            occurred_at: e.occurred_at,
        })
        .collect();

    Ok(Json(responses))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    Ok(OrderId::new(parse_id(id, "order id")?))
}
