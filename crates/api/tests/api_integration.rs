//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::StockLevel;
use ledger::{InMemoryOrdersRepository, InMemoryStocksStorage, Sku, StocksStorage};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_stocks(levels: &[(u32, u32)]) -> (Router, InMemoryStocksStorage) {
    let stocks = InMemoryStocksStorage::with_stocks(
        levels
            .iter()
            .map(|&(sku, total)| (Sku::new(sku), StockLevel::new(total, 0).unwrap())),
    );
    let state =
        api::create_default_state(InMemoryOrdersRepository::new(), stocks.clone(), "memory");
    (api::create_app(state, get_metrics_handle()), stocks)
}

fn setup() -> Router {
    setup_with_stocks(&[(1076963, 10), (1148162, 5), (100, 10)]).0
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create_order(app: &Router, user: i64, items: Value) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/orders",
        Some(json!({ "user": user, "items": items })),
    )
    .await
}

async fn available(app: &Router, sku: u32) -> u64 {
    let (status, json) = send(app, "GET", &format!("/stocks/{sku}"), None).await;
    assert_eq!(status, StatusCode::OK);
    json["count"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup();

    let (status, json) = create_order(
        &app,
        42,
        json!([{ "sku": 1076963, "count": 3 }, { "sku": 1148162, "count": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["order_id"], 1);

    let (status, json) = send(&app, "GET", "/orders/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "AwaitingPayment");
    assert_eq!(json["user"], 42);
    assert_eq!(
        json["items"],
        json!([{ "sku": 1076963, "count": 3 }, { "sku": 1148162, "count": 1 }])
    );

    assert_eq!(available(&app, 1076963).await, 7);
    assert_eq!(available(&app, 1148162).await, 4);
}

#[tokio::test]
async fn test_insufficient_stock_conflicts_and_fails_order() {
    let app = setup();

    let (status, _) = create_order(&app, 1, json!([{ "sku": 100, "count": 7 }])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = create_order(&app, 2, json!([{ "sku": 100, "count": 5 }])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("available 3"));
    assert_eq!(available(&app, 100).await, 3);

    let (_, json) = send(&app, "GET", "/orders/2", None).await;
    assert_eq!(json["status"], "Failed");
}

#[tokio::test]
async fn test_invalid_requests_are_bad_requests() {
    let app = setup();

    for body in [
        json!({ "user": 0, "items": [{ "sku": 100, "count": 1 }] }),
        json!({ "user": -5, "items": [{ "sku": 100, "count": 1 }] }),
        json!({ "user": 1, "items": [] }),
        json!({ "user": 1, "items": [{ "sku": 0, "count": 1 }] }),
        json!({ "user": 1, "items": [{ "sku": 100, "count": 0 }] }),
    ] {
        let (status, json) = send(&app, "POST", "/orders", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert!(json["error"].is_string());
    }
    assert_eq!(available(&app, 100).await, 10);

    for raw in [
        r#"{"user": 1, "items": [{"sku": 100, "count": -1}]}"#,
        r#"{"user": 1}"#,
        r#"{"user": 1, "items": "#,
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(raw))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {raw}");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].is_string(), "body {raw}");
    }

    for uri in ["/orders/abc", "/orders/0", "/stocks/-1"] {
        let (status, _) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
    }
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/orders/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Order not found: 999");

    let (status, _) = send(&app, "POST", "/orders/999/pay", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/stocks/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = create_order(&app, 1, json!([{ "sku": 4242, "count": 1 }])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pay_flow() {
    let (app, stocks) = setup_with_stocks(&[(5, 10)]);

    let (status, _) = create_order(&app, 1, json!([{ "sku": 5, "count": 4 }])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, "POST", "/orders/1/pay", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));

    let (_, json) = send(&app, "GET", "/orders/1", None).await;
    assert_eq!(json["status"], "Payed");
    assert_eq!(
        stocks.get_availability(Sku::new(5)).await.unwrap(),
        StockLevel::new(6, 0).unwrap()
    );

    let (status, _) = send(&app, "POST", "/orders/1/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_flow() {
    let app = setup();

    create_order(&app, 1, json!([{ "sku": 1148162, "count": 5 }])).await;
    assert_eq!(available(&app, 1148162).await, 0);

    let (status, json) = send(&app, "POST", "/orders/1/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));
    assert_eq!(available(&app, 1148162).await, 5);

    let (status, _) = send(&app, "POST", "/orders/1/pay", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(&app, "GET", "/orders/1/events", None).await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["New", "AwaitingPayment", "Cancelled"]);
    assert_eq!(json[0]["order_id"], 1);
    assert!(json[0]["occurred_at"].is_string());
}

#[tokio::test]
async fn test_storage_outage_is_service_unavailable() {
    let (app, stocks) = setup_with_stocks(&[(1, 10)]);
    stocks.set_unavailable(true).await;

    let (status, json) = create_order(&app, 1, json!([{ "sku": 1, "count": 1 }])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("reserve"));

    let (status, _) = send(&app, "GET", "/stocks/1", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_compensation_failure_is_internal_error() {
    let (app, stocks) = setup_with_stocks(&[(1, 10), (2, 1)]);
    stocks.set_fail_on_rollback(true).await;

    let (status, json) = create_order(
        &app,
        1,
        json!([{ "sku": 1, "count": 2 }, { "sku": 2, "count": 2 }]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("rollback_reservation")
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    create_order(&app, 1, json!([{ "sku": 100, "count": 1 }])).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("loms_orders_created_total"));
    assert!(text.contains("loms_operation_duration_seconds"));
}
