//! Handler tests for dashboard aggregates

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use domain_analytics::*;
use domain_orders::{OrderItem, OrderStatus};
use http_body_util::BodyExt;
use serde_json::Value;
use test_utils::TestDatabase;
use tower::ServiceExt;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn item(sku: &str, quantity: i32, unit_price_cents: i64) -> OrderItem {
    OrderItem {
        product_id: None,
        sku: sku.into(),
        title: sku.to_lowercase(),
        quantity,
        unit_price_cents,
    }
}

async fn seeded() -> Router {
    let repo = InMemoryAnalytics::new();
    let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2025, 1, d, h, 0, 0).unwrap();

    repo.record_order(OrderFact {
        placed_at: at(3, 9),
        status: OrderStatus::Paid,
        total_cents: 2500,
        items: vec![item("MUG", 1, 2500)],
    })
    .await;
    repo.record_order(OrderFact {
        placed_at: at(3, 23),
        status: OrderStatus::Delivered,
        total_cents: 3000,
        items: vec![item("TEE", 2, 1500)],
    })
    .await;
    repo.record_order(OrderFact {
        placed_at: at(5, 12),
        status: OrderStatus::Pending,
        total_cents: 9900,
        items: vec![item("TEE", 5, 1980)],
    })
    .await;
    repo.record_customer(at(4, 8)).await;
    repo.record_product(2, false).await;
    repo.record_product(0, true).await;
    repo.set_open_threads(3).await;

    handlers::router(AnalyticsService::new(repo))
}

#[tokio::test]
async fn test_inverted_range_is_bad_request() {
    let app = seeded().await;
    let response = app
        .oneshot(get("/summary?from=2025-01-10&to=2025-01-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_range_longer_than_a_year_is_bad_request() {
    let app = seeded().await;
    let response = app
        .oneshot(get("/sales?from=2024-01-01&to=2025-01-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_counts() {
    let app = seeded().await;
    let response = app
        .oneshot(get("/summary?from=2025-01-01&to=2025-01-07"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let summary: Value = json_body(response.into_body()).await;
    assert_eq!(summary["revenue_cents"], 5500);
    assert_eq!(summary["order_count"], 3);
    assert_eq!(summary["average_order_cents"], 2750);
    assert_eq!(summary["orders_by_status"]["pending"], 1);
    assert_eq!(summary["new_customers"], 1);
    assert_eq!(summary["open_threads"], 3);
    assert_eq!(summary["low_stock_products"], 1);
}

#[tokio::test]
async fn test_sales_are_zero_filled() {
    let app = seeded().await;
    let response = app
        .oneshot(get("/sales?from=2025-01-01&to=2025-01-07"))
        .await
        .unwrap();

    let points: Vec<SalesPoint> = json_body(response.into_body()).await;
    assert_eq!(points.len(), 7);
    assert_eq!(points[2].revenue_cents, 5500);
    assert_eq!(points[2].orders, 2);
    // the pending order on the 5th is not revenue
    assert_eq!(points[4].revenue_cents, 0);
    assert!(points.iter().enumerate().all(|(i, p)| i == 2 || p.orders == 0));
}

#[tokio::test]
async fn test_top_products_limit_validated() {
    let app = seeded().await;

    let response = app
        .clone()
        .oneshot(get("/top-products?from=2025-01-01&to=2025-01-07&limit=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/top-products?from=2025-01-01&to=2025-01-07&limit=1"))
        .await
        .unwrap();
    let top: Vec<TopProduct> = json_body(response.into_body()).await;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].sku, "TEE");
    assert_eq!(top[0].units, 2);
}

#[tokio::test]
async fn test_postgres_summary_on_empty_range() {
    let db = TestDatabase::new().await;
    let app = handlers::router(AnalyticsService::new(PgAnalyticsRepository::new(
        db.connection(),
    )));

    // far enough back that nothing else in the database falls inside it
    let response = app
        .clone()
        .oneshot(get("/summary?from=1990-01-01&to=1990-01-31"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = json_body(response.into_body()).await;
    assert_eq!(summary["revenue_cents"], 0);
    assert_eq!(summary["order_count"], 0);

    let response = app
        .oneshot(get("/sales?from=1990-01-01&to=1990-01-31"))
        .await
        .unwrap();
    let points: Vec<SalesPoint> = json_body(response.into_body()).await;
    assert_eq!(points.len(), 31);
}
