mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use stockledger_api::entities::inventory_item::{ItemType, UnitOfMeasure};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}

/// Seeds two items with one receipt each plus an outbound adjustment on
/// the first, leaving three ledger entries in total.
async fn seed_ledger(app: &TestApp) -> (uuid::Uuid, uuid::Uuid) {
    let first = app
        .seed_item("LEDGER-A", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let second = app
        .seed_item("LEDGER-B", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    app.seed_stock(first.id, dec!(100), dec!(5)).await;
    app.seed_stock(second.id, dec!(50), dec!(7)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/adjustments",
            Some(json!({
                "item_id": first.id,
                "kind": "remove",
                "quantity": "10",
                "reason": "spoilage"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    (first.id, second.id)
}

#[tokio::test]
async fn listing_spans_all_items() {
    let app = TestApp::new().await;
    seed_ledger(&app).await;

    let body = response_json(app.request(Method::GET, "/api/v1/transactions", None).await).await;
    assert_eq!(body["data"]["pagination"]["total"], 3);
}

#[tokio::test]
async fn listing_filters_by_item_direction_and_type() {
    let app = TestApp::new().await;
    let (first, second) = seed_ledger(&app).await;

    let body = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/transactions?item_id={}", second),
            None,
        )
        .await,
    )
    .await;
    let rows = body["data"]["data"].as_array().expect("transaction page");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["item_id"], second.to_string());

    let body = response_json(
        app.request(Method::GET, "/api/v1/transactions?direction=out", None)
            .await,
    )
    .await;
    let rows = body["data"]["data"].as_array().expect("transaction page");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["transaction_type"], "adjustment");
    assert_eq!(rows[0]["item_id"], first.to_string());

    let body = response_json(
        app.request(
            Method::GET,
            "/api/v1/transactions?transaction_type=purchase&direction=in",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(body["data"]["pagination"]["total"], 2);
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let app = TestApp::new().await;
    seed_ledger(&app).await;

    let body = response_json(
        app.request(Method::GET, "/api/v1/transactions?per_page=2&page=1", None)
            .await,
    )
    .await;
    let first_page = body["data"]["data"].as_array().expect("transaction page");
    assert_eq!(first_page.len(), 2);
    assert_eq!(
        first_page[0]["transaction_type"], "adjustment",
        "the out adjustment was recorded last and lists first"
    );
    assert_eq!(body["data"]["pagination"]["total_pages"], 2);

    let body = response_json(
        app.request(Method::GET, "/api/v1/transactions?per_page=2&page=2", None)
            .await,
    )
    .await;
    let second_page = body["data"]["data"].as_array().expect("transaction page");
    assert_eq!(second_page.len(), 1);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");

    let response = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "stockledger-api");
}
