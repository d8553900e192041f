mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use stockledger_api::entities::inventory_item::{ItemType, UnitOfMeasure};
use uuid::Uuid;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}

fn dec_field(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal fields serialize as strings"))
        .expect("decimal field should parse")
}

/// Creates a single-line draft purchase and returns (purchase_id, purchase_item_id).
async fn draft_purchase(
    app: &TestApp,
    item_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
) -> (Uuid, Uuid) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_id": Uuid::new_v4(),
                "supplier_name": "Acme Mills",
                "items": [
                    {"item_id": item_id, "quantity": quantity.to_string(), "unit_price": unit_price.to_string()}
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let purchase_id = body["data"]["purchase"]["id"]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .expect("purchase id");
    let line_id = body["data"]["items"][0]["id"]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .expect("purchase line id");
    (purchase_id, line_id)
}

async fn order(app: &TestApp, purchase_id: Uuid) {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/order", purchase_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_purchase_computes_document_totals() {
    let app = TestApp::new().await;
    let flour = app
        .seed_item("PO-FLOUR", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let sugar = app
        .seed_item("PO-SUGAR", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_id": Uuid::new_v4(),
                "supplier_name": "Acme Mills",
                "items": [
                    {"item_id": flour.id, "quantity": "100", "unit_price": "4"},
                    {"item_id": sugar.id, "quantity": "50", "unit_price": "2"}
                ],
                "tax": "25",
                "shipping_cost": "10",
                "advance_applied": "35",
                "notes": "first order of the season"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let purchase = &body["data"]["purchase"];

    assert!(
        purchase["purchase_number"]
            .as_str()
            .expect("purchase number")
            .starts_with("PO-"),
        "numbers carry the PO prefix: {purchase}"
    );
    assert_eq!(purchase["status"], "draft");
    assert_eq!(dec_field(&purchase["subtotal"]), dec!(500));
    assert_eq!(dec_field(&purchase["total"]), dec!(500), "500 + 25 + 10 - 35");
    assert!(purchase["ordered_at"].is_null());
    assert!(purchase["received_at"].is_null());

    let lines = body["data"]["items"].as_array().expect("purchase lines");
    assert_eq!(lines.len(), 2);
    assert_eq!(dec_field(&lines[0]["remaining"]), dec!(100));
    assert_eq!(dec_field(&lines[0]["line_total"]), dec!(400));
}

#[tokio::test]
async fn create_purchase_with_unknown_item_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_id": Uuid::new_v4(),
                "supplier_name": "Acme Mills",
                "items": [
                    {"item_id": Uuid::new_v4(), "quantity": "10", "unit_price": "4"}
                ]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_receipt_then_remainder_moves_to_received() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("PART-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(50), dec!(10)).await;
    order(&app, purchase_id).await;

    // First delivery covers 30 of 50.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "30"}],
                "received_by": "gate"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["purchase"]["status"], "partial");
    assert!(body["data"]["purchase"]["received_at"].is_null());
    assert_eq!(dec_field(&body["data"]["items"][0]["quantity_received"]), dec!(30));
    assert_eq!(dec_field(&body["data"]["items"][0]["remaining"]), dec!(20));

    // Second delivery completes the document.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "20"}],
                "received_by": "gate"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["purchase"]["status"], "received");
    assert!(
        body["data"]["purchase"]["received_at"].is_string(),
        "full receipt stamps received_at"
    );

    // Stock arrived in two movements.
    let snapshot =
        response_json(app.request(Method::GET, &format!("/api/v1/items/{}", item.id), None).await)
            .await;
    assert_eq!(dec_field(&snapshot["data"]["quantity"]), dec!(50));
    assert_eq!(dec_field(&snapshot["data"]["average_cost"]), dec!(10));
}

#[tokio::test]
async fn over_receipt_is_rejected_and_retryable() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("OVER-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(50), dec!(10)).await;
    order(&app, purchase_id).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "30"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // 40 exceeds the 20 still outstanding.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "40"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing moved: the line still shows 30 received, stock is unchanged.
    let body = response_json(
        app.request(Method::GET, &format!("/api/v1/purchases/{}", purchase_id), None)
            .await,
    )
    .await;
    assert_eq!(body["data"]["purchase"]["status"], "partial");
    assert_eq!(dec_field(&body["data"]["items"][0]["quantity_received"]), dec!(30));

    let snapshot =
        response_json(app.request(Method::GET, &format!("/api/v1/items/{}", item.id), None).await)
            .await;
    assert_eq!(dec_field(&snapshot["data"]["quantity"]), dec!(30));

    // The exact remainder still goes through afterwards.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "20"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["purchase"]["status"], "received");
}

#[tokio::test]
async fn receiving_a_draft_purchase_is_rejected() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("DRAFT-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(10), dec!(5)).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "10"}]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn ordering_twice_is_rejected() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("TWICE-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, _) = draft_purchase(&app, item.id, dec!(10), dec!(5)).await;
    order(&app, purchase_id).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/order", purchase_id),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancellation_follows_the_state_machine() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("CANCEL-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;

    // Draft cancels cleanly.
    let (draft_id, _) = draft_purchase(&app, item.id, dec!(10), dec!(5)).await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/cancel", draft_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");

    // Cancelling again hits a terminal state.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/cancel", draft_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A partially received purchase cannot be cancelled either.
    let (partial_id, line_id) = draft_purchase(&app, item.id, dec!(50), dec!(5)).await;
    order(&app, partial_id).await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", partial_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "30"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/cancel", partial_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn preview_projects_the_ledger_without_committing() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("PREVIEW-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    app.seed_stock(item.id, dec!(100), dec!(500)).await;

    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(50), dec!(600)).await;
    order(&app, purchase_id).await;

    let payload = json!({
        "lines": [{"purchase_item_id": line_id, "quantity": "50"}]
    });
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/preview-receive", purchase_id),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = response_json(response).await;

    let line = &first["data"]["lines"][0];
    assert_eq!(dec_field(&line["remaining_before"]), dec!(50));
    assert_eq!(dec_field(&line["remaining_after"]), Decimal::ZERO);
    assert_eq!(dec_field(&line["projected_quantity"]), dec!(150));
    assert_eq!(
        dec_field(&line["projected_average_cost"]).round_dp(2),
        dec!(533.33)
    );

    // The projection wrote nothing.
    let snapshot =
        response_json(app.request(Method::GET, &format!("/api/v1/items/{}", item.id), None).await)
            .await;
    assert_eq!(dec_field(&snapshot["data"]["quantity"]), dec!(100));
    assert_eq!(dec_field(&snapshot["data"]["average_cost"]), dec!(500));

    let body = response_json(
        app.request(Method::GET, &format!("/api/v1/purchases/{}", purchase_id), None)
            .await,
    )
    .await;
    assert_eq!(body["data"]["purchase"]["status"], "ordered");

    // Previewing again yields the same projection.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/preview-receive", purchase_id),
            Some(payload),
        )
        .await;
    let second = response_json(response).await;
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn receipt_cost_override_replaces_the_ordered_price() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("OVERRIDE-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(10), dec!(10)).await;
    order(&app, purchase_id).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [{"purchase_item_id": line_id, "quantity": "10", "unit_cost": "12"}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    let transaction = &body["data"]["transactions"][0];
    assert_eq!(dec_field(&transaction["unit_cost"]), dec!(12));

    let snapshot =
        response_json(app.request(Method::GET, &format!("/api/v1/items/{}", item.id), None).await)
            .await;
    assert_eq!(dec_field(&snapshot["data"]["average_cost"]), dec!(12));
    assert_eq!(dec_field(&snapshot["data"]["last_cost"]), dec!(12));
}

#[tokio::test]
async fn duplicate_receive_lines_are_rejected() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("DUPLINE-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (purchase_id, line_id) = draft_purchase(&app, item.id, dec!(10), dec!(5)).await;
    order(&app, purchase_id).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({
                "lines": [
                    {"purchase_item_id": line_id, "quantity": "4"},
                    {"purchase_item_id": line_id, "quantity": "4"}
                ]
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchases_can_be_listed_by_status() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("LIST-1", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let (draft_id, _) = draft_purchase(&app, item.id, dec!(10), dec!(5)).await;
    let (ordered_id, _) = draft_purchase(&app, item.id, dec!(20), dec!(5)).await;
    order(&app, ordered_id).await;

    let body = response_json(
        app.request(Method::GET, "/api/v1/purchases?status=draft", None)
            .await,
    )
    .await;
    let rows = body["data"]["data"].as_array().expect("purchase page");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], draft_id.to_string());

    let body = response_json(app.request(Method::GET, "/api/v1/purchases", None).await).await;
    let rows = body["data"]["data"].as_array().expect("purchase page");
    assert_eq!(rows.len(), 2);
    assert_eq!(body["data"]["pagination"]["total"], 2);
}
