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

#[tokio::test]
async fn create_item_starts_with_zero_stock() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "sku": "FLOUR-T550",
                "name": "Wheat flour T550",
                "item_type": "raw_material",
                "unit": "kg",
                "reorder_point": "250"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let item = &body["data"];
    assert_eq!(item["sku"], "FLOUR-T550");
    assert_eq!(item["item_type"], "raw_material");
    assert_eq!(item["unit"], "kg");
    assert_eq!(dec_field(&item["quantity"]), Decimal::ZERO);
    assert_eq!(dec_field(&item["average_cost"]), Decimal::ZERO);
    assert_eq!(dec_field(&item["total_value"]), Decimal::ZERO);
    assert_eq!(item["low_stock"], true, "zero stock sits below the reorder point");
    assert_eq!(item["is_active"], true);
}

#[tokio::test]
async fn duplicate_sku_is_rejected_with_conflict() {
    let app = TestApp::new().await;
    app.seed_item("WIDGET-1", ItemType::FinishedGood, UnitOfMeasure::Piece, None)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "sku": "WIDGET-1",
                "name": "Widget again",
                "item_type": "finished_good",
                "unit": "piece"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .expect("error message present")
            .contains("WIDGET-1"),
        "conflict message should name the SKU: {body}"
    );
}

#[tokio::test]
async fn receipts_blend_into_weighted_average() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("STEEL-10", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;

    // 100 kg at 500, then 50 kg at 600.
    app.seed_stock(item.id, dec!(100), dec!(500)).await;
    app.seed_stock(item.id, dec!(50), dec!(600)).await;

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{}", item.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let snapshot = &body["data"];

    assert_eq!(dec_field(&snapshot["quantity"]), dec!(150));
    assert_eq!(
        dec_field(&snapshot["average_cost"]).round_dp(2),
        dec!(533.33),
        "80000 / 150 rounds to 533.33"
    );
    assert_eq!(
        dec_field(&snapshot["total_value"]).round_dp(2),
        dec!(80000.00)
    );
    assert_eq!(dec_field(&snapshot["last_cost"]), dec!(600));
}

#[tokio::test]
async fn issues_never_move_the_average() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("COPPER-8", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    app.seed_stock(item.id, dec!(100), dec!(500)).await;
    app.seed_stock(item.id, dec!(50), dec!(600)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/adjustments",
            Some(json!({
                "item_id": item.id,
                "kind": "remove",
                "quantity": "90",
                "reason": "damaged during handling"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let transaction = &body["data"]["transaction"];
    assert_eq!(transaction["direction"], "out");
    assert_eq!(
        dec_field(&transaction["avg_cost_before"]),
        dec_field(&transaction["avg_cost_after"]),
        "outbound movements are valued at the current average, never reprice it"
    );

    let snapshot = &body["data"]["item"];
    assert_eq!(dec_field(&snapshot["quantity"]), dec!(60));
    assert_eq!(
        dec_field(&snapshot["average_cost"]).round_dp(2),
        dec!(533.33)
    );
}

#[tokio::test]
async fn first_receipt_on_empty_item_sets_average_to_unit_cost() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("RESIN-2", ItemType::RawMaterial, UnitOfMeasure::L, None)
        .await;

    let snapshot = app.seed_stock(item.id, dec!(40), dec!(12.5)).await;

    assert_eq!(snapshot.quantity, dec!(40));
    assert_eq!(snapshot.average_cost, dec!(12.5));
    assert_eq!(snapshot.total_value, dec!(500));
}

#[tokio::test]
async fn item_transactions_are_listed_newest_first() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("WIRE-3", ItemType::RawMaterial, UnitOfMeasure::M, None)
        .await;
    app.seed_stock(item.id, dec!(10), dec!(5)).await;
    app.seed_stock(item.id, dec!(20), dec!(8)).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}/transactions", item.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let history = body["data"].as_array().expect("transaction list");

    assert_eq!(history.len(), 2);
    assert_eq!(dec_field(&history[0]["quantity"]), dec!(20), "newest first");
    assert_eq!(dec_field(&history[1]["quantity"]), dec!(10));
    assert_eq!(history[0]["transaction_type"], "purchase");
    assert_eq!(history[0]["reference_type"], "purchase");

    // Running balances chain across the two receipts.
    assert_eq!(dec_field(&history[1]["balance_before"]), Decimal::ZERO);
    assert_eq!(dec_field(&history[1]["balance_after"]), dec!(10));
    assert_eq!(dec_field(&history[0]["balance_before"]), dec!(10));
    assert_eq!(dec_field(&history[0]["balance_after"]), dec!(30));
}

#[tokio::test]
async fn transactions_for_unknown_item_return_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}/transactions", Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valuation_groups_totals_by_item_type() {
    let app = TestApp::new().await;
    let raw = app
        .seed_item("RAW-A", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    let finished = app
        .seed_item("FIN-B", ItemType::FinishedGood, UnitOfMeasure::Piece, None)
        .await;
    app.seed_stock(raw.id, dec!(10), dec!(100)).await;
    app.seed_stock(finished.id, dec!(5), dec!(200)).await;

    let response = app.request(Method::GET, "/api/v1/items/valuation", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let report = &body["data"];

    assert_eq!(dec_field(&report["grand_total"]), dec!(2000));

    let rows = report["rows"].as_array().expect("valuation rows");
    let raw_row = rows
        .iter()
        .find(|row| row["item_type"] == "raw_material")
        .expect("raw material row");
    assert_eq!(raw_row["item_count"], 1);
    assert_eq!(dec_field(&raw_row["total_quantity"]), dec!(10));
    assert_eq!(dec_field(&raw_row["total_value"]), dec!(1000));
}

#[tokio::test]
async fn low_stock_report_flags_items_at_or_below_reorder_point() {
    let app = TestApp::new().await;
    let short = app
        .seed_item(
            "SHORT-1",
            ItemType::RawMaterial,
            UnitOfMeasure::Kg,
            Some(dec!(50)),
        )
        .await;
    let healthy = app
        .seed_item(
            "HEALTHY-1",
            ItemType::RawMaterial,
            UnitOfMeasure::Kg,
            Some(dec!(50)),
        )
        .await;
    app.seed_stock(short.id, dec!(40), dec!(10)).await;
    app.seed_stock(healthy.id, dec!(100), dec!(10)).await;

    let response = app.request(Method::GET, "/api/v1/items/low-stock", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let flagged = body["data"].as_array().expect("low stock list");

    assert!(
        flagged.iter().any(|item| item["sku"] == "SHORT-1"),
        "item below its reorder point should be flagged: {body}"
    );
    assert!(
        flagged.iter().all(|item| item["sku"] != "HEALTHY-1"),
        "item above its reorder point must not be flagged"
    );
}

#[tokio::test]
async fn deactivated_items_are_hidden_from_default_listing() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("GHOST-1", ItemType::Consumable, UnitOfMeasure::Box, None)
        .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{}/deactivate", item.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["is_active"], false);

    let listing = response_json(app.request(Method::GET, "/api/v1/items", None).await).await;
    let rows = listing["data"]["data"].as_array().expect("item page");
    assert!(
        rows.iter().all(|row| row["sku"] != "GHOST-1"),
        "default listing hides inactive items"
    );

    let listing_all = response_json(
        app.request(Method::GET, "/api/v1/items?is_active=false", None)
            .await,
    )
    .await;
    let rows = listing_all["data"]["data"].as_array().expect("item page");
    assert!(rows.iter().any(|row| row["sku"] == "GHOST-1"));

    // Reactivation brings it back.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{}/activate", item.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["is_active"], true);
}

#[tokio::test]
async fn item_detail_combines_snapshot_history_and_bom_usage() {
    let app = TestApp::new().await;
    let material = app
        .seed_item("DETAIL-M", ItemType::RawMaterial, UnitOfMeasure::Kg, None)
        .await;
    app.seed_stock(material.id, dec!(30), dec!(4)).await;

    // Reference the material from a planned batch so bom_usages is populated.
    let response = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(json!({
                "planned_quantity": "10",
                "bom_lines": [
                    {"item_id": material.id, "quantity_per_unit": "2"}
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}/detail", material.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let detail = &body["data"];

    assert_eq!(detail["item"]["sku"], "DETAIL-M");
    assert_eq!(
        detail["transactions"].as_array().expect("history").len(),
        1
    );
    let usages = detail["bom_usages"].as_array().expect("bom usages");
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0]["batch_status"], "planned");
    assert_eq!(dec_field(&usages[0]["quantity_per_unit"]), dec!(2));
}
