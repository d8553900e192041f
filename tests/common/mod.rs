use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use stockledger_api::{
    config::AppConfig,
    db,
    entities::inventory_item::{self, ItemType, UnitOfMeasure},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        inventory::CreateItemInput,
        purchasing::{CreatePurchaseInput, CreatePurchaseLine, ReceiveLine},
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        // A single pooled connection keeps every query on the same
        // in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route("/health", get(stockledger_api::health_check))
            .route("/health/ready", get(stockledger_api::readiness_check))
            .nest("/api/v1", stockledger_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a fresh item through the service layer.
    #[allow(dead_code)]
    pub async fn seed_item(
        &self,
        sku: &str,
        item_type: ItemType,
        unit: UnitOfMeasure,
        reorder_point: Option<Decimal>,
    ) -> inventory_item::Model {
        self.state
            .services
            .inventory
            .create_item(CreateItemInput {
                sku: sku.to_string(),
                name: format!("Test item {}", sku),
                item_type,
                unit,
                reorder_point,
            })
            .await
            .expect("seed item")
    }

    /// Puts stock on an item by driving a single-line purchase through its
    /// full receive cycle. Returns the item snapshot after the receipt.
    #[allow(dead_code)]
    pub async fn seed_stock(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> inventory_item::Model {
        let purchasing = &self.state.services.purchasing;
        let created = purchasing
            .create_purchase(CreatePurchaseInput {
                supplier_id: Uuid::new_v4(),
                supplier_name: "Seed Supplier".to_string(),
                items: vec![CreatePurchaseLine {
                    item_id,
                    quantity,
                    unit_price: unit_cost,
                }],
                tax: Decimal::ZERO,
                shipping_cost: Decimal::ZERO,
                advance_applied: Decimal::ZERO,
                notes: None,
                created_by: "tests".to_string(),
            })
            .await
            .expect("seed purchase");

        purchasing
            .mark_ordered(created.purchase.id, "tests")
            .await
            .expect("seed purchase ordered");

        let outcome = purchasing
            .receive_purchase(
                created.purchase.id,
                &[ReceiveLine {
                    purchase_item_id: created.items[0].id,
                    quantity,
                    unit_cost: None,
                }],
                "tests",
            )
            .await
            .expect("seed purchase received");

        outcome
            .transactions
            .into_iter()
            .next()
            .expect("seed receipt transaction")
            .item
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
