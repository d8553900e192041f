use super::common::{
    created_response, default_actor, default_page, default_per_page, map_service_error,
    success_response, validate_input, PaginatedResponse,
};
use super::transactions::TransactionResponse;
use crate::{
    entities::purchase::{self, PurchaseStatus},
    entities::purchase_item,
    errors::ApiError,
    handlers::AppState,
    services::purchasing::{
        CreatePurchaseInput, CreatePurchaseLine, ReceiveLine, ReceiveLinePreview, ReceivePreview,
    },
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PurchaseLineRequest {
    pub item_id: Uuid,
    /// Ordered quantity, must be positive
    #[schema(value_type = String, example = "100")]
    pub quantity: Decimal,
    /// Agreed unit price
    #[schema(value_type = String, example = "5.00")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "supplier_id": "7b0f1ddc-3cc5-4f8a-9c7e-2f4e7c25c101",
    "supplier_name": "Mill & Co",
    "items": [{"item_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": "100", "unit_price": "5.00"}],
    "tax": "40.00",
    "shipping_cost": "25.00"
}))]
pub struct CreatePurchaseRequest {
    pub supplier_id: Uuid,

    #[validate(length(min = 1, max = 128, message = "Supplier name must be 1-128 characters"))]
    pub supplier_name: String,

    #[validate(length(min = 1, message = "Purchase must have at least one line"))]
    #[validate]
    pub items: Vec<PurchaseLineRequest>,

    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub tax: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub shipping_cost: Decimal,

    /// Prepayment already made against this purchase
    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub advance_applied: Decimal,

    pub notes: Option<String>,

    #[serde(default = "default_actor")]
    #[schema(example = "jana")]
    pub created_by: String,
}

/// Body for plain status transitions (order, cancel)
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActorRequest {
    #[serde(default = "default_actor")]
    #[schema(example = "jana")]
    pub actor: String,
}

impl Default for ActorRequest {
    fn default() -> Self {
        Self {
            actor: default_actor(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveLineRequest {
    pub purchase_item_id: Uuid,
    /// Quantity received now, must not exceed the line's remainder
    #[schema(value_type = String, example = "30")]
    pub quantity: Decimal,
    /// Actual unit cost when the invoice differs from the ordered price
    #[schema(value_type = Option<String>, example = "5.20")]
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceivePurchaseRequest {
    pub lines: Vec<ReceiveLineRequest>,
    #[serde(default = "default_actor")]
    #[schema(example = "jana")]
    pub received_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub purchase_number: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    #[schema(value_type = String, example = "ordered")]
    pub status: PurchaseStatus,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub advance_applied: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_by: String,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<purchase::Model> for PurchaseResponse {
    fn from(model: purchase::Model) -> Self {
        Self {
            id: model.id,
            purchase_number: model.purchase_number,
            supplier_id: model.supplier_id,
            supplier_name: model.supplier_name,
            status: model.status,
            subtotal: model.subtotal,
            tax: model.tax,
            shipping_cost: model.shipping_cost,
            advance_applied: model.advance_applied,
            total: model.total,
            notes: model.notes,
            created_by: model.created_by,
            ordered_at: model.ordered_at,
            received_at: model.received_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseItemResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity_ordered: Decimal,
    pub quantity_received: Decimal,
    /// Still outstanding on this line
    pub remaining: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<purchase_item::Model> for PurchaseItemResponse {
    fn from(model: purchase_item::Model) -> Self {
        let remaining = model.remaining();
        Self {
            id: model.id,
            item_id: model.item_id,
            quantity_ordered: model.quantity_ordered,
            quantity_received: model.quantity_received,
            remaining,
            unit_price: model.unit_price,
            line_total: model.line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseDetailResponse {
    pub purchase: PurchaseResponse,
    pub items: Vec<PurchaseItemResponse>,
}

/// Projected ledger effect of one receive line, without committing
#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiveLinePreviewResponse {
    pub purchase_item_id: Uuid,
    pub item_id: Uuid,
    pub sku: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub remaining_before: Decimal,
    pub remaining_after: Decimal,
    pub projected_quantity: Decimal,
    pub projected_average_cost: Decimal,
    pub projected_total_value: Decimal,
}

impl From<ReceiveLinePreview> for ReceiveLinePreviewResponse {
    fn from(preview: ReceiveLinePreview) -> Self {
        Self {
            purchase_item_id: preview.purchase_item_id,
            item_id: preview.item_id,
            sku: preview.sku,
            quantity: preview.quantity,
            unit_cost: preview.unit_cost,
            remaining_before: preview.remaining_before,
            remaining_after: preview.remaining_after,
            projected_quantity: preview.projected_quantity,
            projected_average_cost: preview.projected_average_cost,
            projected_total_value: preview.projected_total_value,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceivePreviewResponse {
    pub purchase_id: Uuid,
    pub purchase_number: String,
    #[schema(value_type = String, example = "ordered")]
    pub status: PurchaseStatus,
    pub lines: Vec<ReceiveLinePreviewResponse>,
}

impl From<ReceivePreview> for ReceivePreviewResponse {
    fn from(preview: ReceivePreview) -> Self {
        Self {
            purchase_id: preview.purchase_id,
            purchase_number: preview.purchase_number,
            status: preview.status,
            lines: preview
                .lines
                .into_iter()
                .map(ReceiveLinePreviewResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiveOutcomeResponse {
    pub purchase: PurchaseResponse,
    pub items: Vec<PurchaseItemResponse>,
    /// Ledger entries this receipt produced
    pub transactions: Vec<TransactionResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurchaseListQuery {
    /// draft, ordered, partial, received or cancelled
    #[param(value_type = Option<String>)]
    pub status: Option<PurchaseStatus>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn receive_lines(lines: &[ReceiveLineRequest]) -> Vec<ReceiveLine> {
    lines
        .iter()
        .map(|line| ReceiveLine {
            purchase_item_id: line.purchase_item_id,
            quantity: line.quantity,
            unit_cost: line.unit_cost,
        })
        .collect()
}

/// Create the purchases router
pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:id", get(get_purchase))
        .route("/:id/order", post(mark_ordered))
        .route("/:id/preview-receive", post(preview_receive))
        .route("/:id/receive", post(receive_purchase))
        .route("/:id/cancel", post(cancel_purchase))
}

/// Create a draft purchase
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase created", body = PurchaseDetailResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item on a line", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .purchasing
        .create_purchase(CreatePurchaseInput {
            supplier_id: payload.supplier_id,
            supplier_name: payload.supplier_name,
            items: payload
                .items
                .into_iter()
                .map(|line| CreatePurchaseLine {
                    item_id: line.item_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            tax: payload.tax,
            shipping_cost: payload.shipping_cost,
            advance_applied: payload.advance_applied,
            notes: payload.notes,
            created_by: payload.created_by,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(PurchaseDetailResponse {
        purchase: PurchaseResponse::from(created.purchase),
        items: created
            .items
            .into_iter()
            .map(PurchaseItemResponse::from)
            .collect(),
    }))
}

/// List purchases, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    params(PurchaseListQuery),
    responses(
        (status = 200, description = "Purchase page returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<PurchaseListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, u64::from(state.config.api_max_page_size));

    let (purchases, total) = state
        .services
        .purchasing
        .list_purchases(query.status, page, per_page)
        .await?;

    let data: Vec<PurchaseResponse> =
        purchases.into_iter().map(PurchaseResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Get one purchase with its lines
#[utoipa::path(
    get,
    path = "/api/v1/purchases/:id",
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase returned", body = PurchaseDetailResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.purchasing.get_purchase(purchase_id).await?;

    Ok(success_response(PurchaseDetailResponse {
        purchase: PurchaseResponse::from(detail.purchase),
        items: detail
            .items
            .into_iter()
            .map(PurchaseItemResponse::from)
            .collect(),
    }))
}

/// Mark a draft purchase as ordered
#[utoipa::path(
    post,
    path = "/api/v1/purchases/:id/order",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Purchase ordered", body = PurchaseResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not in a transitionable state", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn mark_ordered(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let purchase = state
        .services
        .purchasing
        .mark_ordered(purchase_id, &payload.actor)
        .await?;
    Ok(success_response(PurchaseResponse::from(purchase)))
}

/// Project the ledger effect of a receipt without committing it
#[utoipa::path(
    post,
    path = "/api/v1/purchases/:id/preview-receive",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = ReceivePurchaseRequest,
    responses(
        (status = 200, description = "Preview returned", body = ReceivePreviewResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase not receivable", body = crate::errors::ErrorResponse),
        (status = 422, description = "Line exceeds remainder", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn preview_receive(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state
        .services
        .purchasing
        .preview_receive(purchase_id, &receive_lines(&payload.lines))
        .await?;
    Ok(success_response(ReceivePreviewResponse::from(preview)))
}

/// Receive goods against an ordered purchase
#[utoipa::path(
    post,
    path = "/api/v1/purchases/:id/receive",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = ReceivePurchaseRequest,
    responses(
        (status = 200, description = "Receipt committed", body = ReceiveOutcomeResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase not receivable", body = crate::errors::ErrorResponse),
        (status = 422, description = "Line exceeds remainder", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn receive_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .purchasing
        .receive_purchase(purchase_id, &receive_lines(&payload.lines), &payload.received_by)
        .await?;

    Ok(success_response(ReceiveOutcomeResponse {
        purchase: PurchaseResponse::from(outcome.purchase),
        items: outcome
            .items
            .into_iter()
            .map(PurchaseItemResponse::from)
            .collect(),
        transactions: outcome
            .transactions
            .into_iter()
            .map(|recorded| TransactionResponse::from(recorded.transaction))
            .collect(),
    }))
}

/// Cancel a draft or ordered purchase
#[utoipa::path(
    post,
    path = "/api/v1/purchases/:id/cancel",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Purchase cancelled", body = PurchaseResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not cancellable from current state", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchases"
)]
pub async fn cancel_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let purchase = state
        .services
        .purchasing
        .cancel_purchase(purchase_id, &payload.actor)
        .await?;
    Ok(success_response(PurchaseResponse::from(purchase)))
}
