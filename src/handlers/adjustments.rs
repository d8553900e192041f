use super::common::{
    created_response, default_actor, default_page, default_per_page, map_service_error,
    success_response, validate_input, PaginatedResponse,
};
use super::items::ItemResponse;
use super::transactions::TransactionResponse;
use crate::{
    entities::inventory_adjustment::{self, AdjustmentKind},
    errors::ApiError,
    handlers::AppState,
    services::adjustments::ApplyAdjustmentInput,
};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::get,
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
#[schema(example = json!({
    "item_id": "550e8400-e29b-41d4-a716-446655440000",
    "kind": "remove",
    "quantity": "3",
    "reason": "damaged during unloading",
    "created_by": "jana"
}))]
pub struct ApplyAdjustmentRequest {
    pub item_id: Uuid,

    /// add, remove or set
    #[schema(value_type = String, example = "remove")]
    pub kind: AdjustmentKind,

    /// Quantity to add or remove; the target quantity for set
    #[schema(value_type = String, example = "3")]
    pub quantity: Decimal,

    #[validate(length(min = 1, max = 512, message = "Reason must be 1-512 characters"))]
    #[schema(example = "damaged during unloading")]
    pub reason: String,

    /// Allow a removal to drive the quantity below zero
    #[serde(default)]
    pub allow_negative: bool,

    #[serde(default = "default_actor")]
    #[schema(example = "jana")]
    pub created_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustmentResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    #[schema(value_type = String, example = "remove")]
    pub adjustment_kind: AdjustmentKind,
    pub quantity: Decimal,
    /// Signed delta actually posted; zero when a set was a no-op
    pub applied_delta: Decimal,
    pub reason: String,
    pub allow_negative: bool,
    pub transaction_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<inventory_adjustment::Model> for AdjustmentResponse {
    fn from(model: inventory_adjustment::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            adjustment_kind: model.adjustment_kind,
            quantity: model.quantity,
            applied_delta: model.applied_delta,
            reason: model.reason,
            allow_negative: model.allow_negative,
            transaction_id: model.transaction_id,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustmentOutcomeResponse {
    pub adjustment: AdjustmentResponse,
    /// Item snapshot after the correction
    pub item: ItemResponse,
    pub transaction: Option<TransactionResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdjustmentListQuery {
    /// Restrict to one item
    pub item_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the adjustments router
pub fn adjustment_routes() -> Router<AppState> {
    Router::new().route("/", get(list_adjustments).post(apply_adjustment))
}

/// Apply a manual stock correction
#[utoipa::path(
    post,
    path = "/api/v1/adjustments",
    request_body = ApplyAdjustmentRequest,
    responses(
        (status = 201, description = "Adjustment applied", body = AdjustmentOutcomeResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse),
        (status = 422, description = "Would drive stock negative", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "adjustments"
)]
pub async fn apply_adjustment(
    State(state): State<AppState>,
    Json(payload): Json<ApplyAdjustmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let outcome = state
        .services
        .adjustments
        .apply_adjustment(ApplyAdjustmentInput {
            item_id: payload.item_id,
            kind: payload.kind,
            quantity: payload.quantity,
            reason: payload.reason,
            allow_negative: payload.allow_negative,
            created_by: payload.created_by,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(AdjustmentOutcomeResponse {
        adjustment: AdjustmentResponse::from(outcome.adjustment),
        item: ItemResponse::from(outcome.item),
        transaction: outcome.transaction.map(TransactionResponse::from),
    }))
}

/// Adjustment history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/adjustments",
    params(AdjustmentListQuery),
    responses(
        (status = 200, description = "Adjustment page returned"),
        (status = 404, description = "Unknown item filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "adjustments"
)]
pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(query): Query<AdjustmentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, u64::from(state.config.api_max_page_size));

    let (adjustments, total) = state
        .services
        .adjustments
        .list_adjustments(query.item_id, page, per_page)
        .await?;

    let data: Vec<AdjustmentResponse> =
        adjustments.into_iter().map(AdjustmentResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}
