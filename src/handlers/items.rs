use super::common::{
    created_response, default_page, default_per_page, map_service_error, success_response,
    validate_input, PaginatedResponse,
};
use super::transactions::TransactionResponse;
use crate::{
    entities::inventory_item::{self, ItemType, UnitOfMeasure},
    entities::production_batch::BatchStatus,
    errors::ApiError,
    handlers::AppState,
    services::inventory::{CreateItemInput, ItemFilter},
    services::ledger::BomUsage,
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
#[schema(example = json!({
    "sku": "FLOUR-T550",
    "name": "Wheat flour T550",
    "item_type": "raw_material",
    "unit": "kg",
    "reorder_point": "250"
}))]
pub struct CreateItemRequest {
    /// Stock keeping unit, unique across all items
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    #[schema(example = "FLOUR-T550")]
    pub sku: String,

    /// Display name
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    #[schema(example = "Wheat flour T550")]
    pub name: String,

    /// raw_material, finished_good, packaging or consumable
    #[schema(value_type = String, example = "raw_material")]
    pub item_type: ItemType,

    /// Unit of measure, e.g. "kg", "piece", "l"
    #[schema(value_type = String, example = "kg")]
    pub unit: UnitOfMeasure,

    /// Quantity threshold for low-stock detection
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>, example = "250")]
    pub reorder_point: Option<Decimal>,
}

fn validate_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value < Decimal::ZERO {
        return Err(validator::ValidationError::new("must not be negative"));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    #[schema(value_type = String, example = "raw_material")]
    pub item_type: ItemType,
    #[schema(value_type = String, example = "kg")]
    pub unit: UnitOfMeasure,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub last_cost: Decimal,
    pub total_value: Decimal,
    pub reorder_point: Option<Decimal>,
    pub low_stock: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_item::Model> for ItemResponse {
    fn from(model: inventory_item::Model) -> Self {
        let low_stock = model.is_low_stock();
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            item_type: model.item_type,
            unit: model.unit,
            quantity: model.quantity,
            average_cost: model.average_cost,
            last_cost: model.last_cost,
            total_value: model.total_value,
            reorder_point: model.reorder_point,
            low_stock,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Batch referencing an item on its bill of materials
#[derive(Debug, Serialize, ToSchema)]
pub struct BomUsageResponse {
    pub batch_id: Uuid,
    pub batch_number: String,
    #[schema(value_type = String, example = "planned")]
    pub batch_status: BatchStatus,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
}

impl From<BomUsage> for BomUsageResponse {
    fn from(usage: BomUsage) -> Self {
        Self {
            batch_id: usage.batch_id,
            batch_number: usage.batch_number,
            batch_status: usage.batch_status,
            quantity_per_unit: usage.quantity_per_unit,
            waste_factor: usage.waste_factor,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemDetailResponse {
    pub item: ItemResponse,
    /// Full movement history, newest first
    pub transactions: Vec<TransactionResponse>,
    pub bom_usages: Vec<BomUsageResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValuationRowResponse {
    #[schema(value_type = String, example = "raw_material")]
    pub item_type: ItemType,
    pub item_count: u64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValuationReportResponse {
    pub rows: Vec<ValuationRowResponse>,
    pub grand_total: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemListQuery {
    /// Filter by classification
    #[param(value_type = Option<String>)]
    pub item_type: Option<ItemType>,
    /// Filter by active flag
    pub is_active: Option<bool>,
    /// Only items at or below their reorder point
    pub low_stock: Option<bool>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the items router
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock_report))
        .route("/valuation", get(valuation_report))
        .route("/:id", get(get_item))
        .route("/:id/detail", get(get_item_detail))
        .route("/:id/transactions", get(get_item_transactions))
        .route("/:id/deactivate", post(deactivate_item))
        .route("/:id/activate", post(activate_item))
}

/// Create a new inventory item
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .inventory
        .create_item(CreateItemInput {
            sku: payload.sku,
            name: payload.name,
            item_type: payload.item_type,
            unit: payload.unit,
            reorder_point: payload.reorder_point,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ItemResponse::from(item)))
}

/// List items with optional filters
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Item page returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, u64::from(state.config.api_max_page_size));

    let filter = ItemFilter {
        item_type: query.item_type,
        is_active: query.is_active,
        low_stock_only: query.low_stock.unwrap_or(false),
    };

    let (items, total) = state
        .services
        .inventory
        .list_items(filter, page, per_page)
        .await?;

    let data: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Get one item by id
#[utoipa::path(
    get,
    path = "/api/v1/items/:id",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item returned", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.inventory.get_item(item_id).await?;
    Ok(success_response(ItemResponse::from(item)))
}

/// Get one item with its movement history and BOM usages
#[utoipa::path(
    get,
    path = "/api/v1/items/:id/detail",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item detail returned", body = ItemDetailResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item_detail(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.ledger.get_detail(item_id).await?;

    Ok(success_response(ItemDetailResponse {
        item: ItemResponse::from(detail.item),
        transactions: detail
            .transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
        bom_usages: detail
            .bom_usages
            .into_iter()
            .map(BomUsageResponse::from)
            .collect(),
    }))
}

/// Transaction history for one item, newest first
#[utoipa::path(
    get,
    path = "/api/v1/items/:id/transactions",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "History returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item_transactions(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.services.ledger.list_item_transactions(item_id).await?;
    let data: Vec<TransactionResponse> =
        transactions.into_iter().map(TransactionResponse::from).collect();
    Ok(success_response(data))
}

/// Items at or below their reorder point
#[utoipa::path(
    get,
    path = "/api/v1/items/low-stock",
    responses(
        (status = 200, description = "Low-stock items returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn low_stock_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.services.inventory.low_stock_report().await?;
    let data: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();
    Ok(success_response(data))
}

/// Stock valuation totals by item type
#[utoipa::path(
    get,
    path = "/api/v1/items/valuation",
    responses(
        (status = 200, description = "Valuation returned", body = ValuationReportResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn valuation_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.services.inventory.valuation().await?;

    Ok(success_response(ValuationReportResponse {
        rows: report
            .rows
            .into_iter()
            .map(|row| ValuationRowResponse {
                item_type: row.item_type,
                item_count: row.item_count,
                total_quantity: row.total_quantity,
                total_value: row.total_value,
            })
            .collect(),
        grand_total: report.grand_total,
    }))
}

/// Deactivate an item (kept for history, hidden from default listings)
#[utoipa::path(
    post,
    path = "/api/v1/items/:id/deactivate",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deactivated", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn deactivate_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.inventory.deactivate_item(item_id).await?;
    Ok(success_response(ItemResponse::from(item)))
}

/// Reactivate a previously deactivated item
#[utoipa::path(
    post,
    path = "/api/v1/items/:id/activate",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item activated", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn activate_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.inventory.activate_item(item_id).await?;
    Ok(success_response(ItemResponse::from(item)))
}
