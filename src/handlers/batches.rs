use super::common::{
    created_response, default_actor, default_page, default_per_page, map_service_error,
    success_response, validate_input, PaginatedResponse,
};
use super::transactions::TransactionResponse;
use crate::{
    entities::batch_consumption,
    entities::bom_line,
    entities::production_batch::{self, BatchStatus},
    errors::ApiError,
    handlers::AppState,
    services::production::{
        BatchDetail, CreateBatchInput, CreateBatchLine, LineRequirement, RequirementsReport,
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

fn default_waste_factor() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BomLineRequest {
    pub item_id: Uuid,
    /// Component quantity consumed per produced unit
    #[schema(value_type = String, example = "2.5")]
    pub quantity_per_unit: Decimal,
    /// Multiplier covering expected process loss, 1.0 = no waste
    #[serde(default = "default_waste_factor")]
    #[schema(value_type = String, example = "1.05")]
    pub waste_factor: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "output_item_id": "0c0bd5f5-1f63-49a8-b1fb-2e0058f4a1a2",
    "planned_quantity": "200",
    "bom_lines": [{"item_id": "550e8400-e29b-41d4-a716-446655440000", "quantity_per_unit": "2.5", "waste_factor": "1.05"}],
    "labor_cost": "300.00",
    "overhead_cost": "150.00"
}))]
pub struct CreateBatchRequest {
    /// Finished-goods item credited at completion, when the output is stocked
    pub output_item_id: Option<Uuid>,

    #[schema(value_type = String, example = "200")]
    pub planned_quantity: Decimal,

    #[validate(length(min = 1, message = "Batch must have at least one bill-of-material line"))]
    #[validate]
    pub bom_lines: Vec<BomLineRequest>,

    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub labor_cost: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub overhead_cost: Decimal,

    /// Per-unit surcharge applied to produced quantity at completion
    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub other_cost_per_unit: Decimal,

    pub notes: Option<String>,

    #[serde(default = "default_actor")]
    #[schema(example = "marek")]
    pub created_by: String,
}

/// Body for plain status transitions (start, hold, resume, cancel)
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchActorRequest {
    #[serde(default = "default_actor")]
    #[schema(example = "marek")]
    pub actor: String,
}

impl Default for BatchActorRequest {
    fn default() -> Self {
        Self {
            actor: default_actor(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteBatchRequest {
    #[schema(value_type = String, example = "195")]
    pub produced_quantity: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "5")]
    pub waste_quantity: Decimal,

    #[serde(default = "default_actor")]
    #[schema(example = "marek")]
    pub completed_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub batch_number: String,
    pub output_item_id: Option<Uuid>,
    #[schema(value_type = String, example = "in_progress")]
    pub status: BatchStatus,
    pub planned_quantity: Decimal,
    pub produced_quantity: Option<Decimal>,
    pub waste_quantity: Option<Decimal>,
    pub labor_cost: Decimal,
    pub overhead_cost: Decimal,
    pub other_cost_per_unit: Decimal,
    pub materials_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub cost_per_unit: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<production_batch::Model> for BatchResponse {
    fn from(model: production_batch::Model) -> Self {
        Self {
            id: model.id,
            batch_number: model.batch_number,
            output_item_id: model.output_item_id,
            status: model.status,
            planned_quantity: model.planned_quantity,
            produced_quantity: model.produced_quantity,
            waste_quantity: model.waste_quantity,
            labor_cost: model.labor_cost,
            overhead_cost: model.overhead_cost,
            other_cost_per_unit: model.other_cost_per_unit,
            materials_cost: model.materials_cost,
            total_cost: model.total_cost,
            cost_per_unit: model.cost_per_unit,
            notes: model.notes,
            created_by: model.created_by,
            started_at: model.started_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BomLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
}

impl From<bom_line::Model> for BomLineResponse {
    fn from(model: bom_line::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            quantity_per_unit: model.quantity_per_unit,
            waste_factor: model.waste_factor,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConsumptionResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<batch_consumption::Model> for ConsumptionResponse {
    fn from(model: batch_consumption::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            quantity: model.quantity,
            unit_cost: model.unit_cost,
            total_cost: model.total_cost,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchDetailResponse {
    pub batch: BatchResponse,
    pub bom_lines: Vec<BomLineResponse>,
    pub consumptions: Vec<ConsumptionResponse>,
}

impl From<BatchDetail> for BatchDetailResponse {
    fn from(detail: BatchDetail) -> Self {
        Self {
            batch: BatchResponse::from(detail.batch),
            bom_lines: detail.bom_lines.into_iter().map(BomLineResponse::from).collect(),
            consumptions: detail
                .consumptions
                .into_iter()
                .map(ConsumptionResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequirementLineResponse {
    pub item_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
    pub required: Decimal,
    pub available: Decimal,
    pub shortage: Decimal,
    pub can_consume: bool,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

impl From<LineRequirement> for RequirementLineResponse {
    fn from(line: LineRequirement) -> Self {
        Self {
            item_id: line.item_id,
            sku: line.sku,
            name: line.name,
            quantity_per_unit: line.quantity_per_unit,
            waste_factor: line.waste_factor,
            required: line.required,
            available: line.available,
            shortage: line.shortage,
            can_consume: line.can_consume,
            unit_cost: line.unit_cost,
            total_cost: line.total_cost,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequirementsResponse {
    pub batch_id: Uuid,
    pub batch_number: String,
    #[schema(value_type = String, example = "planned")]
    pub status: BatchStatus,
    pub planned_quantity: Decimal,
    pub lines: Vec<RequirementLineResponse>,
    pub has_shortage: bool,
    pub can_proceed: bool,
    pub total_materials_cost: Decimal,
}

impl From<RequirementsReport> for RequirementsResponse {
    fn from(report: RequirementsReport) -> Self {
        Self {
            batch_id: report.batch_id,
            batch_number: report.batch_number,
            status: report.status,
            planned_quantity: report.planned_quantity,
            lines: report
                .lines
                .into_iter()
                .map(RequirementLineResponse::from)
                .collect(),
            has_shortage: report.has_shortage,
            can_proceed: report.can_proceed,
            total_materials_cost: report.total_materials_cost,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartOutcomeResponse {
    pub batch: BatchResponse,
    pub consumptions: Vec<ConsumptionResponse>,
    /// PRODUCTION_OUT ledger entries written by the start
    pub transactions: Vec<TransactionResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteOutcomeResponse {
    pub batch: BatchResponse,
    /// PRODUCTION_IN entry crediting the output item, when one is set
    pub output_transaction: Option<TransactionResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BatchListQuery {
    /// planned, in_progress, completed, on_hold or cancelled
    #[param(value_type = Option<String>)]
    pub status: Option<BatchStatus>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the batches router
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/:id", get(get_batch))
        .route("/:id/requirements", get(batch_requirements))
        .route("/:id/start", post(start_batch))
        .route("/:id/complete", post(complete_batch))
        .route("/:id/hold", post(hold_batch))
        .route("/:id/resume", post(resume_batch))
        .route("/:id/cancel", post(cancel_batch))
}

/// Plan a production batch with its bill of materials
#[utoipa::path(
    post,
    path = "/api/v1/batches",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch planned", body = BatchDetailResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item on a line", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let detail = state
        .services
        .production
        .create_batch(CreateBatchInput {
            output_item_id: payload.output_item_id,
            planned_quantity: payload.planned_quantity,
            bom_lines: payload
                .bom_lines
                .into_iter()
                .map(|line| CreateBatchLine {
                    item_id: line.item_id,
                    quantity_per_unit: line.quantity_per_unit,
                    waste_factor: line.waste_factor,
                })
                .collect(),
            labor_cost: payload.labor_cost,
            overhead_cost: payload.overhead_cost,
            other_cost_per_unit: payload.other_cost_per_unit,
            notes: payload.notes,
            created_by: payload.created_by,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(BatchDetailResponse::from(detail)))
}

/// List batches, newest first
#[utoipa::path(
    get,
    path = "/api/v1/batches",
    params(BatchListQuery),
    responses(
        (status = 200, description = "Batch page returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, u64::from(state.config.api_max_page_size));

    let (batches, total) = state
        .services
        .production
        .list_batches(query.status, page, per_page)
        .await?;

    let data: Vec<BatchResponse> = batches.into_iter().map(BatchResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// Get one batch with its BOM lines and consumptions
#[utoipa::path(
    get,
    path = "/api/v1/batches/:id",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch returned", body = BatchDetailResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.production.get_batch(batch_id).await?;
    Ok(success_response(BatchDetailResponse::from(detail)))
}

/// Material requirements against live stock, with shortages
#[utoipa::path(
    get,
    path = "/api/v1/batches/:id/requirements",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Requirements returned", body = RequirementsResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn batch_requirements(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.services.production.preview_consume(batch_id).await?;
    Ok(success_response(RequirementsResponse::from(report)))
}

/// Start a planned batch, consuming all materials atomically
#[utoipa::path(
    post,
    path = "/api/v1/batches/:id/start",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = BatchActorRequest,
    responses(
        (status = 200, description = "Batch started", body = StartOutcomeResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not in PLANNED state", body = crate::errors::ErrorResponse),
        (status = 422, description = "Material shortage", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn start_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    payload: Option<Json<BatchActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let outcome = state
        .services
        .production
        .start_batch(batch_id, &payload.actor)
        .await?;

    Ok(success_response(StartOutcomeResponse {
        batch: BatchResponse::from(outcome.batch),
        consumptions: outcome
            .consumptions
            .into_iter()
            .map(ConsumptionResponse::from)
            .collect(),
        transactions: outcome
            .transactions
            .into_iter()
            .map(|recorded| TransactionResponse::from(recorded.transaction))
            .collect(),
    }))
}

/// Complete an in-progress batch and roll up its costs
#[utoipa::path(
    post,
    path = "/api/v1/batches/:id/complete",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = CompleteBatchRequest,
    responses(
        (status = 200, description = "Batch completed", body = CompleteOutcomeResponse),
        (status = 400, description = "Invalid quantities", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not in IN_PROGRESS state", body = crate::errors::ErrorResponse),
        (status = 422, description = "Overrun tolerance exceeded", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn complete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<CompleteBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .production
        .complete_batch(
            batch_id,
            payload.produced_quantity,
            payload.waste_quantity,
            &payload.completed_by,
        )
        .await?;

    Ok(success_response(CompleteOutcomeResponse {
        batch: BatchResponse::from(outcome.batch),
        output_transaction: outcome
            .output_transaction
            .map(|recorded| TransactionResponse::from(recorded.transaction)),
    }))
}

/// Put an in-progress batch on hold
#[utoipa::path(
    post,
    path = "/api/v1/batches/:id/hold",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = BatchActorRequest,
    responses(
        (status = 200, description = "Batch held", body = BatchResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not in IN_PROGRESS state", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn hold_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    payload: Option<Json<BatchActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let batch = state
        .services
        .production
        .hold_batch(batch_id, &payload.actor)
        .await?;
    Ok(success_response(BatchResponse::from(batch)))
}

/// Resume a held batch
#[utoipa::path(
    post,
    path = "/api/v1/batches/:id/resume",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = BatchActorRequest,
    responses(
        (status = 200, description = "Batch resumed", body = BatchResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not in ON_HOLD state", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn resume_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    payload: Option<Json<BatchActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let batch = state
        .services
        .production
        .resume_batch(batch_id, &payload.actor)
        .await?;
    Ok(success_response(BatchResponse::from(batch)))
}

/// Cancel a planned or held batch
#[utoipa::path(
    post,
    path = "/api/v1/batches/:id/cancel",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = BatchActorRequest,
    responses(
        (status = 200, description = "Batch cancelled", body = BatchResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not cancellable from current state", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    payload: Option<Json<BatchActorRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let batch = state
        .services
        .production
        .cancel_batch(batch_id, &payload.actor)
        .await?;
    Ok(success_response(BatchResponse::from(batch)))
}
