use super::common::{
    default_page, default_per_page, success_response, PaginatedResponse,
};
use crate::{
    entities::inventory_transaction::{self, TransactionDirection, TransactionType},
    errors::ApiError,
    handlers::AppState,
    services::ledger::TransactionFilter,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One ledger entry as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    #[schema(value_type = String, example = "purchase")]
    pub transaction_type: TransactionType,
    #[schema(value_type = String, example = "in")]
    pub direction: TransactionDirection,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub value_before: Decimal,
    pub value_after: Decimal,
    pub avg_cost_before: Decimal,
    pub avg_cost_after: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<inventory_transaction::Model> for TransactionResponse {
    fn from(model: inventory_transaction::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            transaction_type: model.transaction_type,
            direction: model.direction,
            quantity: model.quantity,
            unit_cost: model.unit_cost,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            value_before: model.value_before,
            value_after: model.value_after,
            avg_cost_before: model.avg_cost_before,
            avg_cost_after: model.avg_cost_after,
            reference_type: model.reference_type,
            reference_id: model.reference_id,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionListQuery {
    /// Restrict to one item
    pub item_id: Option<Uuid>,
    /// Business origin filter, e.g. "purchase" or "production_out"
    #[param(value_type = Option<String>)]
    pub transaction_type: Option<TransactionType>,
    /// "in" or "out"
    #[param(value_type = Option<String>)]
    pub direction: Option<TransactionDirection>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the transactions router
pub fn transaction_routes() -> Router<AppState> {
    Router::new().route("/", get(list_transactions))
}

/// List ledger transactions across all items
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transaction page returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, u64::from(state.config.api_max_page_size));

    let filter = TransactionFilter {
        item_id: query.item_id,
        transaction_type: query.transaction_type,
        direction: query.direction,
    };

    let (transactions, total) = state
        .services
        .ledger
        .list_transactions(filter, page, per_page)
        .await?;

    let data: Vec<TransactionResponse> =
        transactions.into_iter().map(TransactionResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}
