use super::common::success_response;
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::reconciliation::{Discrepancy, ReconciliationReport},
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscrepancyResponse {
    pub item_id: Uuid,
    pub sku: String,
    /// Quantity the ledger history sums to
    pub expected_qty: Decimal,
    /// Quantity stored on the item snapshot
    pub actual_qty: Decimal,
    pub variance: Decimal,
}

impl From<Discrepancy> for DiscrepancyResponse {
    fn from(discrepancy: Discrepancy) -> Self {
        Self {
            item_id: discrepancy.item_id,
            sku: discrepancy.sku,
            expected_qty: discrepancy.expected_qty,
            actual_qty: discrepancy.actual_qty,
            variance: discrepancy.variance,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationResponse {
    pub items_checked: usize,
    pub discrepancy_count: usize,
    pub is_clean: bool,
    pub tolerance: Decimal,
    pub discrepancies: Vec<DiscrepancyResponse>,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        let is_clean = report.is_clean();
        Self {
            items_checked: report.items_checked,
            discrepancy_count: report.discrepancies.len(),
            is_clean,
            tolerance: report.tolerance,
            discrepancies: report
                .discrepancies
                .into_iter()
                .map(DiscrepancyResponse::from)
                .collect(),
        }
    }
}

/// Create the reconciliation router
pub fn reconciliation_routes() -> Router<AppState> {
    Router::new().route("/", get(reconcile_inventory))
}

/// Replay the ledger for every active item and report drift
#[utoipa::path(
    get,
    path = "/api/v1/reconciliation",
    responses(
        (status = 200, description = "Reconciliation report returned", body = ReconciliationResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "reconciliation"
)]
pub async fn reconcile_inventory(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.services.reconciliation.reconcile_inventory().await?;
    Ok(success_response(ReconciliationResponse::from(report)))
}
