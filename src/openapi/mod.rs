use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockLedger API",
        version = "0.1.0",
        description = r#"
# StockLedger Inventory Valuation API

An inventory valuation and transactional ledger engine built around moving-average (CUMP) costing.

## Features

- **Item Catalog**: Track stock items with quantity, average cost, and total inventory value
- **Transaction Ledger**: Append-only record of every stock movement with cost snapshots
- **Purchase Receiving**: Purchase lifecycle with partial receipts and costed previews
- **Production Batches**: BOM-driven material consumption and finished-goods costing
- **Stock Adjustments**: Audited add/remove/set corrections against the ledger
- **Reconciliation**: Read-only audit comparing stored quantities against the ledger

## Costing

Every inbound receipt re-weights the item's moving average:

```
new_avg = (on_hand * old_avg + qty_in * unit_cost) / (on_hand + qty_in)
```

Outbound movements are valued at the current average and never change it.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Conflict",
  "message": "Received quantity 100 exceeds remaining 20",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept the following query parameters:
- `page`: Page number (default: 1)
- `per_page`: Items per page (default: 20, capped by server config)
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Items", description = "Item catalog and valuation endpoints"),
        (name = "Transactions", description = "Inventory ledger endpoints"),
        (name = "Purchases", description = "Purchase receiving endpoints"),
        (name = "Batches", description = "Production batch endpoints"),
        (name = "Adjustments", description = "Stock adjustment endpoints"),
        (name = "Reconciliation", description = "Ledger audit endpoints")
    ),
    paths(
        // Items
        crate::handlers::items::create_item,
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::get_item_detail,
        crate::handlers::items::get_item_transactions,
        crate::handlers::items::low_stock_report,
        crate::handlers::items::valuation_report,
        crate::handlers::items::deactivate_item,
        crate::handlers::items::activate_item,

        // Transactions
        crate::handlers::transactions::list_transactions,

        // Purchases
        crate::handlers::purchases::create_purchase,
        crate::handlers::purchases::list_purchases,
        crate::handlers::purchases::get_purchase,
        crate::handlers::purchases::mark_ordered,
        crate::handlers::purchases::preview_receive,
        crate::handlers::purchases::receive_purchase,
        crate::handlers::purchases::cancel_purchase,

        // Batches
        crate::handlers::batches::create_batch,
        crate::handlers::batches::list_batches,
        crate::handlers::batches::get_batch,
        crate::handlers::batches::batch_requirements,
        crate::handlers::batches::start_batch,
        crate::handlers::batches::complete_batch,
        crate::handlers::batches::hold_batch,
        crate::handlers::batches::resume_batch,
        crate::handlers::batches::cancel_batch,

        // Adjustments
        crate::handlers::adjustments::apply_adjustment,
        crate::handlers::adjustments::list_adjustments,

        // Reconciliation
        crate::handlers::reconciliation::reconcile_inventory,

        // Health and status intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            // Common types
            crate::handlers::common::PaginationMeta,

            // Item types
            crate::handlers::items::CreateItemRequest,
            crate::handlers::items::ItemResponse,
            crate::handlers::items::BomUsageResponse,
            crate::handlers::items::ItemDetailResponse,
            crate::handlers::items::ValuationRowResponse,
            crate::handlers::items::ValuationReportResponse,

            // Transaction types
            crate::handlers::transactions::TransactionResponse,

            // Purchase types
            crate::handlers::purchases::PurchaseLineRequest,
            crate::handlers::purchases::CreatePurchaseRequest,
            crate::handlers::purchases::ActorRequest,
            crate::handlers::purchases::ReceiveLineRequest,
            crate::handlers::purchases::ReceivePurchaseRequest,
            crate::handlers::purchases::PurchaseResponse,
            crate::handlers::purchases::PurchaseItemResponse,
            crate::handlers::purchases::PurchaseDetailResponse,
            crate::handlers::purchases::ReceiveLinePreviewResponse,
            crate::handlers::purchases::ReceivePreviewResponse,
            crate::handlers::purchases::ReceiveOutcomeResponse,

            // Batch types
            crate::handlers::batches::BomLineRequest,
            crate::handlers::batches::CreateBatchRequest,
            crate::handlers::batches::BatchActorRequest,
            crate::handlers::batches::CompleteBatchRequest,
            crate::handlers::batches::BatchResponse,
            crate::handlers::batches::BomLineResponse,
            crate::handlers::batches::ConsumptionResponse,
            crate::handlers::batches::BatchDetailResponse,
            crate::handlers::batches::RequirementLineResponse,
            crate::handlers::batches::RequirementsResponse,
            crate::handlers::batches::StartOutcomeResponse,
            crate::handlers::batches::CompleteOutcomeResponse,

            // Adjustment types
            crate::handlers::adjustments::ApplyAdjustmentRequest,
            crate::handlers::adjustments::AdjustmentResponse,
            crate::handlers::adjustments::AdjustmentOutcomeResponse,

            // Reconciliation types
            crate::handlers::reconciliation::DiscrepancyResponse,
            crate::handlers::reconciliation::ReconciliationResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("StockLedger API"));
        assert!(json.contains("/api/v1/items"));
        assert!(json.contains("/api/v1/purchases/{id}/receive"));
        assert!(json.contains("/api/v1/batches/{id}/complete"));
    }
}
