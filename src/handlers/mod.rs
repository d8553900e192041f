pub mod adjustments;
pub mod batches;
pub mod common;
pub mod items;
pub mod purchases;
pub mod reconciliation;
pub mod transactions;

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: crate::services::inventory::InventoryService,
    pub ledger: crate::services::ledger::LedgerService,
    pub purchasing: crate::services::purchasing::PurchasingService,
    pub production: crate::services::production::ProductionService,
    pub adjustments: crate::services::adjustments::AdjustmentService,
    pub reconciliation: crate::services::reconciliation::ReconciliationService,
}

impl AppServices {
    /// Wires every service against one shared connection and event channel.
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let overrun_tolerance = Decimal::try_from(config.production_overrun_tolerance)
            .unwrap_or_else(|_| Decimal::new(110, 2));
        let reconciliation_tolerance = Decimal::try_from(config.reconciliation_tolerance)
            .unwrap_or_else(|_| Decimal::new(1, 4));

        Self {
            inventory: crate::services::inventory::InventoryService::new(
                db.clone(),
                event_sender.clone(),
            ),
            ledger: crate::services::ledger::LedgerService::new(db.clone()),
            purchasing: crate::services::purchasing::PurchasingService::new(
                db.clone(),
                event_sender.clone(),
            ),
            production: crate::services::production::ProductionService::new(
                db.clone(),
                event_sender.clone(),
                overrun_tolerance,
            ),
            adjustments: crate::services::adjustments::AdjustmentService::new(
                db.clone(),
                event_sender.clone(),
            ),
            reconciliation: crate::services::reconciliation::ReconciliationService::new(
                db,
                event_sender,
                reconciliation_tolerance,
            ),
        }
    }
}
