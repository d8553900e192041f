//! Ledger reconciliation: replays the signed transaction history per
//! active item and flags any drift from the stored quantity snapshot.
//!
//! Strictly read-only. A discrepancy is reported, never auto-corrected;
//! fixing one is a deliberate adjustment with its own audit trail.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_item::{self, Entity as InventoryItemEntity},
        inventory_transaction::Entity as InventoryTransactionEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{RECONCILIATION_DISCREPANCIES, RECONCILIATION_RUNS, SERVICE_DURATION},
};

/// One item whose stored quantity disagrees with its ledger replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub item_id: Uuid,
    pub sku: String,
    /// Quantity the ledger history sums to.
    pub expected_qty: Decimal,
    /// Quantity stored on the item snapshot.
    pub actual_qty: Decimal,
    /// `actual_qty - expected_qty`.
    pub variance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub items_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
    pub tolerance: Decimal,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

fn check_item(
    item: &inventory_item::Model,
    expected: Decimal,
    tolerance: Decimal,
) -> Option<Discrepancy> {
    let variance = item.quantity - expected;
    if variance.abs() > tolerance {
        Some(Discrepancy {
            item_id: item.id,
            sku: item.sku.clone(),
            expected_qty: expected,
            actual_qty: item.quantity,
            variance,
        })
    } else {
        None
    }
}

#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    /// Absolute variance at or below this is treated as clean.
    tolerance: Decimal,
}

impl ReconciliationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, tolerance: Decimal) -> Self {
        Self {
            db,
            event_sender,
            tolerance,
        }
    }

    /// Replays the ledger for every active item and reports the items
    /// whose snapshot drifted beyond the tolerance.
    #[instrument(skip(self))]
    pub async fn reconcile_inventory(&self) -> Result<ReconciliationReport, ServiceError> {
        let _timer = SERVICE_DURATION
            .with_label_values(&["reconcile_inventory"])
            .start_timer();

        let db = &*self.db;
        let items = InventoryItemEntity::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .order_by_asc(inventory_item::Column::Sku)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        // One pass over the whole ledger, folded into per-item sums.
        let mut ledger_sums: HashMap<Uuid, Decimal> = HashMap::new();
        let transactions = InventoryTransactionEntity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        for transaction in &transactions {
            *ledger_sums.entry(transaction.item_id).or_default() +=
                transaction.signed_quantity();
        }

        let mut discrepancies = Vec::new();
        for item in &items {
            let expected = ledger_sums.get(&item.id).copied().unwrap_or(Decimal::ZERO);
            if let Some(discrepancy) = check_item(item, expected, self.tolerance) {
                warn!(
                    item_id = %discrepancy.item_id,
                    sku = %discrepancy.sku,
                    expected_qty = %discrepancy.expected_qty,
                    actual_qty = %discrepancy.actual_qty,
                    variance = %discrepancy.variance,
                    "ledger discrepancy detected"
                );
                discrepancies.push(discrepancy);
            }
        }

        RECONCILIATION_RUNS.inc();
        RECONCILIATION_DISCREPANCIES.set(discrepancies.len() as i64);

        self.event_sender
            .send_or_log(Event::ReconciliationCompleted {
                items_checked: items.len(),
                discrepancies: discrepancies.len(),
            })
            .await;

        if discrepancies.is_empty() {
            info!(items_checked = items.len(), "reconciliation clean");
        }

        Ok(ReconciliationReport {
            items_checked: items.len(),
            discrepancies,
            tolerance: self.tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::inventory_item::{ItemType, UnitOfMeasure};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item_fixture(quantity: Decimal) -> inventory_item::Model {
        inventory_item::Model {
            id: Uuid::new_v4(),
            sku: "SUGAR-01".into(),
            name: "Cane sugar".into(),
            item_type: ItemType::RawMaterial,
            unit: UnitOfMeasure::Kg,
            quantity,
            average_cost: dec!(2.5),
            last_cost: dec!(2.5),
            total_value: quantity * dec!(2.5),
            reorder_point: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exact_match_is_clean() {
        let item = item_fixture(dec!(150));
        assert!(check_item(&item, dec!(150), dec!(0.0001)).is_none());
    }

    #[test]
    fn variance_within_tolerance_is_clean() {
        let item = item_fixture(dec!(150.00005));
        assert!(check_item(&item, dec!(150), dec!(0.0001)).is_none());
    }

    #[test]
    fn variance_beyond_tolerance_is_flagged() {
        let item = item_fixture(dec!(151));
        let discrepancy = check_item(&item, dec!(150), dec!(0.0001)).unwrap();
        assert_eq!(discrepancy.variance, dec!(1));
        assert_eq!(discrepancy.expected_qty, dec!(150));
        assert_eq!(discrepancy.actual_qty, dec!(151));
    }

    #[test]
    fn negative_variance_keeps_its_sign() {
        let item = item_fixture(dec!(149));
        let discrepancy = check_item(&item, dec!(150), dec!(0.0001)).unwrap();
        assert_eq!(discrepancy.variance, dec!(-1));
    }
}
