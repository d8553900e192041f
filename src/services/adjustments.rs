//! Manual stock corrections routed through the ledger primitive.
//!
//! ADD and REMOVE post at the item's current average cost, so an
//! adjustment corrects quantity without touching the cost basis. SET is
//! sugar: it computes the delta against the live quantity and routes
//! through ADD or REMOVE, and a zero delta still leaves an audit row.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_adjustment::{self, AdjustmentKind, Entity as InventoryAdjustmentEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        inventory_transaction::{self, TransactionDirection, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ADJUSTMENTS_APPLIED,
    services::ledger::{self, RecordTransactionInput},
};

#[derive(Debug, Clone)]
pub struct ApplyAdjustmentInput {
    pub item_id: Uuid,
    pub kind: AdjustmentKind,
    /// Quantity to add or remove; the target quantity for SET.
    pub quantity: Decimal,
    pub reason: String,
    pub allow_negative: bool,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    pub adjustment: inventory_adjustment::Model,
    pub item: inventory_item::Model,
    /// Ledger entry posted for this adjustment; None when a SET was a
    /// no-op.
    pub transaction: Option<inventory_transaction::Model>,
}

/// Signed delta an adjustment applies against the current quantity.
fn adjustment_delta(kind: AdjustmentKind, requested: Decimal, current: Decimal) -> Decimal {
    match kind {
        AdjustmentKind::Add => requested,
        AdjustmentKind::Remove => -requested,
        AdjustmentKind::Set => requested - current,
    }
}

#[derive(Clone)]
pub struct AdjustmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AdjustmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies one manual correction: the audit row and its ledger entry
    /// commit together or not at all.
    #[instrument(skip(self, input), fields(item_id = %input.item_id, kind = input.kind.as_str()))]
    pub async fn apply_adjustment(
        &self,
        input: ApplyAdjustmentInput,
    ) -> Result<AdjustmentOutcome, ServiceError> {
        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "adjustment reason must not be empty".into(),
            ));
        }
        match input.kind {
            AdjustmentKind::Add | AdjustmentKind::Remove => {
                if input.quantity <= Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "adjustment quantity must be positive, got {}",
                        input.quantity
                    )));
                }
            }
            AdjustmentKind::Set => {
                if input.quantity < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "target quantity must not be negative, got {}",
                        input.quantity
                    )));
                }
            }
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let item = InventoryItemEntity::find_by_id(input.item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", input.item_id))
            })?;

        let delta = adjustment_delta(input.kind, input.quantity, item.quantity);

        let recorded = if delta.is_zero() {
            info!(
                item_id = %item.id,
                sku = %item.sku,
                "set adjustment matches current quantity, recording no-op"
            );
            None
        } else {
            let (direction, quantity) = if delta > Decimal::ZERO {
                (TransactionDirection::In, delta)
            } else {
                (TransactionDirection::Out, -delta)
            };
            Some(
                ledger::record_transaction(
                    &txn,
                    RecordTransactionInput {
                        item_id: item.id,
                        transaction_type: TransactionType::Adjustment,
                        direction,
                        quantity,
                        // Corrections keep the cost basis untouched.
                        unit_cost: item.average_cost,
                        reference_type: Some("adjustment".to_string()),
                        reference_id: None,
                        actor: input.created_by.clone(),
                        allow_negative: input.allow_negative,
                    },
                )
                .await?,
            )
        };

        let adjustment_id = Uuid::new_v4();
        let adjustment = inventory_adjustment::ActiveModel {
            id: Set(adjustment_id),
            item_id: Set(item.id),
            adjustment_kind: Set(input.kind),
            quantity: Set(input.quantity),
            applied_delta: Set(delta),
            reason: Set(reason.clone()),
            allow_negative: Set(input.allow_negative),
            transaction_id: Set(recorded.as_ref().map(|r| r.transaction.id)),
            created_by: Set(input.created_by.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        ADJUSTMENTS_APPLIED
            .with_label_values(&[input.kind.as_str()])
            .inc();

        if let Some(recorded) = &recorded {
            ledger::notify_recorded(&self.event_sender, recorded).await;
        }
        self.event_sender
            .send_or_log(Event::AdjustmentApplied {
                adjustment_id,
                item_id: item.id,
                kind: input.kind.as_str().to_string(),
                applied_delta: delta,
                reason,
                actor: input.created_by,
            })
            .await;

        let (item, transaction) = match recorded {
            Some(recorded) => (recorded.item, Some(recorded.transaction)),
            None => (item, None),
        };

        info!(
            adjustment_id = %adjustment.id,
            item_id = %item.id,
            sku = %item.sku,
            applied_delta = %delta,
            quantity_after = %item.quantity,
            "adjustment applied"
        );

        Ok(AdjustmentOutcome {
            adjustment,
            item,
            transaction,
        })
    }

    /// Adjustment history, newest first, optionally scoped to one item.
    #[instrument(skip(self))]
    pub async fn list_adjustments(
        &self,
        item_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_adjustment::Model>, u64), ServiceError> {
        if let Some(item_id) = item_id {
            InventoryItemEntity::find_by_id(item_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", item_id))
                })?;
        }

        let mut query = InventoryAdjustmentEntity::find();
        if let Some(item_id) = item_id {
            query = query.filter(inventory_adjustment::Column::ItemId.eq(item_id));
        }

        let paginator = query
            .order_by_desc(inventory_adjustment::Column::CreatedAt)
            .order_by_desc(inventory_adjustment::Column::Id)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let adjustments = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((adjustments, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_delta_is_positive_requested() {
        assert_eq!(
            adjustment_delta(AdjustmentKind::Add, dec!(5), dec!(10)),
            dec!(5)
        );
    }

    #[test]
    fn remove_delta_is_negative_requested() {
        assert_eq!(
            adjustment_delta(AdjustmentKind::Remove, dec!(3), dec!(10)),
            dec!(-3)
        );
    }

    #[test]
    fn set_delta_is_target_minus_current() {
        assert_eq!(
            adjustment_delta(AdjustmentKind::Set, dec!(15), dec!(10)),
            dec!(5)
        );
        assert_eq!(
            adjustment_delta(AdjustmentKind::Set, dec!(4), dec!(10)),
            dec!(-6)
        );
        assert_eq!(
            adjustment_delta(AdjustmentKind::Set, dec!(10), dec!(10)),
            dec!(0)
        );
    }
}
