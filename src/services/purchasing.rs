//! Purchase documents and the receiving workflow.
//!
//! A purchase moves DRAFT -> ORDERED -> PARTIAL/RECEIVED, with DRAFT and
//! ORDERED also cancellable. Receiving is the only path that touches
//! stock: `preview_receive` projects the outcome without writing,
//! `receive_purchase` commits all lines as one atomic unit through the
//! ledger primitive.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_item::Entity as InventoryItemEntity,
        inventory_transaction::{TransactionDirection, TransactionType},
        purchase::{self, Entity as PurchaseEntity, PurchaseStatus},
        purchase_item::{self, Entity as PurchaseItemEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{PURCHASE_RECEIPTS, SERVICE_DURATION},
    services::{
        costing,
        ledger::{self, RecordTransactionInput, RecordedTransaction},
    },
};

pub const PURCHASE_NUMBER_PREFIX: &str = "PO";

#[derive(Debug, Clone)]
pub struct CreatePurchaseLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreatePurchaseInput {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub items: Vec<CreatePurchaseLine>,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub advance_applied: Decimal,
    pub notes: Option<String>,
    pub created_by: String,
}

/// One line of a receive request. `unit_cost` overrides the ordered unit
/// price for this receipt when the invoice price differs.
#[derive(Debug, Clone)]
pub struct ReceiveLine {
    pub purchase_item_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

/// Projected effect of receiving one line, computed without writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveLinePreview {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivePreview {
    pub purchase_id: Uuid,
    pub purchase_number: String,
    pub status: PurchaseStatus,
    pub lines: Vec<ReceiveLinePreview>,
}

#[derive(Debug, Clone)]
pub struct PurchaseWithItems {
    pub purchase: purchase::Model,
    pub items: Vec<purchase_item::Model>,
}

/// Result of a committed receive: the updated document plus the ledger
/// writes it produced.
#[derive(Debug, Clone)]
pub struct ReceiveOutcome {
    pub purchase: purchase::Model,
    pub items: Vec<purchase_item::Model>,
    pub transactions: Vec<RecordedTransaction>,
}

/// Service owning the purchase document lifecycle.
#[derive(Clone)]
pub struct PurchasingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PurchasingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a DRAFT purchase with its lines. Totals are derived from
    /// the lines; the document number is assigned inside the creation
    /// transaction.
    #[instrument(skip(self, input))]
    pub async fn create_purchase(
        &self,
        input: CreatePurchaseInput,
    ) -> Result<PurchaseWithItems, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "purchase must have at least one line".into(),
            ));
        }
        if input.supplier_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "supplier_name must not be empty".into(),
            ));
        }
        for line in &input.items {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "ordered quantity must be positive for item {}",
                    line.item_id
                )));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "unit price must not be negative for item {}",
                    line.item_id
                )));
            }
        }
        for amount in [input.tax, input.shipping_cost, input.advance_applied] {
            if amount < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "tax, shipping_cost and advance_applied must not be negative".into(),
                ));
            }
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        // Every referenced item must exist before the document is created.
        for line in &input.items {
            InventoryItemEntity::find_by_id(line.item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", line.item_id))
                })?;
        }

        let purchase_number = next_purchase_number(&txn).await?;

        let subtotal: Decimal = input
            .items
            .iter()
            .map(|line| line.quantity * line.unit_price)
            .sum();
        let total = subtotal + input.tax + input.shipping_cost - input.advance_applied;

        let purchase = purchase::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_number: Set(purchase_number),
            supplier_id: Set(input.supplier_id),
            supplier_name: Set(input.supplier_name.trim().to_string()),
            status: Set(PurchaseStatus::Draft),
            subtotal: Set(subtotal),
            tax: Set(input.tax),
            shipping_cost: Set(input.shipping_cost),
            advance_applied: Set(input.advance_applied),
            total: Set(total),
            notes: Set(input.notes),
            created_by: Set(input.created_by),
            ordered_at: Set(None),
            received_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = purchase_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(purchase.id),
                item_id: Set(line.item_id),
                quantity_ordered: Set(line.quantity),
                quantity_received: Set(Decimal::ZERO),
                unit_price: Set(line.unit_price),
                line_total: Set(line.quantity * line.unit_price),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(item);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::PurchaseCreated {
                purchase_id: purchase.id,
                purchase_number: purchase.purchase_number.clone(),
                supplier_id: purchase.supplier_id,
                total: purchase.total,
            })
            .await;

        info!(
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            total = %purchase.total,
            "purchase created"
        );

        Ok(PurchaseWithItems { purchase, items })
    }

    /// DRAFT -> ORDERED; stamps ordered_at. Receiving requires this step.
    #[instrument(skip(self))]
    pub async fn mark_ordered(
        &self,
        purchase_id: Uuid,
        actor: &str,
    ) -> Result<purchase::Model, ServiceError> {
        let purchase = self.find_purchase(purchase_id).await?;

        if !purchase.status.can_transition_to(PurchaseStatus::Ordered) {
            return Err(ServiceError::InvalidTransition(format!(
                "purchase {} cannot move from {} to ordered",
                purchase.purchase_number,
                purchase.status.as_str()
            )));
        }

        let mut update: purchase::ActiveModel = purchase.into();
        update.status = Set(PurchaseStatus::Ordered);
        update.ordered_at = Set(Some(Utc::now()));
        let purchase = update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::PurchaseOrdered {
                purchase_id: purchase.id,
                actor: actor.to_string(),
            })
            .await;

        info!(
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            "purchase marked ordered"
        );
        Ok(purchase)
    }

    /// Projects the effect of receiving the given lines without writing
    /// anything. Safe to call repeatedly; the commit path re-validates.
    #[instrument(skip(self, lines))]
    pub async fn preview_receive(
        &self,
        purchase_id: Uuid,
        lines: &[ReceiveLine],
    ) -> Result<ReceivePreview, ServiceError> {
        let db = &*self.db;
        let purchase = self.find_purchase(purchase_id).await?;
        ensure_receivable(&purchase)?;
        let purchase_items = self.find_purchase_items(db, purchase_id).await?;

        let validated = validate_receive_lines(lines, &purchase_items)?;

        let mut previews = Vec::with_capacity(validated.len());
        for line in validated {
            let item = InventoryItemEntity::find_by_id(line.purchase_item.item_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Inventory item {} not found",
                        line.purchase_item.item_id
                    ))
                })?;

            let projected_quantity = item.quantity + line.quantity;
            let projected_average_cost = costing::compute_cump(
                item.quantity,
                item.average_cost,
                line.quantity,
                line.unit_cost,
            );

            previews.push(ReceiveLinePreview {
                purchase_item_id: line.purchase_item.id,
                item_id: item.id,
                sku: item.sku,
                quantity: line.quantity,
                unit_cost: line.unit_cost,
                remaining_before: line.purchase_item.remaining(),
                remaining_after: line.purchase_item.remaining() - line.quantity,
                projected_quantity,
                projected_average_cost,
                projected_total_value: costing::stock_value(
                    projected_quantity,
                    projected_average_cost,
                ),
            });
        }

        Ok(ReceivePreview {
            purchase_id: purchase.id,
            purchase_number: purchase.purchase_number,
            status: purchase.status,
            lines: previews,
        })
    }

    /// Commits a receipt: every line posts a PURCHASE/IN ledger entry and
    /// bumps its received quantity, then the document status is
    /// recomputed. All lines apply or none do.
    #[instrument(skip(self, lines))]
    pub async fn receive_purchase(
        &self,
        purchase_id: Uuid,
        lines: &[ReceiveLine],
        actor: &str,
    ) -> Result<ReceiveOutcome, ServiceError> {
        let _timer = SERVICE_DURATION
            .with_label_values(&["receive_purchase"])
            .start_timer();

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        // Everything below re-reads fresh state inside the transaction;
        // previews taken earlier hold no reservation.
        let purchase = PurchaseEntity::find_by_id(purchase_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase {} not found", purchase_id)))?;
        ensure_receivable(&purchase)?;
        let purchase_items = self.find_purchase_items(&txn, purchase_id).await?;

        let validated = validate_receive_lines(lines, &purchase_items)?;

        let old_status = purchase.status;
        let mut transactions = Vec::with_capacity(validated.len());
        let mut updated_items = Vec::with_capacity(purchase_items.len());
        let mut received_by_line = HashMap::new();

        for line in &validated {
            let recorded = ledger::record_transaction(
                &txn,
                RecordTransactionInput {
                    item_id: line.purchase_item.item_id,
                    transaction_type: TransactionType::Purchase,
                    direction: TransactionDirection::In,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost,
                    reference_type: Some("purchase".to_string()),
                    reference_id: Some(purchase.id),
                    actor: actor.to_string(),
                    allow_negative: false,
                },
            )
            .await?;
            transactions.push(recorded);

            let mut item_update: purchase_item::ActiveModel = line.purchase_item.clone().into();
            item_update.quantity_received =
                Set(line.purchase_item.quantity_received + line.quantity);
            let updated = item_update
                .update(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            received_by_line.insert(updated.id, updated.clone());
        }

        for item in purchase_items {
            match received_by_line.remove(&item.id) {
                Some(updated) => updated_items.push(updated),
                None => updated_items.push(item),
            }
        }

        let fully_received = updated_items
            .iter()
            .all(|item| item.quantity_received >= item.quantity_ordered);
        let new_status = if fully_received {
            PurchaseStatus::Received
        } else {
            PurchaseStatus::Partial
        };

        let purchase = if new_status != old_status {
            if !old_status.can_transition_to(new_status) {
                return Err(ServiceError::InvalidTransition(format!(
                    "purchase {} cannot move from {} to {}",
                    purchase.purchase_number,
                    old_status.as_str(),
                    new_status.as_str()
                )));
            }
            let mut update: purchase::ActiveModel = purchase.into();
            update.status = Set(new_status);
            if new_status == PurchaseStatus::Received {
                update.received_at = Set(Some(Utc::now()));
            }
            update.update(&txn).await.map_err(ServiceError::db_error)?
        } else {
            purchase
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        PURCHASE_RECEIPTS.inc();
        for recorded in &transactions {
            ledger::notify_recorded(&self.event_sender, recorded).await;
        }
        self.event_sender
            .send_or_log(Event::PurchaseReceived {
                purchase_id: purchase.id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
                lines_received: validated.len(),
                actor: actor.to_string(),
            })
            .await;

        info!(
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            old_status = old_status.as_str(),
            new_status = new_status.as_str(),
            lines = validated.len(),
            "purchase receipt committed"
        );

        Ok(ReceiveOutcome {
            purchase,
            items: updated_items,
            transactions,
        })
    }

    /// DRAFT/ORDERED -> CANCELLED. Purchases with received stock cannot be
    /// cancelled; the goods are already on the ledger.
    #[instrument(skip(self))]
    pub async fn cancel_purchase(
        &self,
        purchase_id: Uuid,
        actor: &str,
    ) -> Result<purchase::Model, ServiceError> {
        let purchase = self.find_purchase(purchase_id).await?;
        let old_status = purchase.status;

        if old_status.is_terminal() {
            return Err(ServiceError::AlreadyCompleted(format!(
                "purchase {} is {}",
                purchase.purchase_number,
                old_status.as_str()
            )));
        }
        if !old_status.can_transition_to(PurchaseStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition(format!(
                "purchase {} cannot move from {} to cancelled",
                purchase.purchase_number,
                old_status.as_str()
            )));
        }

        let mut update: purchase::ActiveModel = purchase.into();
        update.status = Set(PurchaseStatus::Cancelled);
        let purchase = update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::PurchaseCancelled {
                purchase_id: purchase.id,
                old_status: old_status.as_str().to_string(),
                actor: actor.to_string(),
            })
            .await;

        info!(
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            "purchase cancelled"
        );
        Ok(purchase)
    }

    #[instrument(skip(self))]
    pub async fn get_purchase(&self, purchase_id: Uuid) -> Result<PurchaseWithItems, ServiceError> {
        let purchase = self.find_purchase(purchase_id).await?;
        let items = self.find_purchase_items(&*self.db, purchase_id).await?;
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Paginated listing, newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_purchases(
        &self,
        status: Option<PurchaseStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase::Model>, u64), ServiceError> {
        let mut query = PurchaseEntity::find();
        if let Some(status) = status {
            query = query.filter(purchase::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(purchase::Column::CreatedAt)
            .order_by_desc(purchase::Column::PurchaseNumber)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let purchases = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((purchases, total))
    }

    async fn find_purchase(&self, purchase_id: Uuid) -> Result<purchase::Model, ServiceError> {
        PurchaseEntity::find_by_id(purchase_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase {} not found", purchase_id)))
    }

    async fn find_purchase_items<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        purchase_id: Uuid,
    ) -> Result<Vec<purchase_item::Model>, ServiceError> {
        PurchaseItemEntity::find()
            .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
            .order_by_asc(purchase_item::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }
}

struct ValidatedReceiveLine {
    purchase_item: purchase_item::Model,
    quantity: Decimal,
    unit_cost: Decimal,
}

/// Receivable means ORDERED or PARTIAL; terminal documents surface as
/// AlreadyCompleted, a DRAFT as InvalidTransition.
fn ensure_receivable(purchase: &purchase::Model) -> Result<(), ServiceError> {
    if purchase.status.is_terminal() {
        return Err(ServiceError::AlreadyCompleted(format!(
            "purchase {} is {}",
            purchase.purchase_number,
            purchase.status.as_str()
        )));
    }
    if !purchase.status.is_receivable() {
        return Err(ServiceError::InvalidTransition(format!(
            "purchase {} is {}; mark it ordered before receiving",
            purchase.purchase_number,
            purchase.status.as_str()
        )));
    }
    Ok(())
}

/// Shared line validation for preview and commit: positive quantities,
/// lines belong to the document, no duplicates, nothing over the open
/// remainder.
fn validate_receive_lines(
    lines: &[ReceiveLine],
    purchase_items: &[purchase_item::Model],
) -> Result<Vec<ValidatedReceiveLine>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "receive request must have at least one line".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.purchase_item_id) {
            return Err(ServiceError::ValidationError(format!(
                "duplicate receive line for purchase item {}",
                line.purchase_item_id
            )));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "received quantity must be positive for purchase item {}",
                line.purchase_item_id
            )));
        }
        if let Some(unit_cost) = line.unit_cost {
            if unit_cost < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "unit cost override must not be negative for purchase item {}",
                    line.purchase_item_id
                )));
            }
        }

        let purchase_item = purchase_items
            .iter()
            .find(|item| item.id == line.purchase_item_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Purchase item {} not found on this purchase",
                    line.purchase_item_id
                ))
            })?;

        let remaining = purchase_item.remaining();
        if line.quantity > remaining {
            return Err(ServiceError::ExceedsRemaining(format!(
                "purchase item {}: remaining {}, requested {}",
                purchase_item.id, remaining, line.quantity
            )));
        }

        let unit_cost = line.unit_cost.unwrap_or(purchase_item.unit_price);
        validated.push(ValidatedReceiveLine {
            purchase_item,
            quantity: line.quantity,
            unit_cost,
        });
    }

    Ok(validated)
}

/// Next period-scoped document number, e.g. `PO-202508-0042`. Counted
/// inside the caller's transaction so concurrent creations in one period
/// stay sequential.
async fn next_purchase_number<C: sea_orm::ConnectionTrait>(
    conn: &C,
) -> Result<String, ServiceError> {
    let period = super::document_period(Utc::now());
    let prefix = format!("{}-{}-", PURCHASE_NUMBER_PREFIX, period);
    let count = PurchaseEntity::find()
        .filter(purchase::Column::PurchaseNumber.starts_with(prefix.as_str()))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(super::document_number(
        PURCHASE_NUMBER_PREFIX,
        &period,
        count + 1,
    ))
}
