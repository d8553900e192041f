//! Ledger store: the single write path for stock movements.
//!
//! `record_transaction` is the only place an item's quantity, average cost
//! or total value may change. It appends one immutable ledger row and
//! rewrites the item snapshot in the same database connection, which for
//! every commit path is the caller's open transaction — the workflow write
//! and the ledger write either land together or not at all.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        bom_line::{self, Entity as BomLineEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        inventory_transaction::{
            self, Entity as InventoryTransactionEntity, TransactionDirection, TransactionType,
        },
        production_batch::BatchStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::LEDGER_TRANSACTIONS,
    services::costing,
};

/// One requested stock movement.
#[derive(Debug, Clone)]
pub struct RecordTransactionInput {
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    pub direction: TransactionDirection,
    /// Movement size, strictly positive; the sign lives in `direction`.
    pub quantity: Decimal,
    /// Unit cost of the movement. For inbound movements this is blended
    /// into the moving average; outbound movements are costed at it but
    /// never shift the average.
    pub unit_cost: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub actor: String,
    /// Permits an outbound movement to drive the balance negative.
    pub allow_negative: bool,
}

/// The ledger row that was appended plus the item snapshot after the write.
#[derive(Debug, Clone)]
pub struct RecordedTransaction {
    pub transaction: inventory_transaction::Model,
    pub item: inventory_item::Model,
}

/// Appends a ledger entry and updates the item snapshot atomically on the
/// supplied connection. Callers on a commit path pass their open
/// transaction so all writes share one atomic unit.
pub async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    input: RecordTransactionInput,
) -> Result<RecordedTransaction, ServiceError> {
    if input.quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "transaction quantity must be positive, got {}",
            input.quantity
        )));
    }
    if input.unit_cost < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "unit cost must not be negative, got {}",
            input.unit_cost
        )));
    }

    let item = InventoryItemEntity::find_by_id(input.item_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Inventory item {} not found", input.item_id))
        })?;

    let balance_before = item.quantity;
    let avg_cost_before = item.average_cost;
    let value_before = item.total_value;

    let (balance_after, avg_cost_after, last_cost) = match input.direction {
        TransactionDirection::In => {
            let balance_after = balance_before + input.quantity;
            let avg_cost_after = costing::compute_cump(
                balance_before,
                avg_cost_before,
                input.quantity,
                input.unit_cost,
            );
            (balance_after, avg_cost_after, input.unit_cost)
        }
        TransactionDirection::Out => {
            let balance_after = balance_before - input.quantity;
            if balance_after < Decimal::ZERO && !input.allow_negative {
                error!(
                    item_id = %item.id,
                    sku = %item.sku,
                    available = %balance_before,
                    requested = %input.quantity,
                    "outbound movement rejected"
                );
                return Err(ServiceError::InsufficientStock(format!(
                    "item {}: available {}, requested {}",
                    item.sku, balance_before, input.quantity
                )));
            }
            // Outbound movements never shift the average.
            (balance_after, avg_cost_before, item.last_cost)
        }
    };

    let value_after = costing::stock_value(balance_after, avg_cost_after);

    let transaction = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item.id),
        transaction_type: Set(input.transaction_type),
        direction: Set(input.direction),
        quantity: Set(input.quantity),
        unit_cost: Set(input.unit_cost),
        balance_before: Set(balance_before),
        balance_after: Set(balance_after),
        value_before: Set(value_before),
        value_after: Set(value_after),
        avg_cost_before: Set(avg_cost_before),
        avg_cost_after: Set(avg_cost_after),
        reference_type: Set(input.reference_type),
        reference_id: Set(input.reference_id),
        actor: Set(input.actor),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    let mut item_update: inventory_item::ActiveModel = item.into();
    item_update.quantity = Set(balance_after);
    item_update.average_cost = Set(avg_cost_after);
    item_update.last_cost = Set(last_cost);
    item_update.total_value = Set(value_after);
    let item = item_update
        .update(conn)
        .await
        .map_err(ServiceError::db_error)?;

    LEDGER_TRANSACTIONS
        .with_label_values(&[
            input.transaction_type.as_str(),
            input.direction.as_str(),
        ])
        .inc();

    info!(
        transaction_id = %transaction.id,
        item_id = %item.id,
        transaction_type = input.transaction_type.as_str(),
        direction = input.direction.as_str(),
        quantity = %transaction.quantity,
        balance_after = %balance_after,
        avg_cost_after = %avg_cost_after,
        "ledger transaction recorded"
    );

    Ok(RecordedTransaction { transaction, item })
}

/// Post-commit notifications for a recorded movement: the transaction
/// audit event, plus a low-stock alert when an outbound write left the
/// item at or below its reorder point.
pub async fn notify_recorded(event_sender: &EventSender, recorded: &RecordedTransaction) {
    event_sender
        .send_or_log(Event::TransactionRecorded {
            transaction_id: recorded.transaction.id,
            item_id: recorded.item.id,
            transaction_type: recorded.transaction.transaction_type.as_str().to_string(),
            direction: recorded.transaction.direction.as_str().to_string(),
            quantity: recorded.transaction.quantity,
            balance_after: recorded.transaction.balance_after,
            actor: recorded.transaction.actor.clone(),
        })
        .await;

    if recorded.transaction.direction == TransactionDirection::Out && recorded.item.is_low_stock() {
        if let Some(reorder_point) = recorded.item.reorder_point {
            event_sender
                .send_or_log(Event::LowStockDetected {
                    item_id: recorded.item.id,
                    sku: recorded.item.sku.clone(),
                    quantity: recorded.item.quantity,
                    reorder_point,
                })
                .await;
        }
    }
}

/// A bill-of-material line referencing an item, with its batch context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomUsage {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub batch_status: BatchStatus,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
}

/// Item snapshot plus its full movement history and BOM usages.
#[derive(Debug, Clone)]
pub struct ItemDetail {
    pub item: inventory_item::Model,
    /// Newest first.
    pub transactions: Vec<inventory_transaction::Model>,
    pub bom_usages: Vec<BomUsage>,
}

/// Filters for the global ledger listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub item_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub direction: Option<TransactionDirection>,
}

/// Read-side access to the ledger.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DatabaseConnection>,
}

impl LedgerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Item plus movement history (newest first) and the BOM lines that
    /// reference it, each with its batch number and status.
    #[instrument(skip(self))]
    pub async fn get_detail(&self, item_id: Uuid) -> Result<ItemDetail, ServiceError> {
        let db = &*self.db;

        let item = InventoryItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        let transactions = InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ItemId.eq(item_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .order_by_desc(inventory_transaction::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let bom_usages = BomLineEntity::find()
            .filter(bom_line::Column::ItemId.eq(item_id))
            .find_also_related(crate::entities::production_batch::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .filter_map(|(line, batch)| {
                batch.map(|batch| BomUsage {
                    batch_id: batch.id,
                    batch_number: batch.batch_number,
                    batch_status: batch.status,
                    quantity_per_unit: line.quantity_per_unit,
                    waste_factor: line.waste_factor,
                })
            })
            .collect();

        Ok(ItemDetail {
            item,
            transactions,
            bom_usages,
        })
    }

    /// Transaction history for one item, newest first.
    #[instrument(skip(self))]
    pub async fn list_item_transactions(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        let db = &*self.db;

        // Surface a 404 rather than an empty history for unknown ids.
        InventoryItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ItemId.eq(item_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .order_by_desc(inventory_transaction::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Global ledger listing with optional filters, newest first.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_transaction::Model>, u64), ServiceError> {
        let db = &*self.db;

        let mut query = InventoryTransactionEntity::find();
        if let Some(item_id) = filter.item_id {
            query = query.filter(inventory_transaction::Column::ItemId.eq(item_id));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(inventory_transaction::Column::TransactionType.eq(transaction_type));
        }
        if let Some(direction) = filter.direction {
            query = query.filter(inventory_transaction::Column::Direction.eq(direction));
        }

        let paginator = query
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .order_by_desc(inventory_transaction::Column::Id)
            .paginate(db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let transactions = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((transactions, total))
    }
}
