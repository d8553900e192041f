//! Production batches: BOM capture, requirement math, material
//! consumption and completion costing.
//!
//! A batch is PLANNED with its bill of materials frozen as rows, consumes
//! materials atomically when it starts (one PRODUCTION_OUT ledger entry
//! plus one consumption record per line, priced at the average cost in
//! effect at that moment), and rolls its costs up at completion. If the
//! batch feeds a stocked finished-goods item, completion posts a
//! PRODUCTION_IN entry so the output blends into that item's average cost
//! exactly like a purchase receipt.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        batch_consumption::{self, Entity as BatchConsumptionEntity},
        bom_line::{self, Entity as BomLineEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        inventory_transaction::{TransactionDirection, TransactionType},
        production_batch::{self, BatchStatus, Entity as ProductionBatchEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{BATCHES_COMPLETED, BATCHES_STARTED, SERVICE_DURATION},
    services::ledger::{self, RecordTransactionInput, RecordedTransaction},
};

pub const BATCH_NUMBER_PREFIX: &str = "BATCH";

#[derive(Debug, Clone)]
pub struct CreateBatchLine {
    pub item_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateBatchInput {
    /// Finished-goods item credited at completion, when the output is
    /// stocked.
    pub output_item_id: Option<Uuid>,
    pub planned_quantity: Decimal,
    pub bom_lines: Vec<CreateBatchLine>,
    pub labor_cost: Decimal,
    pub overhead_cost: Decimal,
    pub other_cost_per_unit: Decimal,
    pub notes: Option<String>,
    pub created_by: String,
}

/// Requirement for one BOM line against live stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRequirement {
    pub item_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_per_unit: Decimal,
    pub waste_factor: Decimal,
    pub required: Decimal,
    pub available: Decimal,
    pub shortage: Decimal,
    pub can_consume: bool,
    /// Current average cost, the rate consumption would be valued at.
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// Materials check for one batch: line requirements plus the roll-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsReport {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub status: BatchStatus,
    pub planned_quantity: Decimal,
    pub lines: Vec<LineRequirement>,
    pub has_shortage: bool,
    pub can_proceed: bool,
    pub total_materials_cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct BatchDetail {
    pub batch: production_batch::Model,
    pub bom_lines: Vec<bom_line::Model>,
    pub consumptions: Vec<batch_consumption::Model>,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub batch: production_batch::Model,
    pub consumptions: Vec<batch_consumption::Model>,
    pub transactions: Vec<RecordedTransaction>,
}

#[derive(Debug, Clone)]
pub struct CompleteOutcome {
    pub batch: production_batch::Model,
    pub output_transaction: Option<RecordedTransaction>,
}

/// Theoretical material requirement for one line:
/// `quantity_per_unit * waste_factor * planned_quantity`.
pub fn required_quantity(
    quantity_per_unit: Decimal,
    waste_factor: Decimal,
    planned_quantity: Decimal,
) -> Decimal {
    quantity_per_unit * waste_factor * planned_quantity
}

/// Requirement line against a known availability and valuation rate. Pure;
/// a zero planned quantity yields an all-zero line rather than an error.
pub fn line_requirement(
    line: &bom_line::Model,
    item: &inventory_item::Model,
    planned_quantity: Decimal,
) -> LineRequirement {
    let required = required_quantity(line.quantity_per_unit, line.waste_factor, planned_quantity);
    let shortage = (required - item.quantity).max(Decimal::ZERO);
    LineRequirement {
        item_id: item.id,
        sku: item.sku.clone(),
        name: item.name.clone(),
        quantity_per_unit: line.quantity_per_unit,
        waste_factor: line.waste_factor,
        required,
        available: item.quantity,
        shortage,
        can_consume: shortage.is_zero(),
        unit_cost: item.average_cost,
        total_cost: required * item.average_cost,
    }
}

/// Service owning the production batch lifecycle.
#[derive(Clone)]
pub struct ProductionService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    /// Multiplier on planned quantity bounding produced + waste at
    /// completion.
    overrun_tolerance: Decimal,
}

impl ProductionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        overrun_tolerance: Decimal,
    ) -> Self {
        Self {
            db,
            event_sender,
            overrun_tolerance,
        }
    }

    /// Creates a PLANNED batch with its bill of materials captured as
    /// rows. Nothing moves on the ledger until the batch starts.
    #[instrument(skip(self, input))]
    pub async fn create_batch(&self, input: CreateBatchInput) -> Result<BatchDetail, ServiceError> {
        if input.planned_quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "planned quantity must be positive, got {}",
                input.planned_quantity
            )));
        }
        if input.bom_lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "batch must have at least one bill-of-material line".into(),
            ));
        }
        for line in &input.bom_lines {
            if line.quantity_per_unit <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "quantity_per_unit must be positive for item {}",
                    line.item_id
                )));
            }
            if line.waste_factor < Decimal::ONE {
                return Err(ServiceError::ValidationError(format!(
                    "waste_factor must be at least 1.0 for item {}",
                    line.item_id
                )));
            }
        }
        for amount in [
            input.labor_cost,
            input.overhead_cost,
            input.other_cost_per_unit,
        ] {
            if amount < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "labor, overhead and other costs must not be negative".into(),
                ));
            }
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        for line in &input.bom_lines {
            InventoryItemEntity::find_by_id(line.item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", line.item_id))
                })?;
        }
        if let Some(output_item_id) = input.output_item_id {
            InventoryItemEntity::find_by_id(output_item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Output item {} not found",
                        output_item_id
                    ))
                })?;
        }

        let batch_number = next_batch_number(&txn).await?;

        let batch = production_batch::ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_number: Set(batch_number),
            output_item_id: Set(input.output_item_id),
            status: Set(BatchStatus::Planned),
            planned_quantity: Set(input.planned_quantity),
            produced_quantity: Set(None),
            waste_quantity: Set(None),
            labor_cost: Set(input.labor_cost),
            overhead_cost: Set(input.overhead_cost),
            other_cost_per_unit: Set(input.other_cost_per_unit),
            materials_cost: Set(None),
            total_cost: Set(None),
            cost_per_unit: Set(None),
            notes: Set(input.notes),
            created_by: Set(input.created_by),
            started_at: Set(None),
            completed_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut bom_lines = Vec::with_capacity(input.bom_lines.len());
        for line in &input.bom_lines {
            let row = bom_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                batch_id: Set(batch.id),
                item_id: Set(line.item_id),
                quantity_per_unit: Set(line.quantity_per_unit),
                waste_factor: Set(line.waste_factor),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            bom_lines.push(row);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::BatchCreated {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
                planned_quantity: batch.planned_quantity,
            })
            .await;

        info!(
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            planned_quantity = %batch.planned_quantity,
            "production batch created"
        );

        Ok(BatchDetail {
            batch,
            bom_lines,
            consumptions: Vec::new(),
        })
    }

    /// Material requirements against live stock, with shortages. Pure
    /// read; repeatable; holds no reservation.
    #[instrument(skip(self))]
    pub async fn preview_consume(&self, batch_id: Uuid) -> Result<RequirementsReport, ServiceError> {
        let db = &*self.db;
        let batch = self.find_batch(batch_id).await?;
        let bom_lines = self.find_bom_lines(db, batch_id).await?;

        let mut lines = Vec::with_capacity(bom_lines.len());
        for line in &bom_lines {
            let item = InventoryItemEntity::find_by_id(line.item_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", line.item_id))
                })?;
            lines.push(line_requirement(line, &item, batch.planned_quantity));
        }

        let has_shortage = lines.iter().any(|line| !line.can_consume);
        let total_materials_cost = lines.iter().map(|line| line.total_cost).sum();

        Ok(RequirementsReport {
            batch_id: batch.id,
            batch_number: batch.batch_number,
            status: batch.status,
            planned_quantity: batch.planned_quantity,
            lines,
            has_shortage,
            can_proceed: !has_shortage && batch.status == BatchStatus::Planned,
            total_materials_cost,
        })
    }

    /// Consumes all materials and moves the batch to IN_PROGRESS, as one
    /// atomic unit. Shortages found under the fresh transaction state
    /// abort the whole start.
    #[instrument(skip(self))]
    pub async fn start_batch(
        &self,
        batch_id: Uuid,
        actor: &str,
    ) -> Result<StartOutcome, ServiceError> {
        let _timer = SERVICE_DURATION
            .with_label_values(&["start_batch"])
            .start_timer();

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let batch = ProductionBatchEntity::find_by_id(batch_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        ensure_transition(&batch, BatchStatus::InProgress)?;

        let bom_lines = self.find_bom_lines(&txn, batch_id).await?;

        // Shortage check aggregates requirements per item so two lines
        // drawing on the same material are counted together.
        let mut required_per_item: HashMap<Uuid, Decimal> = HashMap::new();
        for line in &bom_lines {
            let required = required_quantity(
                line.quantity_per_unit,
                line.waste_factor,
                batch.planned_quantity,
            );
            *required_per_item.entry(line.item_id).or_default() += required;
        }

        let mut shortages = Vec::new();
        for (item_id, required) in &required_per_item {
            let item = InventoryItemEntity::find_by_id(*item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", item_id))
                })?;
            if item.quantity < *required {
                shortages.push(format!(
                    "{}: required {}, available {}",
                    item.sku, required, item.quantity
                ));
            }
        }
        if !shortages.is_empty() {
            shortages.sort();
            warn!(
                batch_id = %batch.id,
                batch_number = %batch.batch_number,
                "batch start aborted on shortage"
            );
            return Err(ServiceError::InsufficientStock(shortages.join("; ")));
        }

        let mut transactions = Vec::with_capacity(bom_lines.len());
        let mut consumptions = Vec::with_capacity(bom_lines.len());
        let mut materials_cost = Decimal::ZERO;

        for line in &bom_lines {
            let required = required_quantity(
                line.quantity_per_unit,
                line.waste_factor,
                batch.planned_quantity,
            );

            let recorded = ledger::record_transaction(
                &txn,
                RecordTransactionInput {
                    item_id: line.item_id,
                    transaction_type: TransactionType::ProductionOut,
                    direction: TransactionDirection::Out,
                    quantity: required,
                    // Consumption is valued at the average in effect now.
                    unit_cost: fetch_average_cost(&txn, line.item_id).await?,
                    reference_type: Some("batch".to_string()),
                    reference_id: Some(batch.id),
                    actor: actor.to_string(),
                    allow_negative: false,
                },
            )
            .await?;

            let total_cost = recorded.transaction.quantity * recorded.transaction.unit_cost;
            materials_cost += total_cost;

            let consumption = batch_consumption::ActiveModel {
                id: Set(Uuid::new_v4()),
                batch_id: Set(batch.id),
                item_id: Set(line.item_id),
                quantity: Set(recorded.transaction.quantity),
                unit_cost: Set(recorded.transaction.unit_cost),
                total_cost: Set(total_cost),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

            consumptions.push(consumption);
            transactions.push(recorded);
        }

        let mut update: production_batch::ActiveModel = batch.into();
        update.status = Set(BatchStatus::InProgress);
        update.materials_cost = Set(Some(materials_cost));
        update.started_at = Set(Some(Utc::now()));
        let batch = update.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        BATCHES_STARTED.inc();
        for recorded in &transactions {
            ledger::notify_recorded(&self.event_sender, recorded).await;
        }
        self.event_sender
            .send_or_log(Event::BatchStarted {
                batch_id: batch.id,
                materials_cost,
                actor: actor.to_string(),
            })
            .await;

        info!(
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            materials_cost = %materials_cost,
            lines = consumptions.len(),
            "production batch started"
        );

        Ok(StartOutcome {
            batch,
            consumptions,
            transactions,
        })
    }

    /// Closes an IN_PROGRESS batch: checks the overrun tolerance, rolls up
    /// costs, and credits the output item when the batch feeds one.
    #[instrument(skip(self))]
    pub async fn complete_batch(
        &self,
        batch_id: Uuid,
        produced_quantity: Decimal,
        waste_quantity: Decimal,
        actor: &str,
    ) -> Result<CompleteOutcome, ServiceError> {
        let _timer = SERVICE_DURATION
            .with_label_values(&["complete_batch"])
            .start_timer();

        if produced_quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "produced quantity must be positive, got {}",
                produced_quantity
            )));
        }
        if waste_quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "waste quantity must not be negative, got {}",
                waste_quantity
            )));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let batch = ProductionBatchEntity::find_by_id(batch_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        ensure_transition(&batch, BatchStatus::Completed)?;

        let allowed = batch.planned_quantity * self.overrun_tolerance;
        if produced_quantity + waste_quantity > allowed {
            return Err(ServiceError::ExceedsTolerance(format!(
                "batch {}: produced {} + waste {} exceeds allowed {} (planned {} x tolerance {})",
                batch.batch_number,
                produced_quantity,
                waste_quantity,
                allowed,
                batch.planned_quantity,
                self.overrun_tolerance
            )));
        }

        let materials_cost = batch.materials_cost.unwrap_or(Decimal::ZERO);
        let total_cost = materials_cost
            + batch.labor_cost
            + batch.overhead_cost
            + batch.other_cost_per_unit * produced_quantity;
        let cost_per_unit = total_cost / produced_quantity;

        let output_transaction = match batch.output_item_id {
            Some(output_item_id) => Some(
                ledger::record_transaction(
                    &txn,
                    RecordTransactionInput {
                        item_id: output_item_id,
                        transaction_type: TransactionType::ProductionIn,
                        direction: TransactionDirection::In,
                        quantity: produced_quantity,
                        unit_cost: cost_per_unit,
                        reference_type: Some("batch".to_string()),
                        reference_id: Some(batch.id),
                        actor: actor.to_string(),
                        allow_negative: false,
                    },
                )
                .await?,
            ),
            None => None,
        };

        let batch_number = batch.batch_number.clone();
        let mut update: production_batch::ActiveModel = batch.into();
        update.status = Set(BatchStatus::Completed);
        update.produced_quantity = Set(Some(produced_quantity));
        update.waste_quantity = Set(Some(waste_quantity));
        update.total_cost = Set(Some(total_cost));
        update.cost_per_unit = Set(Some(cost_per_unit));
        update.completed_at = Set(Some(Utc::now()));
        let batch = update.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        BATCHES_COMPLETED.inc();
        if let Some(recorded) = &output_transaction {
            ledger::notify_recorded(&self.event_sender, recorded).await;
        }
        self.event_sender
            .send_or_log(Event::BatchCompleted {
                batch_id: batch.id,
                produced_quantity,
                cost_per_unit,
                actor: actor.to_string(),
            })
            .await;

        info!(
            batch_id = %batch.id,
            batch_number = %batch_number,
            produced_quantity = %produced_quantity,
            waste_quantity = %waste_quantity,
            total_cost = %total_cost,
            cost_per_unit = %cost_per_unit,
            "production batch completed"
        );

        Ok(CompleteOutcome {
            batch,
            output_transaction,
        })
    }

    /// IN_PROGRESS -> ON_HOLD. No inventory side effects.
    #[instrument(skip(self))]
    pub async fn hold_batch(
        &self,
        batch_id: Uuid,
        actor: &str,
    ) -> Result<production_batch::Model, ServiceError> {
        let batch = self
            .transition_batch(batch_id, BatchStatus::OnHold)
            .await?;
        self.event_sender
            .send_or_log(Event::BatchHeld {
                batch_id: batch.id,
                actor: actor.to_string(),
            })
            .await;
        info!(batch_id = %batch.id, batch_number = %batch.batch_number, "batch put on hold");
        Ok(batch)
    }

    /// ON_HOLD -> IN_PROGRESS. No inventory side effects.
    #[instrument(skip(self))]
    pub async fn resume_batch(
        &self,
        batch_id: Uuid,
        actor: &str,
    ) -> Result<production_batch::Model, ServiceError> {
        let batch = self
            .transition_batch(batch_id, BatchStatus::InProgress)
            .await?;
        self.event_sender
            .send_or_log(Event::BatchResumed {
                batch_id: batch.id,
                actor: actor.to_string(),
            })
            .await;
        info!(batch_id = %batch.id, batch_number = %batch.batch_number, "batch resumed");
        Ok(batch)
    }

    /// PLANNED/ON_HOLD -> CANCELLED. Materials already consumed stay
    /// consumed; recovery is a manual adjustment, never an automatic
    /// reversal.
    #[instrument(skip(self))]
    pub async fn cancel_batch(
        &self,
        batch_id: Uuid,
        actor: &str,
    ) -> Result<production_batch::Model, ServiceError> {
        let old_status = self.find_batch(batch_id).await?.status;
        let batch = self
            .transition_batch(batch_id, BatchStatus::Cancelled)
            .await?;
        self.event_sender
            .send_or_log(Event::BatchCancelled {
                batch_id: batch.id,
                old_status: old_status.as_str().to_string(),
                actor: actor.to_string(),
            })
            .await;
        info!(batch_id = %batch.id, batch_number = %batch.batch_number, "batch cancelled");
        Ok(batch)
    }

    #[instrument(skip(self))]
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<BatchDetail, ServiceError> {
        let db = &*self.db;
        let batch = self.find_batch(batch_id).await?;
        let bom_lines = self.find_bom_lines(db, batch_id).await?;
        let consumptions = BatchConsumptionEntity::find()
            .filter(batch_consumption::Column::BatchId.eq(batch_id))
            .order_by_asc(batch_consumption::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(BatchDetail {
            batch,
            bom_lines,
            consumptions,
        })
    }

    /// Paginated listing, newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        status: Option<BatchStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<production_batch::Model>, u64), ServiceError> {
        let mut query = ProductionBatchEntity::find();
        if let Some(status) = status {
            query = query.filter(production_batch::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(production_batch::Column::CreatedAt)
            .order_by_desc(production_batch::Column::BatchNumber)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let batches = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((batches, total))
    }

    async fn find_batch(&self, batch_id: Uuid) -> Result<production_batch::Model, ServiceError> {
        ProductionBatchEntity::find_by_id(batch_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
    }

    async fn find_bom_lines<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        batch_id: Uuid,
    ) -> Result<Vec<bom_line::Model>, ServiceError> {
        BomLineEntity::find()
            .filter(bom_line::Column::BatchId.eq(batch_id))
            .order_by_asc(bom_line::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn transition_batch(
        &self,
        batch_id: Uuid,
        next: BatchStatus,
    ) -> Result<production_batch::Model, ServiceError> {
        let batch = self.find_batch(batch_id).await?;
        ensure_transition(&batch, next)?;

        let mut update: production_batch::ActiveModel = batch.into();
        update.status = Set(next);
        update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

fn ensure_transition(
    batch: &production_batch::Model,
    next: BatchStatus,
) -> Result<(), ServiceError> {
    if batch.status.is_terminal() {
        return Err(ServiceError::AlreadyCompleted(format!(
            "batch {} is {}",
            batch.batch_number,
            batch.status.as_str()
        )));
    }
    if !batch.status.can_transition_to(next) {
        return Err(ServiceError::InvalidTransition(format!(
            "batch {} cannot move from {} to {}",
            batch.batch_number,
            batch.status.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}

async fn fetch_average_cost<C: sea_orm::ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let item = InventoryItemEntity::find_by_id(item_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))?;
    Ok(item.average_cost)
}

/// Next period-scoped document number, e.g. `BATCH-202508-0007`.
async fn next_batch_number<C: sea_orm::ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    let period = super::document_period(Utc::now());
    let prefix = format!("{}-{}-", BATCH_NUMBER_PREFIX, period);
    let count = ProductionBatchEntity::find()
        .filter(production_batch::Column::BatchNumber.starts_with(prefix.as_str()))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(super::document_number(BATCH_NUMBER_PREFIX, &period, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bom_line_fixture(quantity_per_unit: Decimal, waste_factor: Decimal) -> bom_line::Model {
        bom_line::Model {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            quantity_per_unit,
            waste_factor,
            created_at: Utc::now(),
        }
    }

    fn item_fixture(quantity: Decimal, average_cost: Decimal) -> inventory_item::Model {
        inventory_item::Model {
            id: Uuid::new_v4(),
            sku: "FLOUR-01".into(),
            name: "Wheat flour".into(),
            item_type: crate::entities::inventory_item::ItemType::RawMaterial,
            unit: crate::entities::inventory_item::UnitOfMeasure::Kg,
            quantity,
            average_cost,
            last_cost: average_cost,
            total_value: quantity * average_cost,
            reorder_point: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn requirement_applies_waste_factor() {
        // 2.5 per unit, 5% waste, 200 planned -> 525 required of 500
        // available: 25 short.
        let line = bom_line_fixture(dec!(2.5), dec!(1.05));
        let item = item_fixture(dec!(500), dec!(4));

        let req = line_requirement(&line, &item, dec!(200));
        assert_eq!(req.required, dec!(525));
        assert_eq!(req.shortage, dec!(25));
        assert!(!req.can_consume);
        assert_eq!(req.total_cost, dec!(2100));
    }

    #[test]
    fn requirement_with_sufficient_stock_has_no_shortage() {
        let line = bom_line_fixture(dec!(2), dec!(1));
        let item = item_fixture(dec!(400), dec!(3.5));

        let req = line_requirement(&line, &item, dec!(200));
        assert_eq!(req.required, dec!(400));
        assert_eq!(req.shortage, dec!(0));
        assert!(req.can_consume);
    }

    #[test]
    fn zero_planned_quantity_yields_zero_lines() {
        let line = bom_line_fixture(dec!(2.5), dec!(1.05));
        let item = item_fixture(dec!(500), dec!(4));

        let req = line_requirement(&line, &item, Decimal::ZERO);
        assert_eq!(req.required, dec!(0));
        assert_eq!(req.shortage, dec!(0));
        assert!(req.can_consume);
        assert_eq!(req.total_cost, dec!(0));
    }

    #[test]
    fn required_quantity_multiplies_through() {
        assert_eq!(required_quantity(dec!(2.5), dec!(1.05), dec!(200)), dec!(525));
        assert_eq!(required_quantity(dec!(1), dec!(1), dec!(7)), dec!(7));
    }
}
