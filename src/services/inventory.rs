//! Item master lifecycle and read-side stock reports.
//!
//! Items are created once and never physically deleted; quantity, cost and
//! value fields only ever change through the ledger primitive in
//! `services::ledger`.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::Iterable;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entities::inventory_item::{self, Entity as InventoryItemEntity, ItemType, UnitOfMeasure},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub sku: String,
    pub name: String,
    pub item_type: ItemType,
    pub unit: UnitOfMeasure,
    pub reorder_point: Option<Decimal>,
}

/// Filters for the item listing.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub is_active: Option<bool>,
    pub low_stock_only: bool,
}

/// Valuation of one item-type bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRow {
    pub item_type: ItemType,
    pub item_count: u64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

/// Stock valuation report: totals by item type plus the grand total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub rows: Vec<ValuationRow>,
    pub grand_total: Decimal,
}

/// Service for managing inventory items
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new item with zero stock. Opening balances enter through
    /// an adjustment so the ledger stays complete from day one.
    #[instrument(skip(self))]
    pub async fn create_item(
        &self,
        input: CreateItemInput,
    ) -> Result<inventory_item::Model, ServiceError> {
        let sku = input.sku.trim().to_string();
        if sku.is_empty() {
            return Err(ServiceError::ValidationError("sku must not be empty".into()));
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "name must not be empty".into(),
            ));
        }
        if let Some(reorder_point) = input.reorder_point {
            if reorder_point < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "reorder_point must not be negative".into(),
                ));
            }
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let existing = InventoryItemEntity::find()
            .filter(inventory_item::Column::Sku.eq(sku.clone()))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::DuplicateSku(sku));
        }

        let item = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(name),
            item_type: Set(input.item_type),
            unit: Set(input.unit),
            quantity: Set(Decimal::ZERO),
            average_cost: Set(Decimal::ZERO),
            last_cost: Set(Decimal::ZERO),
            total_value: Set(Decimal::ZERO),
            reorder_point: Set(input.reorder_point),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::ItemCreated {
                item_id: item.id,
                sku: item.sku.clone(),
            })
            .await;

        info!(item_id = %item.id, sku = %item.sku, "inventory item created");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))
    }

    /// Paginated item listing, filtered by type, active flag, and the
    /// low-stock condition (`quantity <= reorder_point`).
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        filter: ItemFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        let mut query = InventoryItemEntity::find();
        if let Some(item_type) = filter.item_type {
            query = query.filter(inventory_item::Column::ItemType.eq(item_type));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(inventory_item::Column::IsActive.eq(is_active));
        }
        if filter.low_stock_only {
            query = query
                .filter(inventory_item::Column::ReorderPoint.is_not_null())
                .filter(
                    Expr::col(inventory_item::Column::Quantity)
                        .lte(Expr::col(inventory_item::Column::ReorderPoint)),
                );
        }

        let paginator = query
            .order_by_asc(inventory_item::Column::Sku)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Active items at or below their reorder point.
    #[instrument(skip(self))]
    pub async fn low_stock_report(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItemEntity::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(inventory_item::Column::ReorderPoint.is_not_null())
            .filter(
                Expr::col(inventory_item::Column::Quantity)
                    .lte(Expr::col(inventory_item::Column::ReorderPoint)),
            )
            .order_by_asc(inventory_item::Column::Sku)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Sums active stock value per item type. A simple full-scan fold;
    /// item counts here are small.
    #[instrument(skip(self))]
    pub async fn valuation(&self) -> Result<ValuationReport, ServiceError> {
        let items = InventoryItemEntity::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut rows: Vec<ValuationRow> = ItemType::iter()
            .map(|item_type| ValuationRow {
                item_type,
                item_count: 0,
                total_quantity: Decimal::ZERO,
                total_value: Decimal::ZERO,
            })
            .collect();

        let mut grand_total = Decimal::ZERO;
        for item in &items {
            if let Some(row) = rows.iter_mut().find(|row| row.item_type == item.item_type) {
                row.item_count += 1;
                row.total_quantity += item.quantity;
                row.total_value += item.total_value;
            }
            grand_total += item.total_value;
        }

        Ok(ValuationReport { rows, grand_total })
    }

    /// Flips the item inactive. Stock and history stay untouched; a
    /// deactivated item simply stops appearing in active reports.
    #[instrument(skip(self))]
    pub async fn deactivate_item(
        &self,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self.get_item(item_id).await?;
        if !item.is_active {
            return Ok(item);
        }

        let mut update: inventory_item::ActiveModel = item.into();
        update.is_active = Set(false);
        let item = update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::ItemDeactivated(item.id))
            .await;
        info!(item_id = %item.id, sku = %item.sku, "inventory item deactivated");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn activate_item(
        &self,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self.get_item(item_id).await?;
        if item.is_active {
            return Ok(item);
        }

        let mut update: inventory_item::ActiveModel = item.into();
        update.is_active = Set(true);
        let item = update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::ItemActivated(item.id))
            .await;
        info!(item_id = %item.id, sku = %item.sku, "inventory item activated");
        Ok(item)
    }
}
