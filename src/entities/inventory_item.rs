use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Classification of a stocked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[sea_orm(string_value = "raw_material")]
    RawMaterial,
    #[sea_orm(string_value = "finished_good")]
    FinishedGood,
    #[sea_orm(string_value = "packaging")]
    Packaging,
    #[sea_orm(string_value = "consumable")]
    Consumable,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::RawMaterial => "raw_material",
            ItemType::FinishedGood => "finished_good",
            ItemType::Packaging => "packaging",
            ItemType::Consumable => "consumable",
        }
    }
}

/// Unit of measure for item quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    #[sea_orm(string_value = "piece")]
    Piece,
    #[sea_orm(string_value = "kg")]
    Kg,
    #[sea_orm(string_value = "g")]
    G,
    #[sea_orm(string_value = "l")]
    L,
    #[sea_orm(string_value = "ml")]
    Ml,
    #[sea_orm(string_value = "m")]
    M,
    #[sea_orm(string_value = "m2")]
    M2,
    #[sea_orm(string_value = "box")]
    Box,
    #[sea_orm(string_value = "roll")]
    Roll,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::G => "g",
            UnitOfMeasure::L => "l",
            UnitOfMeasure::Ml => "ml",
            UnitOfMeasure::M => "m",
            UnitOfMeasure::M2 => "m2",
            UnitOfMeasure::Box => "box",
            UnitOfMeasure::Roll => "roll",
        }
    }
}

/// Inventory item snapshot: current quantity, moving-average cost and
/// total stock value. The row is the denormalized head of the ledger;
/// `inventory_transactions` holds the full history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique per item
    pub sku: String,

    pub name: String,

    pub item_type: ItemType,

    pub unit: UnitOfMeasure,

    /// Current on-hand quantity
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,

    /// Weighted moving-average unit cost
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub average_cost: Decimal,

    /// Unit cost of the most recent inbound movement
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub last_cost: Decimal,

    /// quantity * average_cost, maintained alongside every movement
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub total_value: Decimal,

    /// Quantity threshold below which the item counts as low stock
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub reorder_point: Option<Decimal>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransactions,
    #[sea_orm(has_many = "super::bom_line::Entity")]
    BomLines,
    #[sea_orm(has_many = "super::batch_consumption::Entity")]
    BatchConsumptions,
    #[sea_orm(has_many = "super::purchase_item::Entity")]
    PurchaseItems,
    #[sea_orm(has_many = "super::inventory_adjustment::Entity")]
    InventoryAdjustments,
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::bom_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomLines.def()
    }
}

impl Related<super::batch_consumption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchConsumptions.def()
    }
}

impl Related<super::purchase_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseItems.def()
    }
}

impl Related<super::inventory_adjustment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryAdjustments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}

impl Model {
    /// True when a reorder point is set and on-hand quantity is at or below it
    pub fn is_low_stock(&self) -> bool {
        self.reorder_point
            .map(|threshold| self.quantity <= threshold)
            .unwrap_or(false)
    }
}
