use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Business origin of a ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "production_in")]
    ProductionIn,
    #[sea_orm(string_value = "production_out")]
    ProductionOut,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "return")]
    Return,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::ProductionIn => "production_in",
            TransactionType::ProductionOut => "production_out",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Return => "return",
            TransactionType::Transfer => "transfer",
        }
    }
}

/// Whether a movement increases or decreases stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    #[sea_orm(string_value = "in")]
    In,
    #[sea_orm(string_value = "out")]
    Out,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::In => "in",
            TransactionDirection::Out => "out",
        }
    }
}

/// One append-only ledger row. Every stock movement stores the item's
/// quantity, value and average cost both before and after the write, so
/// the history alone can reproduce any point-in-time balance.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub item_id: Uuid,

    pub transaction_type: TransactionType,

    pub direction: TransactionDirection,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,

    /// Unit cost applied to this movement
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub unit_cost: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_before: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_after: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub value_before: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub value_after: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub avg_cost_before: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub avg_cost_after: Decimal,

    /// Kind of source document (e.g. "purchase", "batch", "adjustment")
    pub reference_type: Option<String>,

    /// Id of the source document
    pub reference_id: Option<Uuid>,

    /// Acting user identity
    pub actor: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
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
        Ok(active_model)
    }
}

impl Model {
    /// Quantity with its ledger sign (positive inbound, negative outbound)
    pub fn signed_quantity(&self) -> Decimal {
        match self.direction {
            TransactionDirection::In => self.quantity,
            TransactionDirection::Out => -self.quantity,
        }
    }
}
