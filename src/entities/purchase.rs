use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Purchase document lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Draft => "draft",
            PurchaseStatus::Ordered => "ordered",
            PurchaseStatus::Partial => "partial",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    /// Single source of truth for legal status transitions
    pub fn can_transition_to(self, next: PurchaseStatus) -> bool {
        use PurchaseStatus::*;
        matches!(
            (self, next),
            (Draft, Ordered)
                | (Draft, Cancelled)
                | (Ordered, Partial)
                | (Ordered, Received)
                | (Ordered, Cancelled)
                | (Partial, Received)
        )
    }

    /// Statuses from which goods may still be received
    pub fn is_receivable(self) -> bool {
        matches!(self, PurchaseStatus::Ordered | PurchaseStatus::Partial)
    }

    /// Terminal statuses never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, PurchaseStatus::Received | PurchaseStatus::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Sequential document number, e.g. PO-202508-0042
    pub purchase_number: String,

    pub supplier_id: Uuid,

    /// Supplier display name captured at creation time
    pub supplier_name: String,

    pub status: PurchaseStatus,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub subtotal: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub tax: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub shipping_cost: Decimal,

    /// Supplier advance already paid and deducted from the total
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub advance_applied: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub total: Decimal,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_by: String,

    pub ordered_at: Option<DateTime<Utc>>,

    /// Set once when the purchase becomes fully received
    pub received_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_item::Entity")]
    PurchaseItems,
}

impl Related<super::purchase_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseItems.def()
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

#[cfg(test)]
mod transition_tests {
    use super::PurchaseStatus::{self, *};
    use test_case::test_case;

    #[test_case(Draft, Ordered, true; "draft to ordered")]
    #[test_case(Draft, Cancelled, true; "draft to cancelled")]
    #[test_case(Ordered, Partial, true; "ordered to partial")]
    #[test_case(Ordered, Received, true; "ordered to received")]
    #[test_case(Ordered, Cancelled, true; "ordered to cancelled")]
    #[test_case(Partial, Received, true; "partial to received")]
    #[test_case(Draft, Received, false; "draft cannot skip to received")]
    #[test_case(Draft, Partial, false; "draft cannot skip to partial")]
    #[test_case(Partial, Cancelled, false; "partial cannot cancel")]
    #[test_case(Received, Cancelled, false; "received is terminal")]
    #[test_case(Cancelled, Ordered, false; "cancelled is terminal")]
    #[test_case(Received, Ordered, false; "no reopening")]
    fn transition_table(from: PurchaseStatus, to: PurchaseStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn receivable_statuses() {
        assert!(Ordered.is_receivable());
        assert!(Partial.is_receivable());
        assert!(!Draft.is_receivable());
        assert!(!Received.is_receivable());
        assert!(!Cancelled.is_receivable());
    }
}
