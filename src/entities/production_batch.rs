use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Production batch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Planned => "planned",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::OnHold => "on_hold",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    /// Single source of truth for legal status transitions
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress)
                | (Planned, Cancelled)
                | (InProgress, Completed)
                | (InProgress, OnHold)
                | (OnHold, InProgress)
                | (OnHold, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }
}

/// A production run: planned quantity, bill-of-material lines captured at
/// creation, and the cost roll-up filled in as the batch moves through its
/// lifecycle.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Sequential document number, e.g. BATCH-202508-0007
    pub batch_number: String,

    /// Finished-goods item credited on completion, when the output is stocked
    pub output_item_id: Option<Uuid>,

    pub status: BatchStatus,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub planned_quantity: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub produced_quantity: Option<Decimal>,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub waste_quantity: Option<Decimal>,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub labor_cost: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub overhead_cost: Decimal,

    /// Per-unit surcharge applied to produced quantity at completion
    #[sea_orm(column_type = "Decimal(Some((19, 6)))")]
    pub other_cost_per_unit: Decimal,

    /// Sum of consumption costs, fixed when the batch starts
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub materials_cost: Option<Decimal>,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub total_cost: Option<Decimal>,

    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub cost_per_unit: Option<Decimal>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_by: String,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bom_line::Entity")]
    BomLines,
    #[sea_orm(has_many = "super::batch_consumption::Entity")]
    BatchConsumptions,
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::OutputItemId",
        to = "super::inventory_item::Column::Id"
    )]
    OutputItem,
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

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutputItem.def()
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
    use super::BatchStatus::{self, *};
    use test_case::test_case;

    #[test_case(Planned, InProgress, true; "planned to in progress")]
    #[test_case(Planned, Cancelled, true; "planned to cancelled")]
    #[test_case(InProgress, Completed, true; "in progress to completed")]
    #[test_case(InProgress, OnHold, true; "in progress to on hold")]
    #[test_case(OnHold, InProgress, true; "resume from hold")]
    #[test_case(OnHold, Cancelled, true; "cancel from hold")]
    #[test_case(Planned, Completed, false; "planned cannot skip to completed")]
    #[test_case(InProgress, Cancelled, false; "in progress cannot cancel directly")]
    #[test_case(Completed, InProgress, false; "completed is terminal")]
    #[test_case(Cancelled, Planned, false; "cancelled is terminal")]
    #[test_case(OnHold, Completed, false; "on hold cannot complete")]
    fn transition_table(from: BatchStatus, to: BatchStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
