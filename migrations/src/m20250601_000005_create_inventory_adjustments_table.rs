use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_inventory_items_table::InventoryItems;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryAdjustments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryAdjustments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::ItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::AdjustmentKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::Quantity)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::AppliedDelta)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::Reason)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::AllowNegative)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::TransactionId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAdjustments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_adjustments_item_id")
                            .from(
                                InventoryAdjustments::Table,
                                InventoryAdjustments::ItemId,
                            )
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(InventoryAdjustments::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum InventoryAdjustments {
    Table,
    Id,
    ItemId,
    AdjustmentKind,
    Quantity,
    AppliedDelta,
    Reason,
    AllowNegative,
    TransactionId,
    CreatedBy,
    CreatedAt,
}
