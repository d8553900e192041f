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
                    .table(ProductionBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductionBatches::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::BatchNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::OutputItemId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::Status)
                            .string()
                            .not_null()
                            .default("planned"),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::PlannedQuantity)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::ProducedQuantity)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::WasteQuantity)
                            .decimal_len(19, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::LaborCost)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::OverheadCost)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::OtherCostPerUnit)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::MaterialsCost)
                            .decimal_len(19, 6)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::TotalCost)
                            .decimal_len(19, 6)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::CostPerUnit)
                            .decimal_len(19, 6)
                            .null(),
                    )
                    .col(ColumnDef::new(ProductionBatches::Notes).text().null())
                    .col(
                        ColumnDef::new(ProductionBatches::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::StartedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::CompletedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductionBatches::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_production_batches_output_item_id")
                            .from(
                                ProductionBatches::Table,
                                ProductionBatches::OutputItemId,
                            )
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BomLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BomLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BomLines::BatchId).uuid().not_null())
                    .col(ColumnDef::new(BomLines::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(BomLines::QuantityPerUnit)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BomLines::WasteFactor)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(1.0),
                    )
                    .col(ColumnDef::new(BomLines::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_lines_batch_id")
                            .from(BomLines::Table, BomLines::BatchId)
                            .to(ProductionBatches::Table, ProductionBatches::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bom_lines_item_id")
                            .from(BomLines::Table, BomLines::ItemId)
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Consumption rows are immutable cost snapshots, so both FKs restrict.
        manager
            .create_table(
                Table::create()
                    .table(BatchConsumptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BatchConsumptions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BatchConsumptions::BatchId).uuid().not_null())
                    .col(ColumnDef::new(BatchConsumptions::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(BatchConsumptions::Quantity)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchConsumptions::UnitCost)
                            .decimal_len(19, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchConsumptions::TotalCost)
                            .decimal_len(19, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchConsumptions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_consumptions_batch_id")
                            .from(BatchConsumptions::Table, BatchConsumptions::BatchId)
                            .to(ProductionBatches::Table, ProductionBatches::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batch_consumptions_item_id")
                            .from(BatchConsumptions::Table, BatchConsumptions::ItemId)
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
            .drop_table(Table::drop().table(BatchConsumptions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BomLines::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ProductionBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductionBatches {
    Table,
    Id,
    BatchNumber,
    OutputItemId,
    Status,
    PlannedQuantity,
    ProducedQuantity,
    WasteQuantity,
    LaborCost,
    OverheadCost,
    OtherCostPerUnit,
    MaterialsCost,
    TotalCost,
    CostPerUnit,
    Notes,
    CreatedBy,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum BomLines {
    Table,
    Id,
    BatchId,
    ItemId,
    QuantityPerUnit,
    WasteFactor,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum BatchConsumptions {
    Table,
    Id,
    BatchId,
    ItemId,
    Quantity,
    UnitCost,
    TotalCost,
    CreatedAt,
}
