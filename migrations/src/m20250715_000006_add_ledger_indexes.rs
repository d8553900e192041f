use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_inventory_items_table::InventoryItems;
use super::m20250601_000002_create_inventory_transactions_table::InventoryTransactions;
use super::m20250601_000003_create_purchases_tables::{PurchaseItems, Purchases};
use super::m20250601_000004_create_production_tables::{BatchConsumptions, BomLines, ProductionBatches};
use super::m20250601_000005_create_inventory_adjustments_table::InventoryAdjustments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ledger history reads are always per item, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_item_created")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ItemId)
                    .col((InventoryTransactions::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_type")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::TransactionType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_active")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_status")
                    .table(Purchases::Table)
                    .col(Purchases::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_items_purchase")
                    .table(PurchaseItems::Table)
                    .col(PurchaseItems::PurchaseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_production_batches_status")
                    .table(ProductionBatches::Table)
                    .col(ProductionBatches::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bom_lines_item")
                    .table(BomLines::Table)
                    .col(BomLines::ItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batch_consumptions_batch")
                    .table(BatchConsumptions::Table)
                    .col(BatchConsumptions::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_adjustments_item_created")
                    .table(InventoryAdjustments::Table)
                    .col(InventoryAdjustments::ItemId)
                    .col((InventoryAdjustments::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_inventory_adjustments_item_created",
            "idx_batch_consumptions_batch",
            "idx_bom_lines_item",
            "idx_production_batches_status",
            "idx_purchase_items_purchase",
            "idx_purchases_status",
            "idx_inventory_items_active",
            "idx_inventory_transactions_type",
            "idx_inventory_transactions_item_created",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
