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
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PurchaseNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Purchases::SupplierId).uuid().not_null())
                    .col(
                        ColumnDef::new(Purchases::SupplierName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Purchases::Subtotal)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::Tax)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::ShippingCost)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::AdvanceApplied)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::Total)
                            .decimal_len(19, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Purchases::Notes).text().null())
                    .col(ColumnDef::new(Purchases::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Purchases::OrderedAt).timestamp().null())
                    .col(ColumnDef::new(Purchases::ReceivedAt).timestamp().null())
                    .col(ColumnDef::new(Purchases::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Purchases::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseItems::PurchaseId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseItems::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseItems::QuantityOrdered)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::QuantityReceived)
                            .decimal_len(19, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::UnitPrice)
                            .decimal_len(19, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::LineTotal)
                            .decimal_len(19, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseItems::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_items_purchase_id")
                            .from(PurchaseItems::Table, PurchaseItems::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_items_item_id")
                            .from(PurchaseItems::Table, PurchaseItems::ItemId)
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
            .drop_table(Table::drop().table(PurchaseItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Purchases {
    Table,
    Id,
    PurchaseNumber,
    SupplierId,
    SupplierName,
    Status,
    Subtotal,
    Tax,
    ShippingCost,
    AdvanceApplied,
    Total,
    Notes,
    CreatedBy,
    OrderedAt,
    ReceivedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PurchaseItems {
    Table,
    Id,
    PurchaseId,
    ItemId,
    QuantityOrdered,
    QuantityReceived,
    UnitPrice,
    LineTotal,
    CreatedAt,
    UpdatedAt,
}
