pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_inventory_items_table;
mod m20250601_000002_create_inventory_transactions_table;
mod m20250601_000003_create_purchases_tables;
mod m20250601_000004_create_production_tables;
mod m20250601_000005_create_inventory_adjustments_table;
mod m20250715_000006_add_ledger_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_inventory_items_table::Migration),
            Box::new(m20250601_000002_create_inventory_transactions_table::Migration),
            Box::new(m20250601_000003_create_purchases_tables::Migration),
            Box::new(m20250601_000004_create_production_tables::Migration),
            Box::new(m20250601_000005_create_inventory_adjustments_table::Migration),
            Box::new(m20250715_000006_add_ledger_indexes::Migration),
        ]
    }
}
