pub mod batch_consumption;
pub mod bom_line;
pub mod inventory_adjustment;
pub mod inventory_item;
pub mod inventory_transaction;
pub mod production_batch;
pub mod purchase;
pub mod purchase_item;
