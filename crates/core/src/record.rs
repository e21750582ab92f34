//! Inventory records as they flow through the pipeline.

use serde::{Deserialize, Serialize};

use crate::id::{ItemId, StoreId, WarehouseId};

/// One validated inventory row: an item stocked at a store, sourced from a warehouse.
///
/// Only produced by validation, so `holding_cost > 0`, `order_cost > 0`,
/// `demand >= 0` and `inventory_level >= 0` hold for every instance built
/// through the public pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub item_id: ItemId,
    pub store_id: StoreId,
    pub warehouse_id: WarehouseId,
    /// Units per period.
    pub demand: f64,
    /// Currency per order.
    pub order_cost: f64,
    /// Currency per unit per period.
    pub holding_cost: f64,
    /// Units currently on hand.
    pub inventory_level: f64,
}

/// An inventory record enriched with its economic order quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EoqRecord {
    #[serde(flatten)]
    pub record: InventoryRecord,
    /// Rounded half-to-even.
    pub eoq: u64,
}

impl EoqRecord {
    pub fn new(record: InventoryRecord, eoq: u64) -> Self {
        Self { record, eoq }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.record.item_id
    }

    pub fn store_id(&self) -> &StoreId {
        &self.record.store_id
    }

    pub fn warehouse_id(&self) -> &WarehouseId {
        &self.record.warehouse_id
    }
}
