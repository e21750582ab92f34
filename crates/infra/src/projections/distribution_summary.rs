//! Per-warehouse, per-store and per-item views of a solved plan.
//!
//! Everything here is recomputed from scratch on each call; there is no
//! incremental update path.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use stockroute_core::{EoqRecord, ItemId, StoreId, WarehouseId, round_half_even};
use stockroute_distribution::Assignment;

/// Read model: one warehouse.
///
/// - `record_demand`: demand of the records stocked from this warehouse
/// - `demand_served`: units shipped by the plan
/// - `item_count`: distinct items among those records
/// - `cost`: transportation cost of the warehouse's shipments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub warehouse_id: WarehouseId,
    pub record_demand: f64,
    pub demand_served: f64,
    pub item_count: usize,
    pub cost: f64,
}

/// Read model: one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub store_id: StoreId,
    pub record_demand: f64,
    pub item_count: usize,
    /// Units delivered by the plan.
    pub received: f64,
}

/// Read model: one item across all stores and warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub total_demand: f64,
    pub record_count: usize,
    /// Mean EOQ over the item's records, rounded half-to-even.
    pub average_eoq: u64,
}

#[derive(Default)]
struct Tally<'a> {
    demand: f64,
    items: BTreeSet<&'a ItemId>,
}

pub fn warehouse_summaries(assignment: &Assignment, records: &[EoqRecord]) -> Vec<WarehouseSummary> {
    let mut tallies: BTreeMap<&WarehouseId, Tally<'_>> = BTreeMap::new();
    for record in records {
        let tally = tallies.entry(record.warehouse_id()).or_default();
        tally.demand += record.record.demand;
        tally.items.insert(record.item_id());
    }
    for shipment in assignment.shipments() {
        tallies.entry(&shipment.warehouse_id).or_default();
    }

    tallies
        .into_iter()
        .map(|(warehouse_id, tally)| {
            let shipments = assignment
                .shipments()
                .iter()
                .filter(|s| &s.warehouse_id == warehouse_id);
            let (served, cost) = shipments.fold((0.0, 0.0), |(q, c), s| (q + s.quantity, c + s.cost()));
            WarehouseSummary {
                warehouse_id: warehouse_id.clone(),
                record_demand: tally.demand,
                demand_served: served,
                item_count: tally.items.len(),
                cost,
            }
        })
        .collect()
}

pub fn store_summaries(assignment: &Assignment, records: &[EoqRecord]) -> Vec<StoreSummary> {
    let mut tallies: BTreeMap<&StoreId, Tally<'_>> = BTreeMap::new();
    for record in records {
        let tally = tallies.entry(record.store_id()).or_default();
        tally.demand += record.record.demand;
        tally.items.insert(record.item_id());
    }
    for shipment in assignment.shipments() {
        tallies.entry(&shipment.store_id).or_default();
    }

    tallies
        .into_iter()
        .map(|(store_id, tally)| StoreSummary {
            store_id: store_id.clone(),
            record_demand: tally.demand,
            item_count: tally.items.len(),
            received: assignment.received_by(store_id),
        })
        .collect()
}

pub fn item_summaries(records: &[EoqRecord]) -> Vec<ItemSummary> {
    let mut groups: BTreeMap<&ItemId, (f64, usize, u64)> = BTreeMap::new();
    for record in records {
        let (demand, count, eoq) = groups.entry(record.item_id()).or_default();
        *demand += record.record.demand;
        *count += 1;
        *eoq += record.eoq;
    }

    groups
        .into_iter()
        .map(|(item_id, (total_demand, record_count, eoq_sum))| ItemSummary {
            item_id: item_id.clone(),
            total_demand,
            record_count,
            average_eoq: round_half_even(eoq_sum as f64 / record_count as f64) as u64,
        })
        .collect()
}
