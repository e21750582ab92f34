//! Transportation problem input.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use stockroute_core::{EngineError, EngineResult, EoqRecord, InvalidInput, StoreId, WarehouseId};

/// Supply bound of a warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Capacity {
    Limited(f64),
    /// No upper bound on shipments (serialized as `null`).
    Unlimited,
}

impl From<Option<f64>> for Capacity {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Capacity::Unlimited, Capacity::Limited)
    }
}

impl From<Capacity> for Option<f64> {
    fn from(value: Capacity) -> Self {
        match value {
            Capacity::Limited(c) => Some(c),
            Capacity::Unlimited => None,
        }
    }
}

impl Capacity {
    pub fn limit(&self) -> Option<f64> {
        (*self).into()
    }
}

/// A warehouse -> store lane with its per-unit cost (and optional distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub warehouse_id: WarehouseId,
    pub store_id: StoreId,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Capacities, demands and the cost matrix of one optimization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub capacities: BTreeMap<WarehouseId, Capacity>,
    pub demands: BTreeMap<StoreId, f64>,
    pub routes: Vec<Route>,
}

impl DistributionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warehouse(mut self, id: WarehouseId, capacity: Capacity) -> Self {
        self.capacities.insert(id, capacity);
        self
    }

    pub fn with_store(mut self, id: StoreId, demand: f64) -> Self {
        self.demands.insert(id, demand);
        self
    }

    pub fn with_route(mut self, warehouse_id: WarehouseId, store_id: StoreId, cost: f64) -> Self {
        self.routes.push(Route {
            warehouse_id,
            store_id,
            cost,
            distance: None,
        });
        self
    }

    pub fn with_distance_route(
        mut self,
        warehouse_id: WarehouseId,
        store_id: StoreId,
        cost: f64,
        distance: f64,
    ) -> Self {
        self.routes.push(Route {
            warehouse_id,
            store_id,
            cost,
            distance: Some(distance),
        });
        self
    }

    /// Build a request from positional vectors and a dense `cost[warehouse][store]` matrix.
    pub fn from_matrix(
        warehouses: &[(WarehouseId, Capacity)],
        stores: &[(StoreId, f64)],
        cost: &[Vec<f64>],
    ) -> EngineResult<Self> {
        if cost.len() != warehouses.len() || cost.iter().any(|row| row.len() != stores.len()) {
            return Err(EngineError::malformed(format!(
                "cost matrix must be {}x{}",
                warehouses.len(),
                stores.len()
            )));
        }

        let mut request = Self::new();
        for (row, (w, capacity)) in cost.iter().zip(warehouses) {
            request = request.with_warehouse(w.clone(), *capacity);
            for (c, (s, _)) in row.iter().zip(stores) {
                request = request.with_route(w.clone(), s.clone(), *c);
            }
        }
        for (s, demand) in stores {
            request = request.with_store(s.clone(), *demand);
        }
        Ok(request)
    }

    /// Check the request against the record set and lay it out densely.
    ///
    /// Warehouses and stores are indexed in id order, which is what makes
    /// "lowest id first" tie-breaking a matter of comparing indices.
    pub(crate) fn densify(&self, records: &[EoqRecord]) -> EngineResult<DenseProblem> {
        for record in records {
            if !self.capacities.contains_key(record.warehouse_id()) {
                return Err(EngineError::malformed(format!(
                    "warehouse {} appears in the records but has no capacity",
                    record.warehouse_id()
                )));
            }
            if !self.demands.contains_key(record.store_id()) {
                return Err(EngineError::malformed(format!(
                    "store {} appears in the records but has no demand",
                    record.store_id()
                )));
            }
        }

        let warehouses: Vec<WarehouseId> = self.capacities.keys().cloned().collect();
        let stores: Vec<StoreId> = self.demands.keys().cloned().collect();

        let mut capacities = Vec::with_capacity(warehouses.len());
        for capacity in self.capacities.values() {
            if let Capacity::Limited(c) = capacity {
                if !(c.is_finite() && *c >= 0.0) {
                    return Err(InvalidInput::OutOfRange {
                        field: "capacity",
                        value: *c,
                        expected: "finite and >= 0",
                    }
                    .into());
                }
            }
            capacities.push(*capacity);
        }

        let mut demand = Vec::with_capacity(stores.len());
        for d in self.demands.values() {
            if !(d.is_finite() && *d >= 0.0) {
                return Err(InvalidInput::OutOfRange {
                    field: "demand",
                    value: *d,
                    expected: "finite and >= 0",
                }
                .into());
            }
            demand.push(*d);
        }

        let w_index: BTreeMap<&WarehouseId, usize> =
            warehouses.iter().enumerate().map(|(i, w)| (w, i)).collect();
        let s_index: BTreeMap<&StoreId, usize> =
            stores.iter().enumerate().map(|(j, s)| (s, j)).collect();

        let with_distance = self.routes.iter().filter(|r| r.distance.is_some()).count();
        if with_distance != 0 && with_distance != self.routes.len() {
            return Err(EngineError::malformed(
                "either every route or no route must carry a distance",
            ));
        }

        let cols = stores.len();
        let mut cost = vec![None; warehouses.len() * cols];
        let mut distance = vec![0.0; warehouses.len() * cols];
        let mut seen = BTreeSet::new();

        for route in &self.routes {
            let i = *w_index.get(&route.warehouse_id).ok_or_else(|| {
                EngineError::malformed(format!("route from unknown warehouse {}", route.warehouse_id))
            })?;
            let j = *s_index.get(&route.store_id).ok_or_else(|| {
                EngineError::malformed(format!("route to unknown store {}", route.store_id))
            })?;
            if !seen.insert((i, j)) {
                return Err(EngineError::malformed(format!(
                    "duplicate route {} -> {}",
                    route.warehouse_id, route.store_id
                )));
            }
            if !route.cost.is_finite() {
                return Err(InvalidInput::NotNumeric {
                    field: "cost",
                    raw: route.cost.to_string(),
                }
                .into());
            }
            if let Some(d) = route.distance {
                if !(d.is_finite() && d >= 0.0) {
                    return Err(InvalidInput::OutOfRange {
                        field: "distance",
                        value: d,
                        expected: "finite and >= 0",
                    }
                    .into());
                }
                distance[i * cols + j] = d;
            }
            cost[i * cols + j] = Some(route.cost);
        }

        let mut dense_cost = Vec::with_capacity(cost.len());
        for (k, c) in cost.into_iter().enumerate() {
            match c {
                Some(c) => dense_cost.push(c),
                None => {
                    return Err(EngineError::malformed(format!(
                        "cost matrix has no entry for {} -> {}",
                        warehouses[k / cols],
                        stores[k % cols]
                    )));
                }
            }
        }

        Ok(DenseProblem {
            capacities,
            demand,
            cost: dense_cost,
            distance: (with_distance > 0).then_some(distance),
            warehouses,
            stores,
        })
    }
}

/// Index-addressed form of a validated request.
#[derive(Debug, Clone)]
pub(crate) struct DenseProblem {
    pub warehouses: Vec<WarehouseId>,
    pub stores: Vec<StoreId>,
    pub capacities: Vec<Capacity>,
    pub demand: Vec<f64>,
    /// Row-major `cost[warehouse * stores + store]`.
    pub cost: Vec<f64>,
    pub distance: Option<Vec<f64>>,
}

impl DenseProblem {
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.cost[i * self.stores.len() + j]
    }

    pub fn distance(&self, i: usize, j: usize) -> Option<f64> {
        self.distance.as_ref().map(|d| d[i * self.stores.len() + j])
    }

    pub fn total_demand(&self) -> f64 {
        self.demand.iter().sum()
    }
}

/// Store demand taken as the sum of EOQ over each store's records.
pub fn derive_store_demands(records: &[EoqRecord]) -> BTreeMap<StoreId, f64> {
    let mut demands = BTreeMap::new();
    for record in records {
        *demands.entry(record.store_id().clone()).or_insert(0.0) += record.eoq as f64;
    }
    demands
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroute_core::{InventoryRecord, ItemId};

    fn w(id: &str) -> WarehouseId {
        WarehouseId::new(id).unwrap()
    }

    fn s(id: &str) -> StoreId {
        StoreId::new(id).unwrap()
    }

    fn eoq_record(warehouse: &str, store: &str, eoq: u64) -> EoqRecord {
        EoqRecord::new(
            InventoryRecord {
                item_id: ItemId::new("ITM001").unwrap(),
                store_id: s(store),
                warehouse_id: w(warehouse),
                demand: 100.0,
                order_cost: 10.0,
                holding_cost: 1.0,
                inventory_level: 0.0,
            },
            eoq,
        )
    }

    #[test]
    fn capacity_round_trips_through_null() {
        let json = serde_json::to_string(&vec![Capacity::Limited(5.0), Capacity::Unlimited]).unwrap();
        assert_eq!(json, "[5.0,null]");
        let back: Vec<Capacity> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Capacity::Limited(5.0), Capacity::Unlimited]);
    }

    #[test]
    fn densify_orders_by_id() {
        let request = DistributionRequest::new()
            .with_warehouse(w("W2"), Capacity::Limited(10.0))
            .with_warehouse(w("W1"), Capacity::Limited(20.0))
            .with_store(s("S1"), 5.0)
            .with_route(w("W2"), s("S1"), 3.0)
            .with_route(w("W1"), s("S1"), 7.0);

        let dense = request.densify(&[]).unwrap();
        assert_eq!(dense.warehouses, vec![w("W1"), w("W2")]);
        assert_eq!(dense.cost(0, 0), 7.0);
        assert_eq!(dense.cost(1, 0), 3.0);
        assert_eq!(dense.capacities[0], Capacity::Limited(20.0));
        assert!(dense.distance.is_none());
    }

    #[test]
    fn missing_route_is_rejected() {
        let request = DistributionRequest::new()
            .with_warehouse(w("W1"), Capacity::Limited(10.0))
            .with_store(s("S1"), 5.0)
            .with_store(s("S2"), 5.0)
            .with_route(w("W1"), s("S1"), 1.0);

        let err = request.densify(&[]).unwrap_err();
        assert!(err.to_string().contains("W1 -> S2"));
    }

    #[test]
    fn record_ids_must_be_covered() {
        let request = DistributionRequest::new()
            .with_warehouse(w("W1"), Capacity::Limited(10.0))
            .with_store(s("S1"), 5.0)
            .with_route(w("W1"), s("S1"), 1.0);

        assert!(request.densify(&[eoq_record("W1", "S1", 3)]).is_ok());
        assert!(request.densify(&[eoq_record("W9", "S1", 3)]).is_err());
        assert!(request.densify(&[eoq_record("W1", "S9", 3)]).is_err());
    }

    #[test]
    fn rejects_bad_numbers_and_duplicates() {
        let base = DistributionRequest::new()
            .with_warehouse(w("W1"), Capacity::Limited(10.0))
            .with_store(s("S1"), 5.0);

        let negative_capacity = base
            .clone()
            .with_warehouse(w("W1"), Capacity::Limited(-1.0))
            .with_route(w("W1"), s("S1"), 1.0);
        assert!(negative_capacity.densify(&[]).unwrap_err().is_invalid_input());

        let nan_cost = base.clone().with_route(w("W1"), s("S1"), f64::NAN);
        assert!(nan_cost.densify(&[]).is_err());

        let duplicate = base
            .clone()
            .with_route(w("W1"), s("S1"), 1.0)
            .with_route(w("W1"), s("S1"), 2.0);
        assert!(duplicate.densify(&[]).is_err());

        let partial_distance = base
            .with_warehouse(w("W2"), Capacity::Limited(1.0))
            .with_distance_route(w("W1"), s("S1"), 1.0, 10.0)
            .with_route(w("W2"), s("S1"), 1.0);
        assert!(partial_distance.densify(&[]).is_err());
    }

    #[test]
    fn from_matrix_checks_shape() {
        let err = DistributionRequest::from_matrix(
            &[(w("W1"), Capacity::Limited(1.0))],
            &[(s("S1"), 1.0), (s("S2"), 1.0)],
            &[vec![1.0]],
        );
        assert!(err.is_err());
    }

    #[test]
    fn store_demand_sums_eoq() {
        let demands = derive_store_demands(&[
            eoq_record("W1", "S1", 110),
            eoq_record("W2", "S1", 40),
            eoq_record("W1", "S2", 7),
        ]);
        assert_eq!(demands[&s("S1")], 150.0);
        assert_eq!(demands[&s("S2")], 7.0);
    }
}
