//! Solver output: shipments and the optimization result.

use serde::{Deserialize, Serialize};

use stockroute_core::{EngineError, EngineResult, StoreId, WarehouseId};

/// Units shipped on one warehouse -> store lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub warehouse_id: WarehouseId,
    pub store_id: StoreId,
    pub quantity: f64,
    pub unit_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Shipment {
    pub fn cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

/// Non-zero shipments, sorted by `(warehouse_id, store_id)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    shipments: Vec<Shipment>,
}

impl Assignment {
    /// Build from arbitrary shipments; zero quantities are dropped.
    pub fn from_shipments(mut shipments: Vec<Shipment>) -> Self {
        shipments.retain(|s| s.quantity != 0.0);
        shipments.sort_by(|a, b| {
            (&a.warehouse_id, &a.store_id).cmp(&(&b.warehouse_id, &b.store_id))
        });
        Self { shipments }
    }

    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    pub fn len(&self) -> usize {
        self.shipments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty()
    }

    pub fn get(&self, warehouse_id: &WarehouseId, store_id: &StoreId) -> Option<&Shipment> {
        self.shipments
            .binary_search_by(|s| (&s.warehouse_id, &s.store_id).cmp(&(warehouse_id, store_id)))
            .ok()
            .map(|idx| &self.shipments[idx])
    }

    /// Quantity on a lane (0 when the lane is unused).
    pub fn quantity(&self, warehouse_id: &WarehouseId, store_id: &StoreId) -> f64 {
        self.get(warehouse_id, store_id).map_or(0.0, |s| s.quantity)
    }

    pub fn shipped_from(&self, warehouse_id: &WarehouseId) -> f64 {
        self.shipments
            .iter()
            .filter(|s| &s.warehouse_id == warehouse_id)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn received_by(&self, store_id: &StoreId) -> f64 {
        self.shipments
            .iter()
            .filter(|s| &s.store_id == store_id)
            .map(|s| s.quantity)
            .sum()
    }

    /// `sum quantity * unit_cost`, in lane order.
    pub fn total_cost(&self) -> f64 {
        self.shipments.iter().map(Shipment::cost).sum()
    }

    pub fn total_quantity(&self) -> f64 {
        self.shipments.iter().map(|s| s.quantity).sum()
    }

    /// `sum quantity * distance`; `None` when lanes carry no distance.
    pub fn total_distance(&self) -> Option<f64> {
        self.shipments
            .iter()
            .map(|s| s.distance.map(|d| d * s.quantity))
            .sum()
    }
}

/// Solution state of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feasibility {
    Optimal,
    Infeasible,
    Unbounded,
}

impl Feasibility {
    /// Classify the outcome of `optimize_distribution`.
    ///
    /// Returns `None` for failures that say nothing about feasibility
    /// (invalid input, cancellation, internal errors).
    pub fn of(outcome: &EngineResult<OptimizationResult>) -> Option<Self> {
        match outcome {
            Ok(result) => Some(result.feasibility),
            Err(EngineError::Infeasible { .. }) => Some(Feasibility::Infeasible),
            Err(EngineError::Unbounded(_)) => Some(Feasibility::Unbounded),
            Err(_) => None,
        }
    }
}

/// A solved distribution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub feasibility: Feasibility,
    pub total_cost: f64,
    /// Present only when the request carried distances.
    pub total_distance: Option<f64>,
    /// Total units moved.
    pub total_items: f64,
    pub assignment: Assignment,
    /// MODI pivots performed after the initial Vogel solution.
    pub pivots: usize,
    /// Whether the solver fell back to Bland's rule after a degenerate streak.
    pub anti_cycling: bool,
}
