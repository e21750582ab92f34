//! The result aggregator: folds a solved plan, its records and (optionally)
//! the laid-out network into one cross-checked report.
//!
//! Totals are recomputed independently of the optimizer. If a recomputed
//! total disagrees with the reported one beyond the relative tolerance the
//! report is refused with [`EngineError::Consistency`]; a report is never
//! built from numbers that do not add up.

use serde::{Deserialize, Serialize};
use tracing::debug;

use stockroute_core::{EngineError, EngineResult, EoqRecord};
use stockroute_distribution::{Feasibility, OptimizationResult};
use stockroute_network::LayoutOutcome;

use super::distribution_summary::{
    ItemSummary, StoreSummary, WarehouseSummary, item_summaries, store_summaries,
    warehouse_summaries,
};
use super::network_summary::NetworkSummary;

pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// The overall report of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub feasibility: Feasibility,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    pub total_items: f64,
    pub pivots: usize,
    pub anti_cycling: bool,
    pub warehouses: Vec<WarehouseSummary>,
    pub stores: Vec<StoreSummary>,
    pub items: Vec<ItemSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultAggregator {
    tolerance: f64,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative tolerance of the cross-checks.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn aggregate(
        &self,
        result: &OptimizationResult,
        records: &[EoqRecord],
        network: Option<&LayoutOutcome>,
    ) -> EngineResult<Report> {
        let warehouses = warehouse_summaries(&result.assignment, records);
        let stores = store_summaries(&result.assignment, records);
        let items = item_summaries(records);

        let cost: f64 = warehouses.iter().map(|w| w.cost).sum();
        self.check("total cost", result.total_cost, cost)?;

        let shipped: f64 = warehouses.iter().map(|w| w.demand_served).sum();
        self.check("total items", result.total_items, shipped)?;

        let received: f64 = stores.iter().map(|s| s.received).sum();
        self.check("items received", result.total_items, received)?;

        let network = network.map(NetworkSummary::from_layout);
        if let Some(summary) = &network {
            self.check("network flow", result.total_items, summary.total_flow)?;
        }

        debug!(
            warehouses = warehouses.len(),
            stores = stores.len(),
            items = items.len(),
            total_cost = result.total_cost,
            "report aggregated"
        );

        Ok(Report {
            feasibility: result.feasibility,
            total_cost: result.total_cost,
            total_distance: result.total_distance,
            total_items: result.total_items,
            pivots: result.pivots,
            anti_cycling: result.anti_cycling,
            warehouses,
            stores,
            items,
            network,
        })
    }

    fn check(&self, what: &'static str, reported: f64, recomputed: f64) -> EngineResult<()> {
        let scale = reported.abs().max(recomputed.abs()).max(1.0);
        if (reported - recomputed).abs() <= self.tolerance * scale {
            Ok(())
        } else {
            Err(EngineError::consistency(what, reported, recomputed))
        }
    }
}

/// [`ResultAggregator::aggregate`] with the default tolerance.
pub fn aggregate(
    result: &OptimizationResult,
    records: &[EoqRecord],
    network: Option<&LayoutOutcome>,
) -> EngineResult<Report> {
    ResultAggregator::default().aggregate(result, records, network)
}
