//! End-to-end run: validate, EOQ, sensitivity, optimize, lay out, report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use stockroute_core::{EoqRecord, StoreId, WarehouseId};
use stockroute_distribution::{
    Capacity, DistributionRequest, OptimizationResult, Route, derive_store_demands,
};
use stockroute_inventory::{RawRow, RowRejection, SensitivityScope, SensitivitySurface};
use stockroute_network::Graph;

use crate::config::EngineConfig;
use crate::projections::Report;
use crate::session::{Session, SessionError};

/// Everything one run needs.
///
/// When `demands` is absent each store's demand is the sum of the EOQ of
/// its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub rows: Vec<RawRow>,
    pub capacities: BTreeMap<WarehouseId, Capacity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demands: Option<BTreeMap<StoreId, f64>>,
    pub routes: Vec<Route>,
}

impl PipelineInput {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub rejections: Vec<RowRejection>,
    pub records: Vec<EoqRecord>,
    /// Sensitivity surface of the first accepted record (empty without records).
    pub sensitivity: Vec<SensitivitySurface>,
    pub optimization: OptimizationResult,
    pub network: Graph,
    pub report: Report,
}

/// Run every stage through a fresh [`Session`], blocking on its jobs.
pub fn run_pipeline(input: PipelineInput, config: EngineConfig) -> Result<PipelineReport, SessionError> {
    let session = Session::new(config);
    let validation = session.load_rows(&input.rows)?;
    let records = session.records()?;

    let sensitivity = if records.is_empty() {
        Vec::new()
    } else {
        session.sensitivity(SensitivityScope::Representative(0))?
    };

    let request = DistributionRequest {
        capacities: input.capacities,
        demands: input
            .demands
            .unwrap_or_else(|| derive_store_demands(&records)),
        routes: input.routes,
    };
    let optimization = session.start_optimization(request)?.wait()?;
    let network = session.start_layout()?.wait()?;
    let report = session.aggregate()?;

    info!(
        session_id = %session.id(),
        rejected = validation.rejections.len(),
        total_cost = report.total_cost,
        "pipeline finished"
    );

    Ok(PipelineReport {
        rejections: validation.rejections.clone(),
        records: (*records).clone(),
        sensitivity,
        optimization: (*optimization).clone(),
        network: network.graph.clone(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobError;
    use stockroute_core::EngineError;

    const INPUT: &str = r#"{
        "rows": [
            {"item_id": "ITM001", "store_id": "S1", "warehouse_id": "W1",
             "demand": 1200, "order_cost": 25, "holding_cost": 5, "inventory_level": 150},
            {"item_id": "ITM002", "store_id": "S2", "warehouse_id": "W2",
             "demand": "800", "order_cost": 25, "holding_cost": 5, "inventory_level": 40},
            {"item_id": "ITM003", "store_id": "S2", "warehouse_id": "W2",
             "demand": 10, "order_cost": 25, "holding_cost": 0, "inventory_level": 1}
        ],
        "capacities": {"W1": 150, "W2": null},
        "routes": [
            {"warehouse_id": "W1", "store_id": "S1", "cost": 4},
            {"warehouse_id": "W1", "store_id": "S2", "cost": 6},
            {"warehouse_id": "W2", "store_id": "S1", "cost": 8},
            {"warehouse_id": "W2", "store_id": "S2", "cost": 3}
        ]
    }"#;

    #[test]
    fn derived_demands_drive_the_plan() {
        let input = PipelineInput::from_json_str(INPUT).unwrap();
        let out = run_pipeline(input, EngineConfig::default()).unwrap();

        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.sensitivity.len(), 1);
        assert_eq!(out.sensitivity[0].baseline_eoq, 110);

        // S1 needs 110 and S2 needs 89; each is served by its cheapest lane.
        let plan = &out.optimization.assignment;
        assert_eq!(plan.len(), 2);
        assert_eq!(out.report.total_cost, 110.0 * 4.0 + 89.0 * 3.0);
        assert_eq!(out.network.edge_count(), 2);
        assert!(out.report.network.is_some());
    }

    #[test]
    fn explicit_demands_override_eoq() {
        let mut input = PipelineInput::from_json_str(INPUT).unwrap();
        input.demands = Some(BTreeMap::from([
            (StoreId::new("S1").unwrap(), 80.0),
            (StoreId::new("S2").unwrap(), 100.0),
        ]));

        let out = run_pipeline(input, EngineConfig::default()).unwrap();
        assert_eq!(out.report.total_cost, 620.0);
    }

    #[test]
    fn infeasible_capacities_fail_the_run() {
        let mut input = PipelineInput::from_json_str(INPUT).unwrap();
        input.capacities.insert(WarehouseId::new("W2").unwrap(), Capacity::Limited(10.0));

        let err = run_pipeline(input, EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Job(JobError::Engine(EngineError::Infeasible { .. }))
        ));
    }
}
