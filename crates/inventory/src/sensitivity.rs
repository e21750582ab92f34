//! EOQ sensitivity to demand and ordering-cost perturbation.
//!
//! Pure: the same record and grid always produce the same surface, bit for bit.

use serde::{Deserialize, Serialize};

use stockroute_core::{
    EngineError, EngineResult, EoqRecord, ItemId, StoreId, WarehouseId,
};

use crate::eoq::{raw_eoq, rounded_eoq};

/// Percentages swept along each axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub demand_factors: Vec<u32>,
    pub cost_factors: Vec<u32>,
}

impl Default for GridConfig {
    /// 50% to 150% in steps of 10% on both axes.
    fn default() -> Self {
        let axis: Vec<u32> = (50..=150).step_by(10).collect();
        Self {
            demand_factors: axis.clone(),
            cost_factors: axis,
        }
    }
}

impl GridConfig {
    /// The same inclusive `start..=end` range on both axes.
    pub fn uniform(start: u32, end: u32, step: u32) -> EngineResult<Self> {
        if step == 0 || start > end {
            return Err(EngineError::malformed(format!(
                "invalid sensitivity range {start}..={end} step {step}"
            )));
        }
        let axis: Vec<u32> = (start..=end).step_by(step as usize).collect();
        Ok(Self {
            demand_factors: axis.clone(),
            cost_factors: axis,
        })
    }

    pub fn with_demand_factors(mut self, factors: Vec<u32>) -> Self {
        self.demand_factors = factors;
        self
    }

    pub fn with_cost_factors(mut self, factors: Vec<u32>) -> Self {
        self.cost_factors = factors;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.demand_factors.is_empty() || self.cost_factors.is_empty() {
            return Err(EngineError::malformed("sensitivity grid axes must not be empty"));
        }
        Ok(())
    }
}

/// One grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub demand_pct: u32,
    pub cost_pct: u32,
    pub raw_eoq: f64,
    pub eoq: u64,
}

/// The full `(demand_pct, cost_pct) -> eoq` surface for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySurface {
    pub item_id: ItemId,
    pub store_id: StoreId,
    pub warehouse_id: WarehouseId,
    pub baseline_eoq: u64,
    /// Row-major: demand factor outer, cost factor inner, in grid order.
    pub points: Vec<SensitivityPoint>,
}

impl SensitivitySurface {
    pub fn at(&self, demand_pct: u32, cost_pct: u32) -> Option<&SensitivityPoint> {
        self.points
            .iter()
            .find(|p| p.demand_pct == demand_pct && p.cost_pct == cost_pct)
    }
}

/// Which records to sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityScope {
    /// A single record, by index into the record slice.
    Representative(usize),
    All,
}

impl Default for SensitivityScope {
    fn default() -> Self {
        Self::Representative(0)
    }
}

/// Sweep the grid for a single record.
///
/// The unscaled parameters must reproduce `record.eoq` exactly, whether or
/// not the grid contains the `(100%, 100%)` point. A mismatch means the
/// record was not produced by the EOQ engine and is reported as a
/// consistency failure.
pub fn analyze_sensitivity(record: &EoqRecord, grid: &GridConfig) -> EngineResult<SensitivitySurface> {
    grid.validate()?;
    let r = &record.record;

    let baseline = rounded_eoq(raw_eoq(r.demand, r.order_cost, r.holding_cost)?)?;
    if baseline != record.eoq {
        return Err(EngineError::consistency(
            "sensitivity baseline",
            record.eoq as f64,
            baseline as f64,
        ));
    }

    let mut points = Vec::with_capacity(grid.demand_factors.len() * grid.cost_factors.len());
    for &demand_pct in &grid.demand_factors {
        for &cost_pct in &grid.cost_factors {
            let demand = r.demand * factor(demand_pct);
            let order_cost = r.order_cost * factor(cost_pct);
            let raw = raw_eoq(demand, order_cost, r.holding_cost)?;
            let eoq = rounded_eoq(raw)?;

            points.push(SensitivityPoint {
                demand_pct,
                cost_pct,
                raw_eoq: raw,
                eoq,
            });
        }
    }

    Ok(SensitivitySurface {
        item_id: r.item_id.clone(),
        store_id: r.store_id.clone(),
        warehouse_id: r.warehouse_id.clone(),
        baseline_eoq: record.eoq,
        points,
    })
}

/// Sweep the grid for the records selected by `scope`.
pub fn analyze(
    records: &[EoqRecord],
    scope: SensitivityScope,
    grid: &GridConfig,
) -> EngineResult<Vec<SensitivitySurface>> {
    match scope {
        SensitivityScope::Representative(index) => {
            let record = records.get(index).ok_or_else(|| {
                EngineError::malformed(format!(
                    "representative record {index} out of range ({} records)",
                    records.len()
                ))
            })?;
            Ok(vec![analyze_sensitivity(record, grid)?])
        }
        SensitivityScope::All => records
            .iter()
            .map(|record| analyze_sensitivity(record, grid))
            .collect(),
    }
}

/// A record re-priced at one `(demand_pct, cost_pct)` setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedEoq {
    pub item_id: ItemId,
    pub store_id: StoreId,
    pub warehouse_id: WarehouseId,
    pub demand: f64,
    pub order_cost: f64,
    pub eoq: u64,
    pub original_eoq: u64,
}

/// Re-price every record at a single setting.
pub fn adjust(records: &[EoqRecord], demand_pct: u32, cost_pct: u32) -> EngineResult<Vec<AdjustedEoq>> {
    records
        .iter()
        .map(|record| -> EngineResult<AdjustedEoq> {
            let r = &record.record;
            let demand = r.demand * factor(demand_pct);
            let order_cost = r.order_cost * factor(cost_pct);
            let eoq = rounded_eoq(raw_eoq(demand, order_cost, r.holding_cost)?)?;
            Ok(AdjustedEoq {
                item_id: r.item_id.clone(),
                store_id: r.store_id.clone(),
                warehouse_id: r.warehouse_id.clone(),
                demand,
                order_cost,
                eoq,
                original_eoq: record.eoq,
            })
        })
        .collect()
}

fn factor(pct: u32) -> f64 {
    pct as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eoq::compute_eoq;
    use proptest::prelude::*;
    use stockroute_core::InventoryRecord;

    fn record(demand: f64, order_cost: f64, holding_cost: f64) -> InventoryRecord {
        InventoryRecord {
            item_id: ItemId::new("ITM001").unwrap(),
            store_id: StoreId::new("ST001").unwrap(),
            warehouse_id: WarehouseId::new("WH001").unwrap(),
            demand,
            order_cost,
            holding_cost,
            inventory_level: 0.0,
        }
    }

    fn eoq_record(demand: f64, order_cost: f64, holding_cost: f64) -> EoqRecord {
        compute_eoq(&[record(demand, order_cost, holding_cost)])
            .unwrap()
            .remove(0)
    }

    #[test]
    fn default_grid_is_eleven_by_eleven() {
        let surface = analyze_sensitivity(&eoq_record(1200.0, 25.0, 5.0), &GridConfig::default()).unwrap();
        assert_eq!(surface.points.len(), 121);
        assert_eq!(surface.points[0].demand_pct, 50);
        assert_eq!(surface.points[0].cost_pct, 50);
        assert_eq!(surface.points[120].demand_pct, 150);
    }

    #[test]
    fn center_point_matches_baseline() {
        let rec = eoq_record(1200.0, 25.0, 5.0);
        let surface = analyze_sensitivity(&rec, &GridConfig::default()).unwrap();
        assert_eq!(surface.at(100, 100).unwrap().eoq, 110);
        assert_eq!(surface.baseline_eoq, 110);
    }

    #[test]
    fn tampered_baseline_is_a_consistency_error() {
        let mut rec = eoq_record(1200.0, 25.0, 5.0);
        rec.eoq = 111;
        let err = analyze_sensitivity(&rec, &GridConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { .. }));
    }

    #[test]
    fn baseline_is_checked_even_without_a_center_point() {
        let mut rec = eoq_record(1200.0, 25.0, 5.0);
        let grid = GridConfig::default()
            .with_demand_factors(vec![50, 150])
            .with_cost_factors(vec![50, 150]);
        assert!(analyze_sensitivity(&rec, &grid).is_ok());

        rec.eoq = 999;
        let err = analyze_sensitivity(&rec, &grid).unwrap_err();
        assert_eq!(err, EngineError::consistency("sensitivity baseline", 999.0, 110.0));
    }

    #[test]
    fn doubling_both_factors_doubles_eoq() {
        let rec = eoq_record(1000.0, 20.0, 4.0);
        let grid = GridConfig::default()
            .with_demand_factors(vec![100, 200])
            .with_cost_factors(vec![100, 200]);
        let surface = analyze_sensitivity(&rec, &grid).unwrap();

        let base = surface.at(100, 100).unwrap().raw_eoq;
        let both = surface.at(200, 200).unwrap().raw_eoq;
        assert!((both - 2.0 * base).abs() < 1e-9);
    }

    #[test]
    fn empty_axis_is_rejected() {
        let grid = GridConfig::default().with_cost_factors(vec![]);
        assert!(analyze_sensitivity(&eoq_record(10.0, 1.0, 1.0), &grid).is_err());
        assert!(GridConfig::uniform(150, 50, 10).is_err());
    }

    #[test]
    fn scope_selects_records() {
        let records = compute_eoq(&[record(1200.0, 25.0, 5.0), record(800.0, 30.0, 4.0)]).unwrap();
        let grid = GridConfig::uniform(90, 110, 10).unwrap();

        assert_eq!(analyze(&records, SensitivityScope::All, &grid).unwrap().len(), 2);
        let one = analyze(&records, SensitivityScope::Representative(1), &grid).unwrap();
        assert_eq!(one[0].baseline_eoq, records[1].eoq);
        assert!(analyze(&records, SensitivityScope::Representative(2), &grid).is_err());
    }

    #[test]
    fn adjust_keeps_original_eoq() {
        let records = compute_eoq(&[record(1200.0, 25.0, 5.0)]).unwrap();
        let adjusted = adjust(&records, 150, 100).unwrap();
        assert_eq!(adjusted[0].demand, 1800.0);
        assert_eq!(adjusted[0].original_eoq, 110);
        assert_eq!(adjusted[0].eoq, 134);
    }

    proptest! {
        #[test]
        fn surface_is_reproducible_and_centered(
            demand in 0.0f64..50_000.0,
            order_cost in 0.01f64..500.0,
            holding_cost in 0.01f64..500.0,
        ) {
            let rec = eoq_record(demand, order_cost, holding_cost);
            let grid = GridConfig::default();
            let first = analyze_sensitivity(&rec, &grid).unwrap();
            let second = analyze_sensitivity(&rec, &grid).unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.at(100, 100).unwrap().eoq, rec.eoq);
        }
    }
}
