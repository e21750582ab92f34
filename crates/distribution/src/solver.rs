//! Distribution optimizer entry point.

use serde::{Deserialize, Serialize};

use stockroute_core::{EngineError, EngineResult, EoqRecord, QUANTITY_EPSILON, RunContext};

use crate::assignment::{Assignment, Feasibility, OptimizationResult, Shipment};
use crate::modi::{self, ModiLimits, PivotRule};
use crate::problem::{Capacity, DenseProblem, DistributionRequest};
use crate::tableau::Tableau;
use crate::vogel;

/// Relative tolerance between the solver objective and the extracted plan.
const COST_TOLERANCE: f64 = 1e-9;

/// Solver tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Upper bound on MODI pivots before giving up with `IterationLimit`.
    pub max_pivots: usize,
    /// Consecutive degenerate pivots tolerated before switching to Bland's
    /// rule. `None` means `warehouses + stores`.
    pub degenerate_streak_limit: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_pivots: 100_000,
            degenerate_streak_limit: None,
        }
    }
}

impl SolverConfig {
    pub fn with_max_pivots(mut self, max_pivots: usize) -> Self {
        self.max_pivots = max_pivots;
        self
    }

    pub fn with_degenerate_streak_limit(mut self, limit: usize) -> Self {
        self.degenerate_streak_limit = Some(limit);
        self
    }
}

/// Solve the transportation problem for `records` under `request`.
///
/// Minimizes `sum cost * quantity` with shipments bounded by warehouse
/// capacity and every store receiving at least its demand. The records
/// decide which warehouses and stores must be present in the request.
///
/// Cancellation is checked before solving and before every pivot; progress
/// reaches 10 once the starting basis exists and 100 on success.
pub fn optimize_distribution(
    records: &[EoqRecord],
    request: &DistributionRequest,
    config: &SolverConfig,
    ctx: &RunContext,
) -> EngineResult<OptimizationResult> {
    ctx.checkpoint()?;
    let problem = request.densify(records)?;
    let (m, n) = (problem.warehouses.len(), problem.stores.len());

    let total_demand = problem.total_demand();
    let eps = QUANTITY_EPSILON * total_demand.max(1.0);

    check_bounded(&problem)?;
    let supply = effective_supply(&problem, total_demand, eps)?;

    if m == 0 {
        ctx.report(100);
        return Ok(finish(&problem, Assignment::default(), 0.0, 0, false));
    }

    let mut tableau = balanced_tableau(&problem, &supply, total_demand);
    vogel::initial_basis(&mut tableau);
    tableau.check_basis()?;
    ctx.report(10);
    tracing::debug!(
        warehouses = m,
        stores = n,
        initial_cost = tableau.objective(),
        "vogel starting basis ready"
    );

    let limits = ModiLimits {
        max_pivots: config.max_pivots,
        degenerate_streak: config.degenerate_streak_limit.unwrap_or(m + n),
    };
    let outcome = modi::improve(&mut tableau, limits, ctx)?;
    let objective = tableau.objective();

    let assignment = extract_assignment(&problem, &tableau);
    self_check(&problem, &assignment, eps)?;
    check_total_cost(&problem, &assignment, objective, tableau.eps)?;

    let result = finish(
        &problem,
        assignment,
        objective,
        outcome.pivots,
        outcome.rule == PivotRule::Bland,
    );
    ctx.report(100);
    tracing::debug!(
        pivots = result.pivots,
        anti_cycling = result.anti_cycling,
        total_cost = result.total_cost,
        "distribution optimized"
    );
    Ok(result)
}

fn check_bounded(problem: &DenseProblem) -> EngineResult<()> {
    for (i, capacity) in problem.capacities.iter().enumerate() {
        if *capacity != Capacity::Unlimited {
            continue;
        }
        if let Some(j) = (0..problem.stores.len()).find(|&j| problem.cost(i, j) < 0.0) {
            return Err(EngineError::Unbounded(format!(
                "warehouse {} has unlimited capacity and a negative cost route to {}",
                problem.warehouses[i], problem.stores[j]
            )));
        }
    }
    Ok(())
}

/// Per-warehouse supply used by the tableau.
///
/// An unlimited warehouse never needs to ship more than the total demand.
fn effective_supply(problem: &DenseProblem, total_demand: f64, eps: f64) -> EngineResult<Vec<f64>> {
    let mut limited_total = 0.0;
    let mut any_unlimited = false;
    let supply: Vec<f64> = problem
        .capacities
        .iter()
        .map(|capacity| match capacity {
            Capacity::Limited(c) => {
                limited_total += c;
                *c
            }
            Capacity::Unlimited => {
                any_unlimited = true;
                total_demand
            }
        })
        .collect();

    if !any_unlimited && limited_total < total_demand - eps {
        return Err(EngineError::Infeasible {
            total_supply: limited_total,
            total_demand,
            shortfall: total_demand - limited_total,
        });
    }
    Ok(supply)
}

/// Tableau with the stores plus one slack column absorbing surplus supply.
///
/// Slack costs `min(0, cheapest route)` per warehouse, so idle supply is free
/// and supply worth over-delivering is priced like its best route.
fn balanced_tableau(problem: &DenseProblem, supply: &[f64], total_demand: f64) -> Tableau {
    let n = problem.stores.len();
    let surplus = (supply.iter().sum::<f64>() - total_demand).max(0.0);

    let mut demand = problem.demand.clone();
    demand.push(surplus);

    let mut cost = Vec::with_capacity(supply.len() * (n + 1));
    for i in 0..supply.len() {
        let row = (0..n).map(|j| problem.cost(i, j));
        cost.extend(row.clone());
        cost.push(row.fold(0.0, f64::min));
    }

    Tableau::new(supply.to_vec(), demand, cost)
}

/// Cheapest store of a warehouse (lowest index on ties).
fn cheapest_store(problem: &DenseProblem, i: usize) -> Option<usize> {
    (0..problem.stores.len()).min_by(|&a, &b| problem.cost(i, a).total_cmp(&problem.cost(i, b)))
}

fn extract_assignment(problem: &DenseProblem, tableau: &Tableau) -> Assignment {
    let n = problem.stores.len();
    let mut shipments = Vec::new();

    for i in 0..problem.warehouses.len() {
        let mut row: Vec<f64> = (0..n).map(|j| tableau.quantity(i, j)).collect();

        // Slack priced below zero means the supply is worth delivering.
        let slack = tableau.quantity(i, n);
        if slack > tableau.eps && tableau.cost(i, n) < 0.0 {
            if let Some(j) = cheapest_store(problem, i) {
                row[j] += slack;
            }
        }

        for (j, quantity) in row.into_iter().enumerate() {
            if quantity <= tableau.eps {
                continue;
            }
            shipments.push(Shipment {
                warehouse_id: problem.warehouses[i].clone(),
                store_id: problem.stores[j].clone(),
                quantity,
                unit_cost: problem.cost(i, j),
                distance: problem.distance(i, j),
            });
        }
    }

    Assignment::from_shipments(shipments)
}

fn self_check(problem: &DenseProblem, assignment: &Assignment, eps: f64) -> EngineResult<()> {
    for (w, capacity) in problem.warehouses.iter().zip(&problem.capacities) {
        if let Capacity::Limited(limit) = capacity {
            let shipped = assignment.shipped_from(w);
            if shipped > limit + eps {
                return Err(EngineError::consistency("warehouse capacity", *limit, shipped));
            }
        }
    }
    for (s, demand) in problem.stores.iter().zip(&problem.demand) {
        let received = assignment.received_by(s);
        if received < demand - eps {
            return Err(EngineError::consistency("store demand", *demand, received));
        }
    }
    Ok(())
}

/// Compare the tableau objective with the cost of the extracted shipments.
///
/// The two may differ by rounding and by the sub-`drop_eps` quantities the
/// extraction discards, nothing more.
fn check_total_cost(
    problem: &DenseProblem,
    assignment: &Assignment,
    objective: f64,
    drop_eps: f64,
) -> EngineResult<()> {
    let recomputed = assignment.total_cost();
    let (m, n) = (problem.warehouses.len(), problem.stores.len());
    let max_cost = (0..m)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| problem.cost(i, j).abs())
        .fold(0.0, f64::max);

    let scale = objective.abs().max(recomputed.abs()).max(1.0);
    let dropped = drop_eps * max_cost * (m * (n + 1)) as f64;
    if (objective - recomputed).abs() <= COST_TOLERANCE * scale + dropped {
        Ok(())
    } else {
        Err(EngineError::consistency("total cost", objective, recomputed))
    }
}

fn finish(
    problem: &DenseProblem,
    assignment: Assignment,
    total_cost: f64,
    pivots: usize,
    anti_cycling: bool,
) -> OptimizationResult {
    OptimizationResult {
        feasibility: Feasibility::Optimal,
        total_cost,
        total_distance: problem
            .distance
            .as_ref()
            .map(|_| assignment.total_distance().unwrap_or(0.0)),
        total_items: assignment.total_quantity(),
        assignment,
        pivots,
        anti_cycling,
    }
}
