//! Economic Order Quantity.
//!
//! `eoq = sqrt(2 * demand * order_cost / holding_cost)`, rounded half-to-even.
//! Cost curves are sampled relative to the rounded value.

use serde::{Deserialize, Serialize};

use stockroute_core::{
    EngineError, EngineResult, EoqRecord, InvalidInput, InventoryRecord, round_half_even,
};

/// Unrounded EOQ for the given parameters.
///
/// Inputs are checked before any arithmetic so that neither the division nor
/// the square root can see an invalid operand.
pub fn raw_eoq(demand: f64, order_cost: f64, holding_cost: f64) -> EngineResult<f64> {
    check_parameters(demand, order_cost, holding_cost)?;
    let radicand = 2.0 * demand * order_cost / holding_cost;
    let eoq = radicand.sqrt();
    if !radicand.is_finite() || !eoq.is_finite() {
        return Err(InvalidInput::OutOfRange {
            field: "eoq",
            value: radicand,
            expected: "a finite order quantity",
        }
        .into());
    }
    Ok(eoq)
}

/// Round an unrounded EOQ to a whole quantity, half-to-even.
///
/// Fails instead of saturating when the value does not fit in a `u64`.
pub fn rounded_eoq(raw: f64) -> EngineResult<u64> {
    let rounded = round_half_even(raw);
    if !(rounded.is_finite() && rounded >= 0.0 && rounded < u64::MAX as f64) {
        return Err(InvalidInput::OutOfRange {
            field: "eoq",
            value: raw,
            expected: "representable as a whole quantity",
        }
        .into());
    }
    Ok(rounded as u64)
}

/// Rounded EOQ for a single record.
pub fn eoq_for(record: &InventoryRecord) -> EngineResult<u64> {
    rounded_eoq(raw_eoq(record.demand, record.order_cost, record.holding_cost)?)
}

/// Compute EOQ for every record.
///
/// All-or-nothing: the first invalid record fails the whole batch.
pub fn compute_eoq(records: &[InventoryRecord]) -> EngineResult<Vec<EoqRecord>> {
    records
        .iter()
        .map(|record| -> EngineResult<EoqRecord> {
            Ok(EoqRecord::new(record.clone(), eoq_for(record)?))
        })
        .collect()
}

fn check_parameters(demand: f64, order_cost: f64, holding_cost: f64) -> Result<(), InvalidInput> {
    if !demand.is_finite() || demand < 0.0 {
        return Err(InvalidInput::OutOfRange {
            field: "demand",
            value: demand,
            expected: ">= 0",
        });
    }
    if !order_cost.is_finite() || order_cost < 0.0 {
        return Err(InvalidInput::OutOfRange {
            field: "order_cost",
            value: order_cost,
            expected: ">= 0",
        });
    }
    if !holding_cost.is_finite() || holding_cost <= 0.0 {
        return Err(InvalidInput::DivisionByZero {
            field: "holding_cost",
            value: holding_cost,
        });
    }
    Ok(())
}

/// Total cost per period of ordering `quantity` units at a time.
pub fn total_cost(record: &InventoryRecord, quantity: f64) -> EngineResult<f64> {
    Ok(cost_components(record, quantity)?.total_cost)
}

/// One sample of the order-quantity-vs-cost curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub quantity: f64,
    /// `(demand / q) * order_cost`
    pub ordering_cost: f64,
    /// `(q / 2) * holding_cost`
    pub holding_cost: f64,
    pub total_cost: f64,
}

fn cost_components(record: &InventoryRecord, quantity: f64) -> EngineResult<CostPoint> {
    check_parameters(record.demand, record.order_cost, record.holding_cost)?;
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(InvalidInput::OutOfRange {
            field: "quantity",
            value: quantity,
            expected: "> 0",
        }
        .into());
    }

    let ordering_cost = (record.demand / quantity) * record.order_cost;
    let holding_cost = (quantity / 2.0) * record.holding_cost;
    Ok(CostPoint {
        quantity,
        ordering_cost,
        holding_cost,
        total_cost: ordering_cost + holding_cost,
    })
}

/// Sample the cost curve over `[0.5 * eoq, 1.5 * eoq]` at `samples` evenly spaced points.
///
/// Both ends are included. `samples` must be at least 2.
pub fn cost_curve(record: &EoqRecord, samples: usize) -> EngineResult<Vec<CostPoint>> {
    if samples < 2 {
        return Err(EngineError::malformed(format!(
            "cost curve needs at least 2 samples, got {samples}"
        )));
    }
    if record.eoq == 0 {
        return Err(EngineError::malformed(format!(
            "cost curve for item {} at store {} is undefined: eoq is 0",
            record.item_id(),
            record.store_id()
        )));
    }

    let eoq = record.eoq as f64;
    let low = 0.5 * eoq;
    let high = 1.5 * eoq;
    let step = (high - low) / (samples - 1) as f64;

    (0..samples)
        .map(|i| {
            let quantity = if i == samples - 1 { high } else { low + step * i as f64 };
            cost_components(&record.record, quantity)
        })
        .collect()
}
