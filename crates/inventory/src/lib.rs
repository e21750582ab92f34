//! Inventory analytics: validation, EOQ and sensitivity.
//!
//! Everything here is deterministic domain logic (no IO, no threads).

pub mod eoq;
pub mod sensitivity;
pub mod validation;

pub use eoq::{CostPoint, compute_eoq, cost_curve, eoq_for, raw_eoq, rounded_eoq, total_cost};
pub use sensitivity::{
    AdjustedEoq, GridConfig, SensitivityPoint, SensitivityScope, SensitivitySurface, adjust,
    analyze, analyze_sensitivity,
};
pub use validation::{RawRow, RawValue, RowRejection, ValidationOutcome, validate, validate_row};
