//! Engine error model.

use thiserror::Error;

/// Result type used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;

/// A malformed or out-of-range input value.
///
/// Reported per row by validation, and as the cause of an
/// [`EngineError::InvalidInput`] everywhere else.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidInput {
    /// A required field is absent.
    #[error("missing field `{field}`")]
    Missing { field: &'static str },

    /// A numeric field holds something that is not a number.
    #[error("field `{field}` is not numeric: {raw:?}")]
    NotNumeric { field: &'static str, raw: String },

    /// A numeric value lies outside its allowed range.
    #[error("field `{field}` is out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A divisor (the holding cost) is zero or negative.
    #[error("field `{field}` must be > 0 to be used as a divisor, got {value}")]
    DivisionByZero { field: &'static str, value: f64 },

    /// Structurally invalid input (missing matrix entries, empty grids, ...).
    #[error("{0}")]
    Malformed(String),
}

impl InvalidInput {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Name of the offending field, when the problem is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            InvalidInput::Missing { field }
            | InvalidInput::NotNumeric { field, .. }
            | InvalidInput::OutOfRange { field, .. }
            | InvalidInput::DivisionByZero { field, .. } => Some(field),
            InvalidInput::Malformed(_) => None,
        }
    }
}

/// Engine-level failure.
///
/// Everything except [`EngineError::Cancelled`] aborts the operation that
/// produced it; cancellation is a cooperative stop requested by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Aggregate demand exceeds aggregate supply.
    #[error(
        "infeasible problem: total demand {total_demand} exceeds total supply {total_supply} (shortfall {shortfall})"
    )]
    Infeasible {
        total_supply: f64,
        total_demand: f64,
        shortfall: f64,
    },

    /// The cost structure admits unbounded improvement.
    #[error("unbounded problem: {0}")]
    Unbounded(String),

    /// An internal cross-check failed; the numbers must not be presented.
    #[error("consistency check failed for {what}: reported {reported}, recomputed {recomputed}")]
    Consistency {
        what: &'static str,
        reported: f64,
        recomputed: f64,
    },

    #[error("iteration limit of {limit} reached before convergence")]
    IterationLimit { limit: usize },

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::InvalidInput(InvalidInput::malformed(msg))
    }

    pub fn consistency(what: &'static str, reported: f64, recomputed: f64) -> Self {
        Self::Consistency {
            what,
            reported,
            recomputed,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
