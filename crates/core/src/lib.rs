//! `stockroute-core`: shared engine building blocks.
//!
//! This crate contains **pure** primitives used by every engine crate
//! (no IO, no threads, no logging setup).

pub mod control;
pub mod error;
pub mod id;
pub mod record;

pub use control::{CancellationToken, NoopProgress, ProgressSink, RunContext};
pub use error::{EngineError, EngineResult, InvalidInput};
pub use id::{ItemId, StoreId, WarehouseId};
pub use record::{EoqRecord, InventoryRecord};

/// Absolute tolerance for quantity comparisons (units).
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Round to the nearest integer, ties to even.
///
/// Used for every EOQ value so that sensitivity surfaces and cost curves agree
/// with the baseline computation bit for bit.
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_half_even(109.54), 110.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-0.4), -0.0);
    }
}
