//! Distribution optimizer: a capacitated transportation problem solved with
//! a Vogel starting basis and MODI improvement.
//!
//! The solver is synchronous and deterministic. Long runs are driven through
//! a [`stockroute_core::RunContext`] for cancellation and progress.

pub mod assignment;
mod modi;
pub mod problem;
pub mod solver;
mod tableau;
mod vogel;

pub use assignment::{Assignment, Feasibility, OptimizationResult, Shipment};
pub use problem::{Capacity, DistributionRequest, Route, derive_store_demands};
pub use solver::{SolverConfig, optimize_distribution};
