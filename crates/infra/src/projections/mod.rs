//! Read models built from a finished run.
//!
//! All projections are pure and rebuildable: the same optimization result,
//! record set and layout always produce the same summaries.

pub mod distribution_summary;
pub mod network_summary;
pub mod report;

pub use distribution_summary::{
    ItemSummary, StoreSummary, WarehouseSummary, item_summaries, store_summaries,
    warehouse_summaries,
};
pub use network_summary::NetworkSummary;
pub use report::{DEFAULT_TOLERANCE, Report, ResultAggregator, aggregate};
