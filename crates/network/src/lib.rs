//! Distribution network graph and its force-directed layout.

pub mod graph;
pub mod layout;
mod spatial;

pub use graph::{Canvas, Edge, Graph, Node, NodeKind, Position};
pub use layout::{
    GRID_MIN_NODES, LayoutConfig, LayoutEngine, LayoutOutcome, LayoutState, NeighborSearch, layout,
};
