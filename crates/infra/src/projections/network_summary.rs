//! Network summary: shape and flow of the laid-out graph.

use serde::{Deserialize, Serialize};

use stockroute_network::{LayoutOutcome, NodeKind};

/// Read model: the distribution network after layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub warehouses: usize,
    pub stores: usize,
    pub edges: usize,
    pub total_flow: f64,
    /// Heaviest single lane (0 for an edgeless graph).
    pub max_flow: f64,
    pub layout_steps: usize,
    pub converged: bool,
}

impl NetworkSummary {
    pub fn from_layout(outcome: &LayoutOutcome) -> Self {
        let graph = &outcome.graph;
        Self {
            warehouses: graph.count(NodeKind::Warehouse),
            stores: graph.count(NodeKind::Store),
            edges: graph.edge_count(),
            total_flow: graph.total_flow(),
            max_flow: graph.max_flow(),
            layout_steps: outcome.steps,
            converged: outcome.converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroute_core::{RunContext, StoreId, WarehouseId};
    use stockroute_distribution::{Assignment, Shipment};
    use stockroute_network::{Canvas, Graph, LayoutConfig, layout};

    #[test]
    fn summary_counts_nodes_edges_and_flow() {
        let shipments = [("W1", "S1", 80.0), ("W1", "S2", 20.0), ("W2", "S2", 100.0)]
            .into_iter()
            .map(|(w, s, quantity)| Shipment {
                warehouse_id: WarehouseId::new(w).unwrap(),
                store_id: StoreId::new(s).unwrap(),
                quantity,
                unit_cost: 1.0,
                distance: None,
            })
            .collect();
        let graph = Graph::from_assignment(
            &Assignment::from_shipments(shipments),
            &[],
            &Canvas::default(),
        );
        let outcome = layout(&graph, &LayoutConfig::default(), &RunContext::detached()).unwrap();

        let summary = NetworkSummary::from_layout(&outcome);
        assert_eq!(summary.warehouses, 2);
        assert_eq!(summary.stores, 2);
        assert_eq!(summary.edges, 3);
        assert_eq!(summary.total_flow, 200.0);
        assert_eq!(summary.max_flow, 100.0);
        assert_eq!(summary.layout_steps, outcome.steps);
    }
}
