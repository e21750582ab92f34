//! Bipartite warehouse/store graph stored as an arena of nodes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use stockroute_core::{EngineError, EngineResult, EoqRecord, InvalidInput, StoreId, WarehouseId};
use stockroute_distribution::Assignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Warehouse,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Drawing area and the two rows the layout pulls nodes toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    /// Distance kept free along every edge of the canvas.
    pub margin: f64,
    pub warehouse_row: f64,
    pub store_row: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            margin: 50.0,
            warehouse_row: 100.0,
            store_row: 400.0,
        }
    }
}

impl Canvas {
    pub fn row(&self, kind: NodeKind) -> f64 {
        match kind {
            NodeKind::Warehouse => self.warehouse_row,
            NodeKind::Store => self.store_row,
        }
    }

    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(self.margin, self.width - self.margin),
            y: p.y.clamp(self.margin, self.height - self.margin),
        }
    }

    /// The `k`-th of `count` nodes spread evenly along a row, kept inside
    /// the margins.
    pub fn seed(&self, kind: NodeKind, k: usize, count: usize) -> Position {
        self.clamp(Position {
            x: (k + 1) as f64 * self.width / (count + 1) as f64,
            y: self.row(kind),
        })
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        let values = [
            ("canvas.width", self.width),
            ("canvas.height", self.height),
            ("canvas.margin", self.margin),
            ("canvas.warehouse_row", self.warehouse_row),
            ("canvas.store_row", self.store_row),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidInput::OutOfRange {
                    field,
                    value,
                    expected: "finite and >= 0",
                }
                .into());
            }
        }
        if 2.0 * self.margin > self.width || 2.0 * self.margin > self.height {
            return Err(EngineError::malformed("canvas margin leaves no drawable area"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
}

/// Flow along one warehouse -> store lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: WarehouseId,
    pub target_id: StoreId,
    pub value: f64,
}

/// Serialized form of a [`Graph`].
#[derive(Debug, Clone, Deserialize)]
struct GraphParts {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Nodes (warehouses first, then stores, each in id order) and the edges
/// between them.
///
/// Positions are only replaced wholesale by the layout engine; a graph value
/// is otherwise immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// `(source, target)` node indices, parallel to `edges`.
    #[serde(skip)]
    links: Vec<(usize, usize)>,
}

impl TryFrom<GraphParts> for Graph {
    type Error = EngineError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        Graph::from_parts(parts.nodes, parts.edges)
    }
}

impl Graph {
    /// One node per warehouse/store seen in `records` or `assignment`, one
    /// edge per shipment, nodes seeded on their rows.
    pub fn from_assignment(assignment: &Assignment, records: &[EoqRecord], canvas: &Canvas) -> Self {
        let mut warehouses: BTreeSet<&WarehouseId> = BTreeSet::new();
        let mut stores: BTreeSet<&StoreId> = BTreeSet::new();
        for record in records {
            warehouses.insert(record.warehouse_id());
            stores.insert(record.store_id());
        }
        for shipment in assignment.shipments() {
            warehouses.insert(&shipment.warehouse_id);
            stores.insert(&shipment.store_id);
        }

        let mut nodes = Vec::with_capacity(warehouses.len() + stores.len());
        for (k, id) in warehouses.iter().enumerate() {
            nodes.push(Node {
                id: id.to_string(),
                kind: NodeKind::Warehouse,
                position: canvas.seed(NodeKind::Warehouse, k, warehouses.len()),
            });
        }
        for (k, id) in stores.iter().enumerate() {
            nodes.push(Node {
                id: id.to_string(),
                kind: NodeKind::Store,
                position: canvas.seed(NodeKind::Store, k, stores.len()),
            });
        }

        let w_index: BTreeMap<&WarehouseId, usize> =
            warehouses.iter().enumerate().map(|(k, id)| (*id, k)).collect();
        let s_index: BTreeMap<&StoreId, usize> = stores
            .iter()
            .enumerate()
            .map(|(k, id)| (*id, warehouses.len() + k))
            .collect();

        let mut edges = Vec::with_capacity(assignment.len());
        let mut links = Vec::with_capacity(assignment.len());
        for shipment in assignment.shipments() {
            links.push((w_index[&shipment.warehouse_id], s_index[&shipment.store_id]));
            edges.push(Edge {
                source_id: shipment.warehouse_id.clone(),
                target_id: shipment.store_id.clone(),
                value: shipment.quantity,
            });
        }

        Self { nodes, edges, links }
    }

    /// Rebuild a graph from its parts, checking that every edge joins a
    /// known warehouse to a known store.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> EngineResult<Self> {
        let mut index = BTreeMap::new();
        for (k, node) in nodes.iter().enumerate() {
            if !node.position.is_finite() {
                return Err(EngineError::malformed(format!("node {} has a non-finite position", node.id)));
            }
            if index.insert((node.kind, node.id.as_str()), k).is_some() {
                return Err(EngineError::malformed(format!("duplicate node {}", node.id)));
            }
        }

        let mut links = Vec::with_capacity(edges.len());
        for edge in &edges {
            let source = index
                .get(&(NodeKind::Warehouse, edge.source_id.as_str()))
                .ok_or_else(|| EngineError::malformed(format!("edge from unknown warehouse {}", edge.source_id)))?;
            let target = index
                .get(&(NodeKind::Store, edge.target_id.as_str()))
                .ok_or_else(|| EngineError::malformed(format!("edge to unknown store {}", edge.target_id)))?;
            if !(edge.value.is_finite() && edge.value >= 0.0) {
                return Err(InvalidInput::OutOfRange {
                    field: "edge.value",
                    value: edge.value,
                    expected: "finite and >= 0",
                }
                .into());
            }
            links.push((*source, *target));
        }

        Ok(Self { nodes, edges, links })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, kind: NodeKind, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == kind && n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn total_flow(&self) -> f64 {
        self.edges.iter().map(|e| e.value).sum()
    }

    pub fn max_flow(&self) -> f64 {
        self.edges.iter().map(|e| e.value).fold(0.0, f64::max)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    pub(crate) fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    /// Evenly spread seed positions for the current nodes.
    pub(crate) fn seed_positions(&self, canvas: &Canvas) -> Vec<Position> {
        let warehouses = self.count(NodeKind::Warehouse);
        let stores = self.count(NodeKind::Store);
        let (mut w, mut s) = (0, 0);
        self.nodes
            .iter()
            .map(|node| match node.kind {
                NodeKind::Warehouse => {
                    w += 1;
                    canvas.seed(NodeKind::Warehouse, w - 1, warehouses)
                }
                NodeKind::Store => {
                    s += 1;
                    canvas.seed(NodeKind::Store, s - 1, stores)
                }
            })
            .collect()
    }

    /// Replace every position at once.
    pub(crate) fn set_positions(&mut self, positions: Vec<Position>) {
        debug_assert_eq!(positions.len(), self.nodes.len());
        for (node, position) in self.nodes.iter_mut().zip(positions) {
            node.position = position;
        }
    }
}
