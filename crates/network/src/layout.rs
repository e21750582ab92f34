//! Force-directed layout of the distribution graph.
//!
//! Each step reads one immutable position snapshot and produces the next:
//! pairwise repulsion and edge springs are summed from the old positions,
//! then every node is pulled toward its row and clamped to the canvas.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use stockroute_core::{EngineResult, InvalidInput, RunContext};

use crate::graph::{Canvas, Graph, Position};
use crate::spatial::{SpatialGrid, all_pairs};

/// Node count above which [`NeighborSearch::Auto`] switches to the grid.
pub const GRID_MIN_NODES: usize = 64;

/// Step size used to separate two nodes sitting on the same point.
const COINCIDENT_NUDGE: f64 = 1.0;

/// How repulsion candidates are found. Every mode yields the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearch {
    #[default]
    Auto,
    Pairwise,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub max_iterations: usize,
    /// Stop early once no node moves more than this in a step.
    pub convergence_threshold: f64,
    pub repulsion_strength: f64,
    pub repulsion_cutoff: f64,
    pub spring_length: f64,
    pub spring_stiffness: f64,
    /// Fraction of the gap to its row a node closes each step.
    pub row_damping: f64,
    /// Seed for separating coincident nodes.
    pub seed: u64,
    /// Start from evenly spread row positions instead of the graph's own.
    pub reseed: bool,
    pub neighbor_search: NeighborSearch,
    pub canvas: Canvas,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-3,
            repulsion_strength: 100.0,
            repulsion_cutoff: 200.0,
            spring_length: 150.0,
            spring_stiffness: 0.01,
            row_damping: 0.1,
            seed: 0,
            reseed: false,
            neighbor_search: NeighborSearch::Auto,
            canvas: Canvas::default(),
        }
    }
}

impl LayoutConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_reseed(mut self, reseed: bool) -> Self {
        self.reseed = reseed;
        self
    }

    pub fn with_neighbor_search(mut self, search: NeighborSearch) -> Self {
        self.neighbor_search = search;
        self
    }

    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        let non_negative = [
            ("convergence_threshold", self.convergence_threshold),
            ("repulsion_strength", self.repulsion_strength),
            ("spring_length", self.spring_length),
            ("spring_stiffness", self.spring_stiffness),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidInput::OutOfRange {
                    field,
                    value,
                    expected: "finite and >= 0",
                }
                .into());
            }
        }
        if !(self.repulsion_cutoff.is_finite() && self.repulsion_cutoff > 0.0) {
            return Err(InvalidInput::OutOfRange {
                field: "repulsion_cutoff",
                value: self.repulsion_cutoff,
                expected: "finite and > 0",
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.row_damping) {
            return Err(InvalidInput::OutOfRange {
                field: "row_damping",
                value: self.row_damping,
                expected: "within [0, 1]",
            }
            .into());
        }
        self.canvas.validate()
    }
}

/// Where the layout state machine stands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LayoutState {
    Ready,
    Running { step: usize },
    /// The last step moved no node by more than the threshold.
    Converged { step: usize },
    /// `max_iterations` steps were taken.
    Exhausted { step: usize },
}

impl LayoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LayoutState::Converged { .. } | LayoutState::Exhausted { .. })
    }

    pub fn steps(&self) -> usize {
        match *self {
            LayoutState::Ready => 0,
            LayoutState::Running { step }
            | LayoutState::Converged { step }
            | LayoutState::Exhausted { step } => step,
        }
    }
}

/// Result of a complete layout run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutcome {
    pub graph: Graph,
    pub steps: usize,
    pub converged: bool,
    /// Largest node displacement of the final step.
    pub max_displacement: f64,
}

/// Step-by-step driver over a private copy of the graph.
#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    graph: Graph,
    state: LayoutState,
    use_grid: bool,
    last_displacement: f64,
}

impl LayoutEngine {
    pub fn new(graph: &Graph, config: &LayoutConfig) -> EngineResult<Self> {
        config.validate()?;

        let mut graph = graph.clone();
        let start = if config.reseed {
            graph.seed_positions(&config.canvas)
        } else {
            graph.positions()
        };
        graph.set_positions(start.into_iter().map(|p| config.canvas.clamp(p)).collect());

        let use_grid = match config.neighbor_search {
            NeighborSearch::Auto => graph.node_count() > GRID_MIN_NODES,
            NeighborSearch::Pairwise => false,
            NeighborSearch::Grid => true,
        };

        Ok(Self {
            config: config.clone(),
            graph,
            state: LayoutState::Ready,
            use_grid,
            last_displacement: 0.0,
        })
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// The latest complete snapshot.
    pub fn snapshot(&self) -> &Graph {
        &self.graph
    }

    /// Advance one step. Terminal states are left unchanged.
    pub fn step(&mut self) -> LayoutState {
        if self.state.is_terminal() {
            return self.state;
        }
        let done = self.state.steps();
        if done >= self.config.max_iterations {
            self.state = LayoutState::Exhausted { step: done };
            return self.state;
        }

        let current = self.graph.positions();
        let next = self.next_positions(&current);
        let displacement = current
            .iter()
            .zip(&next)
            .map(|(a, b)| a.distance_to(b))
            .fold(0.0, f64::max);
        self.graph.set_positions(next);
        self.last_displacement = displacement;

        let step = done + 1;
        self.state = if displacement < self.config.convergence_threshold {
            LayoutState::Converged { step }
        } else if step >= self.config.max_iterations {
            LayoutState::Exhausted { step }
        } else {
            LayoutState::Running { step }
        };
        self.state
    }

    /// Run to a terminal state, checking cancellation before every step.
    pub fn run(mut self, ctx: &RunContext) -> EngineResult<LayoutOutcome> {
        while !self.state.is_terminal() {
            ctx.checkpoint()?;
            let state = self.step();
            ctx.report_between(0, 99, state.steps(), self.config.max_iterations);
        }
        ctx.report(100);

        let steps = self.state.steps();
        let converged = matches!(self.state, LayoutState::Converged { .. });
        tracing::debug!(
            nodes = self.graph.node_count(),
            steps,
            converged,
            "network layout finished"
        );

        Ok(LayoutOutcome {
            graph: self.graph,
            steps,
            converged,
            max_displacement: self.last_displacement,
        })
    }

    fn next_positions(&self, current: &[Position]) -> Vec<Position> {
        let config = &self.config;
        let mut delta = vec![(0.0_f64, 0.0_f64); current.len()];

        let mut repel = |a: usize, b: usize| {
            let (pa, pb) = (current[a], current[b]);
            let d = pa.distance_to(&pb);
            let (ux, uy, magnitude) = if d == 0.0 {
                let (ux, uy) = separation(config.seed, a, b);
                (ux, uy, COINCIDENT_NUDGE)
            } else if d < config.repulsion_cutoff {
                ((pa.x - pb.x) / d, (pa.y - pb.y) / d, config.repulsion_strength / d)
            } else {
                return;
            };
            delta[a].0 += ux * magnitude;
            delta[a].1 += uy * magnitude;
            delta[b].0 -= ux * magnitude;
            delta[b].1 -= uy * magnitude;
        };

        if self.use_grid {
            let grid = SpatialGrid::build(current, config.repulsion_cutoff);
            for (a, b) in grid.candidate_pairs() {
                repel(a, b);
            }
        } else {
            for (a, b) in all_pairs(current.len()) {
                repel(a, b);
            }
        }

        for &(s, t) in self.graph.links() {
            let (ps, pt) = (current[s], current[t]);
            let d = ps.distance_to(&pt);
            if d == 0.0 {
                continue;
            }
            let force = (d - config.spring_length) * config.spring_stiffness;
            let (fx, fy) = ((pt.x - ps.x) / d * force, (pt.y - ps.y) / d * force);
            delta[s].0 += fx;
            delta[s].1 += fy;
            delta[t].0 -= fx;
            delta[t].1 -= fy;
        }

        self.graph
            .nodes()
            .iter()
            .zip(current)
            .zip(delta)
            .map(|((node, p), (dx, dy))| {
                let x = p.x + dx;
                let mut y = p.y + dy;
                y += (config.canvas.row(node.kind) - y) * config.row_damping;
                config.canvas.clamp(Position::new(x, y))
            })
            .collect()
    }
}

/// Lay out `graph`; the input graph is never modified.
pub fn layout(graph: &Graph, config: &LayoutConfig, ctx: &RunContext) -> EngineResult<LayoutOutcome> {
    LayoutEngine::new(graph, config)?.run(ctx)
}

/// Unit vector for pushing apart nodes `a < b` that share a point.
fn separation(seed: u64, a: usize, b: usize) -> (f64, f64) {
    let h = splitmix64(seed ^ splitmix64(((a as u64) << 32) | b as u64));
    let angle = (h >> 11) as f64 / (1u64 << 53) as f64 * TAU;
    (angle.cos(), angle.sin())
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeKind};
    use proptest::prelude::*;
    use stockroute_core::{EngineError, StoreId, WarehouseId};
    use stockroute_distribution::{Assignment, Shipment};

    fn graph(warehouses: usize, stores: usize) -> Graph {
        let mut shipments = Vec::new();
        for w in 0..warehouses {
            for s in 0..stores {
                if (w + s) % 2 == 0 {
                    shipments.push(Shipment {
                        warehouse_id: WarehouseId::new(format!("W{w:03}")).unwrap(),
                        store_id: StoreId::new(format!("S{s:03}")).unwrap(),
                        quantity: (w * 7 + s * 3 + 1) as f64,
                        unit_cost: 1.0,
                        distance: None,
                    });
                }
            }
        }
        let assignment = Assignment::from_shipments(shipments);
        Graph::from_assignment(&assignment, &[], &Canvas::default())
    }

    #[test]
    fn positions_stay_on_the_canvas() {
        let config = LayoutConfig::default();
        let outcome = layout(&graph(6, 9), &config, &RunContext::detached()).unwrap();

        for node in outcome.graph.nodes() {
            let p = node.position;
            assert!((50.0..=750.0).contains(&p.x), "{p:?}");
            assert!((50.0..=450.0).contains(&p.y), "{p:?}");
        }
        assert!(outcome.steps <= 50);
    }

    #[test]
    fn layout_is_reproducible() {
        let g = graph(4, 7);
        let config = LayoutConfig::default().with_seed(42);
        let first = layout(&g, &config, &RunContext::detached()).unwrap();
        let second = layout(&g, &config, &RunContext::detached()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn grid_and_pairwise_agree() {
        let g = graph(12, 30);
        let pairwise = LayoutConfig::default().with_neighbor_search(NeighborSearch::Pairwise);
        let grid = LayoutConfig::default().with_neighbor_search(NeighborSearch::Grid);

        let a = layout(&g, &pairwise, &RunContext::detached()).unwrap();
        let b = layout(&g, &grid, &RunContext::detached()).unwrap();
        assert_eq!(a.graph, b.graph);
        assert_eq!(a.steps, b.steps);
    }

    #[test]
    fn input_graph_is_untouched() {
        let g = graph(2, 2);
        let before = g.clone();
        let outcome = layout(&g, &LayoutConfig::default(), &RunContext::detached()).unwrap();

        assert_eq!(g, before);
        assert_ne!(outcome.graph.positions(), before.positions());
    }

    #[test]
    fn lone_node_converges_immediately() {
        let nodes = vec![Node {
            id: "W1".into(),
            kind: NodeKind::Warehouse,
            position: Position::new(400.0, 100.0),
        }];
        let g = Graph::from_parts(nodes, Vec::new()).unwrap();
        let outcome = layout(&g, &LayoutConfig::default(), &RunContext::detached()).unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.graph, g);
    }

    #[test]
    fn zero_iterations_is_exhausted_without_moving() {
        let g = graph(2, 3);
        let config = LayoutConfig::default().with_max_iterations(0);
        let mut engine = LayoutEngine::new(&g, &config).unwrap();

        assert_eq!(engine.step(), LayoutState::Exhausted { step: 0 });
        assert_eq!(engine.snapshot(), &g);
    }

    #[test]
    fn crowded_rows_start_inside_the_margins() {
        let g = graph(2, 20);
        let config = LayoutConfig::default().with_max_iterations(0);
        let outcome = layout(&g, &config, &RunContext::detached()).unwrap();

        assert_eq!(outcome.steps, 0);
        for node in outcome.graph.nodes() {
            assert!((50.0..=750.0).contains(&node.position.x), "{:?}", node.position);
            assert!((50.0..=450.0).contains(&node.position.y), "{:?}", node.position);
        }

        let stray = Graph::from_parts(
            vec![Node {
                id: "W1".into(),
                kind: NodeKind::Warehouse,
                position: Position::new(-30.0, 900.0),
            }],
            Vec::new(),
        )
        .unwrap();
        let engine = LayoutEngine::new(&stray, &config).unwrap();
        assert_eq!(engine.snapshot().positions(), vec![Position::new(50.0, 450.0)]);
    }

    #[test]
    fn state_machine_advances_one_step_at_a_time() {
        let g = graph(3, 3);
        let config = LayoutConfig::default()
            .with_max_iterations(3)
            .with_convergence_threshold(0.0);
        let mut engine = LayoutEngine::new(&g, &config).unwrap();

        assert_eq!(engine.state(), LayoutState::Ready);
        assert_eq!(engine.step(), LayoutState::Running { step: 1 });
        assert_eq!(engine.step(), LayoutState::Running { step: 2 });
        assert_eq!(engine.step(), LayoutState::Exhausted { step: 3 });
        assert_eq!(engine.step(), LayoutState::Exhausted { step: 3 });
    }

    #[test]
    fn coincident_nodes_are_separated() {
        let nodes = vec![
            Node {
                id: "W1".into(),
                kind: NodeKind::Warehouse,
                position: Position::new(400.0, 100.0),
            },
            Node {
                id: "W2".into(),
                kind: NodeKind::Warehouse,
                position: Position::new(400.0, 100.0),
            },
        ];
        let g = Graph::from_parts(nodes, Vec::<Edge>::new()).unwrap();
        let config = LayoutConfig::default().with_max_iterations(1).with_seed(7);
        let outcome = layout(&g, &config, &RunContext::detached()).unwrap();

        let [a, b] = [outcome.graph.nodes()[0].position, outcome.graph.nodes()[1].position];
        assert!(a.distance_to(&b) > 0.0);

        let again = layout(&g, &config, &RunContext::detached()).unwrap();
        assert_eq!(again.graph, outcome.graph);
    }

    #[test]
    fn reseed_restores_row_positions() {
        let g = graph(2, 2);
        let moved = layout(&g, &LayoutConfig::default(), &RunContext::detached()).unwrap();
        let config = LayoutConfig::default().with_reseed(true).with_max_iterations(0);
        let engine = LayoutEngine::new(&moved.graph, &config).unwrap();

        assert_eq!(engine.snapshot().positions(), g.positions());
    }

    #[test]
    fn cancellation_keeps_the_caller_snapshot() {
        let g = graph(3, 3);
        let ctx = RunContext::detached();
        ctx.token().cancel();

        let err = layout(&g, &LayoutConfig::default(), &ctx).unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    #[test]
    fn progress_reaches_completion() {
        let ctx = RunContext::detached();
        layout(&graph(3, 4), &LayoutConfig::default(), &ctx).unwrap();
        assert_eq!(ctx.progress(), 100);
    }

    #[test]
    fn bad_config_is_invalid_input() {
        let mut config = LayoutConfig::default();
        config.row_damping = 1.5;
        assert!(LayoutEngine::new(&graph(1, 1), &config).unwrap_err().is_invalid_input());

        let mut config = LayoutConfig::default();
        config.repulsion_cutoff = 0.0;
        assert!(config.validate().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_graph_stays_in_bounds(warehouses in 0usize..8, stores in 0usize..12, seed in any::<u64>()) {
            let g = graph(warehouses, stores);
            let config = LayoutConfig::default().with_seed(seed);
            let outcome = layout(&g, &config, &RunContext::detached()).unwrap();

            for node in outcome.graph.nodes() {
                prop_assert!((50.0..=750.0).contains(&node.position.x));
                prop_assert!((50.0..=450.0).contains(&node.position.y));
            }
        }
    }
}
