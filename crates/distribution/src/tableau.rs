//! Balanced transportation tableau shared by the Vogel and MODI phases.

use stockroute_core::{EngineError, EngineResult};

/// A balanced `rows x cols` tableau with its current basic solution.
///
/// The basis always holds exactly `rows + cols - 1` cells forming a spanning
/// tree over the row and column nodes. Basic cells may carry a zero
/// quantity (degenerate solution); they are never dropped from the basis.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    pub rows: usize,
    pub cols: usize,
    pub supply: Vec<f64>,
    pub demand: Vec<f64>,
    cost: Vec<f64>,
    x: Vec<f64>,
    basic: Vec<bool>,
    /// Quantity tolerance, scaled to the problem size.
    pub eps: f64,
}

impl Tableau {
    pub fn new(supply: Vec<f64>, demand: Vec<f64>, cost: Vec<f64>) -> Self {
        let rows = supply.len();
        let cols = demand.len();
        debug_assert_eq!(cost.len(), rows * cols);
        let scale = supply.iter().sum::<f64>().max(1.0);
        Self {
            rows,
            cols,
            supply,
            demand,
            cost,
            x: vec![0.0; rows * cols],
            basic: vec![false; rows * cols],
            eps: 1e-9 * scale,
        }
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }

    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.cost[self.idx(i, j)]
    }

    pub fn quantity(&self, i: usize, j: usize) -> f64 {
        self.x[self.idx(i, j)]
    }

    pub fn is_basic(&self, i: usize, j: usize) -> bool {
        self.basic[self.idx(i, j)]
    }

    pub fn set_basic(&mut self, i: usize, j: usize, quantity: f64) {
        let k = self.idx(i, j);
        self.basic[k] = true;
        self.x[k] = quantity;
    }

    pub fn clear_basic(&mut self, i: usize, j: usize) {
        let k = self.idx(i, j);
        self.basic[k] = false;
        self.x[k] = 0.0;
    }

    pub fn add(&mut self, i: usize, j: usize, delta: f64) {
        let k = self.idx(i, j);
        self.x[k] += delta;
    }

    pub fn basic_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows * self.cols)
            .filter(|&k| self.basic[k])
            .map(|k| (k / self.cols, k % self.cols))
    }

    pub fn objective(&self) -> f64 {
        self.x.iter().zip(&self.cost).map(|(x, c)| x * c).sum()
    }

    /// Adjacency over tree nodes: rows are `0..rows`, columns `rows..rows + cols`.
    pub fn basis_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.rows + self.cols];
        for (i, j) in self.basic_cells() {
            adjacency[i].push(self.rows + j);
            adjacency[self.rows + j].push(i);
        }
        adjacency
    }

    /// Check the spanning-tree shape of the basis.
    pub fn check_basis(&self) -> EngineResult<()> {
        let expected = self.rows + self.cols - 1;
        let count = self.basic_cells().count();
        if count != expected {
            return Err(EngineError::consistency(
                "basis size",
                expected as f64,
                count as f64,
            ));
        }
        Ok(())
    }
}
