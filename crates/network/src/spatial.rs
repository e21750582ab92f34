//! Uniform grid for finding node pairs closer than a cutoff radius.

use std::collections::BTreeMap;

use crate::graph::Position;

/// Buckets of node indices keyed by grid cell.
///
/// With the cell size equal to the cutoff, any pair within the cutoff lies in
/// the same or in neighbouring cells.
#[derive(Debug)]
pub(crate) struct SpatialGrid {
    buckets: BTreeMap<(i64, i64), Vec<usize>>,
}

/// Forward half of the 3x3 neighbourhood, so each cell pair is visited once.
const FORWARD: [(i64, i64); 4] = [(1, -1), (1, 0), (1, 1), (0, 1)];

impl SpatialGrid {
    pub fn build(positions: &[Position], cell: f64) -> Self {
        let mut buckets: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for (k, p) in positions.iter().enumerate() {
            let key = ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);
            buckets.entry(key).or_default().push(k);
        }
        Self { buckets }
    }

    /// Candidate pairs `(a, b)` with `a < b`, in ascending order.
    ///
    /// The order matches a plain nested loop over all pairs, so forces summed
    /// over these pairs agree bit for bit with the quadratic scan.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (&(cx, cy), members) in &self.buckets {
            for (n, &a) in members.iter().enumerate() {
                for &b in &members[n + 1..] {
                    pairs.push((a.min(b), a.max(b)));
                }
            }
            for (dx, dy) in FORWARD {
                let Some(others) = self.buckets.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &a in members {
                    for &b in others {
                        pairs.push((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }
}

/// Every pair `(a, b)` with `a < b`.
pub(crate) fn all_pairs(count: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..count).flat_map(move |a| (a + 1..count).map(move |b| (a, b)))
}
