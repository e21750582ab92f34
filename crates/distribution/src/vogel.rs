//! Vogel's Approximation Method (initial basic feasible solution).
//!
//! Each round picks the active line (row or column) with the largest penalty,
//! the gap between its two cheapest active cells, and allocates as much as
//! possible to that line's cheapest cell. Ties go to the cheaper cell, then
//! to the lowest row, then the lowest column.
//!
//! Exactly one line is crossed out per allocation, so `rows + cols - 1`
//! cells become basic and the basis is a spanning tree even when a row and a
//! column are exhausted together; the surviving line keeps a zero
//! requirement and later receives a zero-valued basic cell.

use crate::tableau::Tableau;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    penalty: f64,
    cost: f64,
    row: usize,
    col: usize,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.penalty != other.penalty {
            return self.penalty > other.penalty;
        }
        if self.cost != other.cost {
            return self.cost < other.cost;
        }
        (self.row, self.col) < (other.row, other.col)
    }
}

/// Fill `tableau` with a Vogel starting basis.
pub(crate) fn initial_basis(tableau: &mut Tableau) {
    let (rows, cols) = (tableau.rows, tableau.cols);
    let mut row_left = tableau.supply.clone();
    let mut col_left = tableau.demand.clone();
    let mut row_active = vec![true; rows];
    let mut col_active = vec![true; cols];
    let (mut active_rows, mut active_cols) = (rows, cols);

    while active_rows > 0 && active_cols > 0 {
        let mut best: Option<Candidate> = None;

        for i in (0..rows).filter(|&i| row_active[i]) {
            let (penalty, col) = line_penalty((0..cols).filter(|&j| col_active[j]), |j| tableau.cost(i, j));
            offer(&mut best, Candidate { penalty, cost: tableau.cost(i, col), row: i, col });
        }
        for j in (0..cols).filter(|&j| col_active[j]) {
            let (penalty, row) = line_penalty((0..rows).filter(|&i| row_active[i]), |i| tableau.cost(i, j));
            offer(&mut best, Candidate { penalty, cost: tableau.cost(row, j), row, col: j });
        }

        let Some(Candidate { row: i, col: j, .. }) = best else {
            break;
        };

        let quantity = row_left[i].min(col_left[j]);
        tableau.set_basic(i, j, quantity);
        row_left[i] -= quantity;
        col_left[j] -= quantity;

        let cross_row = if active_rows == 1 {
            false
        } else if active_cols == 1 {
            true
        } else {
            row_left[i] <= col_left[j]
        };

        if cross_row {
            row_active[i] = false;
            active_rows -= 1;
        } else {
            col_active[j] = false;
            active_cols -= 1;
        }
    }
}

fn offer(best: &mut Option<Candidate>, candidate: Candidate) {
    match best {
        Some(current) if !candidate.beats(current) => {}
        _ => *best = Some(candidate),
    }
}

/// Penalty of a line and the index of its cheapest cell (lowest index on ties).
///
/// A line with a single active cell has penalty 0.
fn line_penalty(indices: impl Iterator<Item = usize>, cost: impl Fn(usize) -> f64) -> (f64, usize) {
    let mut cheapest: Option<(f64, usize)> = None;
    let mut second: Option<f64> = None;

    for k in indices {
        let c = cost(k);
        match cheapest {
            None => cheapest = Some((c, k)),
            Some((best, _)) if c < best => {
                second = Some(best);
                cheapest = Some((c, k));
            }
            Some(_) => {
                if second.is_none_or(|s| c < s) {
                    second = Some(c);
                }
            }
        }
    }

    match (cheapest, second) {
        (Some((best, k)), Some(next)) => (next - best, k),
        (Some((_, k)), None) => (0.0, k),
        (None, _) => (0.0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tableau(supply: &[f64], demand: &[f64], cost: &[&[f64]]) -> Tableau {
        Tableau::new(
            supply.to_vec(),
            demand.to_vec(),
            cost.iter().flat_map(|row| row.iter().copied()).collect(),
        )
    }

    #[test]
    fn penalty_uses_two_cheapest_cells() {
        let costs = [7.0, 3.0, 5.0, 3.0];
        assert_eq!(line_penalty(0..4, |k| costs[k]), (0.0, 1));
        let costs = [7.0, 3.0, 5.0];
        assert_eq!(line_penalty(0..3, |k| costs[k]), (2.0, 1));
        assert_eq!(line_penalty(2..3, |k| costs[k]), (0.0, 2));
    }

    #[test]
    fn textbook_instance_gets_feasible_tree() {
        // Three sources, four destinations, balanced at 50 units.
        let mut t = tableau(
            &[15.0, 25.0, 10.0],
            &[5.0, 15.0, 15.0, 15.0],
            &[
                &[10.0, 2.0, 20.0, 11.0],
                &[12.0, 7.0, 9.0, 20.0],
                &[4.0, 14.0, 16.0, 18.0],
            ],
        );
        initial_basis(&mut t);

        t.check_basis().unwrap();
        for i in 0..3 {
            let shipped: f64 = (0..4).map(|j| t.quantity(i, j)).sum();
            assert!((shipped - t.supply[i]).abs() < 1e-9);
        }
        for j in 0..4 {
            let received: f64 = (0..3).map(|i| t.quantity(i, j)).sum();
            assert!((received - t.demand[j]).abs() < 1e-9);
        }
        // Vogel's start for this classic instance; the optimum is 435.
        assert_eq!(t.objective(), 475.0);
        assert_eq!(t.quantity(1, 1), 0.0);
        assert!(t.is_basic(1, 1));
    }

    #[test]
    fn simultaneous_exhaustion_keeps_a_zero_basic_cell() {
        let mut t = tableau(&[10.0, 10.0], &[10.0, 10.0], &[&[1.0, 5.0], &[5.0, 1.0]]);
        initial_basis(&mut t);

        t.check_basis().unwrap();
        let zeros = t.basic_cells().filter(|&(i, j)| t.quantity(i, j) == 0.0).count();
        assert_eq!(zeros, 1);
        assert_eq!(t.objective(), 20.0);
    }
}
