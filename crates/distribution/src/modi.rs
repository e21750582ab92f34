//! MODI (u-v) improvement with stepping-stone pivots.
//!
//! Starting from a spanning-tree basis, repeatedly price every non-basic
//! cell with the dual potentials `u[i] + v[j] = c[i][j]` and bring in a
//! cell with a negative reduced cost until none remains.

use std::collections::VecDeque;

use stockroute_core::{EngineError, EngineResult, RunContext};

use crate::tableau::Tableau;

/// Entering-cell selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PivotRule {
    /// Most negative reduced cost; ties go to the lowest `(row, col)`.
    Dantzig,
    /// First improving cell in `(row, col)` order. Cannot cycle.
    Bland,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ModiLimits {
    pub max_pivots: usize,
    /// Consecutive zero-step pivots tolerated before switching to Bland's rule.
    pub degenerate_streak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModiOutcome {
    pub pivots: usize,
    pub rule: PivotRule,
}

/// Drive `tableau` to optimality.
pub(crate) fn improve(
    tableau: &mut Tableau,
    limits: ModiLimits,
    ctx: &RunContext,
) -> EngineResult<ModiOutcome> {
    let cost_tol = 1e-9
        * (0..tableau.rows)
            .flat_map(|i| (0..tableau.cols).map(move |j| (i, j)))
            .map(|(i, j)| tableau.cost(i, j).abs())
            .fold(1.0, f64::max);
    let work = tableau.rows * tableau.cols;

    let mut rule = if limits.degenerate_streak == 0 {
        PivotRule::Bland
    } else {
        PivotRule::Dantzig
    };
    let mut pivots = 0;
    let mut streak = 0;

    loop {
        ctx.checkpoint()?;

        let (u, v) = potentials(tableau)?;
        let Some((i, j)) = entering_cell(tableau, &u, &v, cost_tol, rule) else {
            return Ok(ModiOutcome { pivots, rule });
        };
        if pivots == limits.max_pivots {
            return Err(EngineError::IterationLimit {
                limit: limits.max_pivots,
            });
        }

        let theta = pivot(tableau, i, j)?;
        pivots += 1;

        if theta <= tableau.eps {
            streak += 1;
            if rule == PivotRule::Dantzig && streak >= limits.degenerate_streak {
                tracing::debug!(pivots, streak, "degenerate streak, switching to Bland's rule");
                rule = PivotRule::Bland;
            }
        } else {
            streak = 0;
        }

        ctx.report_between(10, 99, pivots, work);
    }
}

/// Dual potentials over the basis tree, rooted at `u[0] = 0`.
pub(crate) fn potentials(tableau: &Tableau) -> EngineResult<(Vec<f64>, Vec<f64>)> {
    let rows = tableau.rows;
    let adjacency = tableau.basis_adjacency();
    let mut value: Vec<Option<f64>> = vec![None; rows + tableau.cols];
    let mut queue = VecDeque::new();

    value[0] = Some(0.0);
    queue.push_back(0);

    while let Some(node) = queue.pop_front() {
        let known = value[node].unwrap_or_default();
        for &next in &adjacency[node] {
            if value[next].is_some() {
                continue;
            }
            let c = if node < rows {
                tableau.cost(node, next - rows)
            } else {
                tableau.cost(next, node - rows)
            };
            value[next] = Some(c - known);
            queue.push_back(next);
        }
    }

    let reached = value.iter().filter(|v| v.is_some()).count();
    if reached != value.len() {
        return Err(EngineError::consistency(
            "basis connectivity",
            value.len() as f64,
            reached as f64,
        ));
    }

    let mut value = value.into_iter().map(Option::unwrap_or_default);
    let u = value.by_ref().take(rows).collect();
    let v = value.collect();
    Ok((u, v))
}

fn entering_cell(
    tableau: &Tableau,
    u: &[f64],
    v: &[f64],
    tol: f64,
    rule: PivotRule,
) -> Option<(usize, usize)> {
    let mut best: Option<(f64, usize, usize)> = None;

    for i in 0..tableau.rows {
        for j in 0..tableau.cols {
            if tableau.is_basic(i, j) {
                continue;
            }
            let reduced = tableau.cost(i, j) - u[i] - v[j];
            if reduced >= -tol {
                continue;
            }
            match rule {
                PivotRule::Bland => return Some((i, j)),
                PivotRule::Dantzig => {
                    if best.is_none_or(|(r, _, _)| reduced < r) {
                        best = Some((reduced, i, j));
                    }
                }
            }
        }
    }

    best.map(|(_, i, j)| (i, j))
}

/// Bring `(i, j)` into the basis along its stepping-stone cycle.
///
/// Returns the step size, which is zero for a degenerate pivot.
fn pivot(tableau: &mut Tableau, i: usize, j: usize) -> EngineResult<f64> {
    let path = tree_path(tableau, i, tableau.rows + j)?;
    let rows = tableau.rows;

    // Edge k joins path[k] and path[k + 1]; even edges lose, odd edges gain.
    let cells: Vec<(usize, usize, bool)> = path
        .windows(2)
        .enumerate()
        .map(|(k, pair)| {
            let (a, b) = (pair[0], pair[1]);
            let (row, col) = if a < rows { (a, b - rows) } else { (b, a - rows) };
            (row, col, k % 2 == 0)
        })
        .collect();

    let (leave_row, leave_col) = cells
        .iter()
        .filter(|&&(_, _, minus)| minus)
        .map(|&(r, c, _)| (r, c))
        .min_by(|&(ra, ca), &(rb, cb)| {
            tableau
                .quantity(ra, ca)
                .total_cmp(&tableau.quantity(rb, cb))
                .then((ra, ca).cmp(&(rb, cb)))
        })
        .ok_or_else(|| EngineError::consistency("stepping-stone cycle", 1.0, 0.0))?;

    let theta = tableau.quantity(leave_row, leave_col).max(0.0);

    tableau.set_basic(i, j, theta);
    for &(row, col, minus) in &cells {
        tableau.add(row, col, if minus { -theta } else { theta });
        if minus && tableau.quantity(row, col).abs() <= tableau.eps {
            tableau.set_basic(row, col, 0.0);
        }
    }
    tableau.clear_basic(leave_row, leave_col);

    Ok(theta)
}

/// Node path through the basis tree from `from` to `to`, both inclusive.
fn tree_path(tableau: &Tableau, from: usize, to: usize) -> EngineResult<Vec<usize>> {
    let adjacency = tableau.basis_adjacency();
    let mut parent: Vec<Option<usize>> = vec![None; adjacency.len()];
    let mut queue = VecDeque::from([from]);
    parent[from] = Some(from);

    while let Some(node) = queue.pop_front() {
        if node == to {
            break;
        }
        for &next in &adjacency[node] {
            if parent[next].is_none() {
                parent[next] = Some(node);
                queue.push_back(next);
            }
        }
    }

    let mut path = vec![to];
    let mut node = to;
    while node != from {
        node = parent[node]
            .ok_or_else(|| EngineError::consistency("basis connectivity", 1.0, 0.0))?;
        path.push(node);
    }
    path.reverse();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vogel;

    fn limits() -> ModiLimits {
        ModiLimits {
            max_pivots: 1_000,
            degenerate_streak: 7,
        }
    }

    fn textbook() -> Tableau {
        Tableau::new(
            vec![15.0, 25.0, 10.0],
            vec![5.0, 15.0, 15.0, 15.0],
            vec![
                10.0, 2.0, 20.0, 11.0, //
                12.0, 7.0, 9.0, 20.0, //
                4.0, 14.0, 16.0, 18.0,
            ],
        )
    }

    #[test]
    fn reaches_textbook_optimum() {
        let mut t = textbook();
        vogel::initial_basis(&mut t);
        let outcome = improve(&mut t, limits(), &RunContext::detached()).unwrap();

        assert_eq!(t.objective(), 435.0);
        assert!(outcome.pivots >= 1);
        t.check_basis().unwrap();

        let (u, v) = potentials(&t).unwrap();
        for i in 0..t.rows {
            for j in 0..t.cols {
                assert!(t.cost(i, j) - u[i] - v[j] >= -1e-9);
            }
        }
    }

    #[test]
    fn potentials_satisfy_basic_cells() {
        let mut t = textbook();
        vogel::initial_basis(&mut t);
        let (u, v) = potentials(&t).unwrap();

        assert_eq!(u[0], 0.0);
        for (i, j) in t.basic_cells() {
            assert_eq!(u[i] + v[j], t.cost(i, j));
        }
    }

    #[test]
    fn disconnected_basis_is_reported() {
        let mut t = Tableau::new(vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0; 4]);
        t.set_basic(0, 0, 1.0);
        t.set_basic(1, 1, 1.0);

        let err = potentials(&t).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { what: "basis connectivity", .. }));
    }

    #[test]
    fn pivot_limit_is_enforced() {
        let mut t = textbook();
        vogel::initial_basis(&mut t);
        let err = improve(
            &mut t,
            ModiLimits {
                max_pivots: 0,
                degenerate_streak: 7,
            },
            &RunContext::detached(),
        )
        .unwrap_err();

        assert_eq!(err, EngineError::IterationLimit { limit: 0 });
    }

    #[test]
    fn bland_rule_reaches_the_same_optimum() {
        let mut t = textbook();
        vogel::initial_basis(&mut t);
        let outcome = improve(
            &mut t,
            ModiLimits {
                max_pivots: 1_000,
                degenerate_streak: 0,
            },
            &RunContext::detached(),
        )
        .unwrap();

        assert_eq!(t.objective(), 435.0);
        assert_eq!(outcome.rule, PivotRule::Bland);
    }

    #[test]
    fn cancellation_stops_before_pivoting() {
        let mut t = textbook();
        vogel::initial_basis(&mut t);
        let ctx = RunContext::detached();
        ctx.token().cancel();

        assert_eq!(improve(&mut t, limits(), &ctx), Err(EngineError::Cancelled));
    }
}
