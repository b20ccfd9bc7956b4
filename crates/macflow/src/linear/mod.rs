//! Sparse linear systems and iterative solvers for the pressure equation.
//!
//! The pressure matrix is symmetric positive semi-definite with at most seven
//! entries per row, stored in compressed sparse row form. Solvers are
//! swappable behind [`LinearSystemSolver`]; each stops on a fixed iteration
//! cap or a relative residual tolerance, whichever comes first.

mod cg;
mod gauss_seidel;

pub use cg::ConjugateGradient;
pub use gauss_seidel::GaussSeidel;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Compressed Sparse Row matrix
///
/// - `values`: non-zero entries in row-major order
/// - `col_indices`: column of each value
/// - `row_ptrs`: start of each row in `values`, `row_ptrs[n] == nnz`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsrMatrix {
    num_rows: usize,
    values: Vec<f64>,
    col_indices: Vec<usize>,
    row_ptrs: Vec<usize>,
}

impl CsrMatrix {
    /// Square matrix from per-row `(column, value)` lists.
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>) -> Self {
        let num_rows = rows.len();
        let nnz = rows.iter().map(Vec::len).sum();
        let mut values = Vec::with_capacity(nnz);
        let mut col_indices = Vec::with_capacity(nnz);
        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);

        for row in rows {
            for (col, value) in row {
                debug_assert!(col < num_rows);
                col_indices.push(col);
                values.push(value);
            }
            row_ptrs.push(values.len());
        }

        Self {
            num_rows,
            values,
            col_indices,
            row_ptrs,
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_rows((0..n).map(|i| vec![(i, 1.0)]).collect())
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `(column, value)` pairs of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptrs[i]..self.row_ptrs[i + 1];
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Entry (i, j), zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.row(i).filter(|&(col, _)| col == j).map(|(_, v)| v).sum()
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.num_rows).map(|i| self.get(i, i)).collect()
    }

    /// y = A x
    pub fn matvec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.num_rows);
        debug_assert_eq!(y.len(), self.num_rows);
        y.par_iter_mut().enumerate().for_each(|(i, out)| {
            *out = self.row(i).map(|(col, value)| value * x[col]).sum();
        });
    }

    /// True if every stored entry has a matching transposed entry.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.num_rows).all(|i| {
            self.row(i)
                .all(|(j, value)| (self.get(j, i) - value).abs() <= tolerance)
        })
    }
}

/// Ax = b together with the solution buffer it is solved into.
#[derive(Clone, Debug, Default)]
pub struct LinearSystem {
    pub matrix: CsrMatrix,
    pub rhs: Vec<f64>,
    pub solution: Vec<f64>,
}

impl LinearSystem {
    pub fn new(matrix: CsrMatrix, rhs: Vec<f64>) -> Self {
        let n = rhs.len();
        debug_assert_eq!(matrix.num_rows(), n);
        Self {
            matrix,
            rhs,
            solution: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// ||b - Ax|| for the current solution.
    pub fn residual_norm(&self) -> f64 {
        let mut ax = vec![0.0; self.len()];
        self.matrix.matvec(&self.solution, &mut ax);
        norm_of_difference(&self.rhs, &ax)
    }

    pub fn solve_with(&mut self, solver: &dyn LinearSystemSolver) -> SolverOutcome {
        solver.solve(&self.matrix, &self.rhs, &mut self.solution)
    }
}

/// How a solve ended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub converged: bool,
    pub iterations: usize,
    /// Final relative residual ||b - Ax|| / ||b||
    pub residual: f64,
}

impl SolverOutcome {
    /// Trivial solve of a zero right-hand side.
    pub fn trivial() -> Self {
        Self {
            converged: true,
            iterations: 0,
            residual: 0.0,
        }
    }
}

/// Solves Ax = b for a symmetric positive semi-definite A.
///
/// `solution` holds the initial guess on entry and the result on return,
/// converged or not.
pub trait LinearSystemSolver: Send + Sync {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], solution: &mut [f64]) -> SolverOutcome;
}

/// Built-in solver strategies, selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    #[default]
    ConjugateGradient,
    GaussSeidel,
}

impl LinearSolverKind {
    pub fn build(self, max_iterations: usize, tolerance: f64) -> Box<dyn LinearSystemSolver> {
        match self {
            LinearSolverKind::ConjugateGradient => Box::new(ConjugateGradient {
                max_iterations,
                tolerance,
            }),
            LinearSolverKind::GaussSeidel => Box::new(GaussSeidel {
                max_iterations,
                tolerance,
            }),
        }
    }
}

/// Make `rhs` consistent with a singular `matrix`.
///
/// Rows are grouped into blocks connected through off-diagonal entries. A
/// block where no row is strictly diagonally dominant has the constant
/// vector in its null space, so the mean of its right-hand side is removed.
/// Returns the number of blocks adjusted.
pub(crate) fn remove_null_space(matrix: &CsrMatrix, rhs: &mut [f64]) -> usize {
    let n = matrix.num_rows();
    let mut visited = vec![false; n];
    let mut stack = Vec::new();
    let mut members = Vec::new();
    let mut adjusted = 0;

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        members.clear();
        let mut anchored = false;

        while let Some(i) = stack.pop() {
            members.push(i);
            let mut diagonal = 0.0_f64;
            let mut off_diagonal = 0.0_f64;
            for (j, value) in matrix.row(i) {
                if j == i {
                    diagonal += value;
                    continue;
                }
                off_diagonal += value.abs();
                if !visited[j] {
                    visited[j] = true;
                    stack.push(j);
                }
            }
            if diagonal - off_diagonal > 1e-9 * diagonal.abs() {
                anchored = true;
            }
        }

        if !anchored {
            let mean = members.iter().map(|&i| rhs[i]).sum::<f64>() / members.len() as f64;
            for &i in &members {
                rhs[i] -= mean;
            }
            adjusted += 1;
        }
    }
    adjusted
}

#[inline]
pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum()
}

#[inline]
pub(crate) fn norm(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

fn norm_of_difference(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D Laplacian with Dirichlet ends: SPD tridiagonal [2 -1; -1 2 -1; ...]
    pub(super) fn laplacian_1d(n: usize) -> CsrMatrix {
        let rows = (0..n)
            .map(|i| {
                let mut row = Vec::new();
                if i > 0 {
                    row.push((i - 1, -1.0));
                }
                row.push((i, 2.0));
                if i + 1 < n {
                    row.push((i + 1, -1.0));
                }
                row
            })
            .collect();
        CsrMatrix::from_rows(rows)
    }

    #[test]
    fn test_csr_layout() {
        let a = laplacian_1d(4);
        assert_eq!(a.num_rows(), 4);
        assert_eq!(a.nnz(), 10);
        assert_eq!(a.get(1, 0), -1.0);
        assert_eq!(a.get(0, 3), 0.0);
        assert_eq!(a.diagonal(), vec![2.0; 4]);
        assert!(a.is_symmetric(0.0));
    }

    #[test]
    fn test_matvec() {
        let a = laplacian_1d(3);
        let mut y = vec![0.0; 3];
        a.matvec(&[1.0, 2.0, 3.0], &mut y);
        assert_eq!(y, vec![0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_null_space_removed_per_block() {
        // Two disconnected Neumann pairs and one anchored row
        let a = CsrMatrix::from_rows(vec![
            vec![(0, 1.0), (1, -1.0)],
            vec![(0, -1.0), (1, 1.0)],
            vec![(2, 1.0), (3, -1.0)],
            vec![(2, -1.0), (3, 1.0)],
            vec![(4, 2.0)],
        ]);
        let mut rhs = vec![3.0, 1.0, -1.0, -1.0, 5.0];
        assert_eq!(remove_null_space(&a, &mut rhs), 2);
        assert_eq!(rhs, vec![1.0, -1.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_every_kind_solves_small_system() {
        for kind in [LinearSolverKind::ConjugateGradient, LinearSolverKind::GaussSeidel] {
            let mut system = LinearSystem::new(laplacian_1d(8), vec![1.0; 8]);
            let outcome = system.solve_with(kind.build(2000, 1e-10).as_ref());
            assert!(outcome.converged, "{:?} did not converge: {:?}", kind, outcome);
            assert!(system.residual_norm() < 1e-8, "{:?} residual {}", kind, system.residual_norm());
        }
    }
}
