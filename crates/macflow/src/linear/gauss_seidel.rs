//! Sequential Gauss-Seidel sweeps.

use super::{norm, CsrMatrix, LinearSystemSolver, SolverOutcome};
use serde::{Deserialize, Serialize};

/// Forward Gauss-Seidel. Slow on large grids but simple and robust; mostly
/// useful as a reference for the CG results.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussSeidel {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for GaussSeidel {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-6,
        }
    }
}

impl GaussSeidel {
    fn relative_residual(matrix: &CsrMatrix, rhs: &[f64], x: &[f64], b_norm: f64) -> f64 {
        let mut ax = vec![0.0; rhs.len()];
        matrix.matvec(x, &mut ax);
        let r: Vec<f64> = rhs.iter().zip(&ax).map(|(b, a)| b - a).collect();
        norm(&r) / b_norm
    }
}

impl LinearSystemSolver for GaussSeidel {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> SolverOutcome {
        let b_norm = norm(rhs);
        if b_norm < 1e-30 {
            x.fill(0.0);
            return SolverOutcome::trivial();
        }

        let diagonal = matrix.diagonal();
        let mut residual = Self::relative_residual(matrix, rhs, x, b_norm);

        for iter in 0..self.max_iterations {
            if residual < self.tolerance {
                return SolverOutcome {
                    converged: true,
                    iterations: iter,
                    residual,
                };
            }

            for i in 0..rhs.len() {
                if diagonal[i].abs() < 1e-300 {
                    continue;
                }
                let off_diagonal: f64 = matrix
                    .row(i)
                    .filter(|&(col, _)| col != i)
                    .map(|(col, value)| value * x[col])
                    .sum();
                x[i] = (rhs[i] - off_diagonal) / diagonal[i];
            }

            residual = Self::relative_residual(matrix, rhs, x, b_norm);
        }

        SolverOutcome {
            converged: residual < self.tolerance,
            iterations: self.max_iterations,
            residual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::tests::laplacian_1d;
    use crate::linear::ConjugateGradient;

    #[test]
    fn test_matches_conjugate_gradient() {
        let a = laplacian_1d(12);
        let b: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).sin()).collect();

        let mut x_gs = vec![0.0; 12];
        let mut x_cg = vec![0.0; 12];
        let gs = GaussSeidel {
            max_iterations: 10_000,
            tolerance: 1e-12,
        }
        .solve(&a, &b, &mut x_gs);
        let cg = ConjugateGradient {
            max_iterations: 100,
            tolerance: 1e-12,
        }
        .solve(&a, &b, &mut x_cg);

        assert!(gs.converged && cg.converged, "gs {:?}, cg {:?}", gs, cg);
        for (g, c) in x_gs.iter().zip(&x_cg) {
            assert!((g - c).abs() < 1e-8, "{} vs {}", g, c);
        }
    }

    #[test]
    fn test_single_sweep_is_not_converged() {
        let mut x = vec![0.0; 20];
        let outcome = GaussSeidel {
            max_iterations: 1,
            tolerance: 1e-12,
        }
        .solve(&laplacian_1d(20), &vec![1.0; 20], &mut x);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
    }
}
