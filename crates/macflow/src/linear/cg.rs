//! Jacobi-preconditioned Conjugate Gradient.

use super::{dot, norm, CsrMatrix, LinearSystemSolver, SolverOutcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Preconditioned CG for symmetric positive (semi-)definite systems.
///
/// Singular systems converge as long as the right-hand side is consistent
/// (orthogonal to the null space).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConjugateGradient {
    pub max_iterations: usize,
    /// Relative residual ||r|| / ||b|| to stop at
    pub tolerance: f64,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

impl LinearSystemSolver for ConjugateGradient {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> SolverOutcome {
        let n = rhs.len();
        let b_norm = norm(rhs);
        if b_norm < 1e-30 {
            x.fill(0.0);
            return SolverOutcome::trivial();
        }

        let inv_diag: Vec<f64> = matrix
            .diagonal()
            .into_iter()
            .map(|d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
            .collect();

        // r = b - Ax
        let mut r = vec![0.0; n];
        matrix.matvec(x, &mut r);
        r.par_iter_mut().zip(rhs).for_each(|(ri, &bi)| *ri = bi - *ri);

        let mut rel_residual = norm(&r) / b_norm;
        if rel_residual < self.tolerance {
            return SolverOutcome {
                converged: true,
                iterations: 0,
                residual: rel_residual,
            };
        }

        let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
        let mut p = z.clone();
        let mut q = vec![0.0; n];
        let mut rho = dot(&r, &z);

        for iter in 0..self.max_iterations {
            // Breakdown: r . z vanished without r converging
            if rho.abs() < 1e-300 {
                return SolverOutcome {
                    converged: false,
                    iterations: iter,
                    residual: rel_residual,
                };
            }

            // q = A p
            matrix.matvec(&p, &mut q);

            let pq = dot(&p, &q);
            if pq.abs() < 1e-300 {
                return SolverOutcome {
                    converged: false,
                    iterations: iter,
                    residual: rel_residual,
                };
            }
            let alpha = rho / pq;

            x.par_iter_mut().zip(&p).for_each(|(xi, pi)| *xi += alpha * pi);
            r.par_iter_mut().zip(&q).for_each(|(ri, qi)| *ri -= alpha * qi);

            rel_residual = norm(&r) / b_norm;
            if rel_residual < self.tolerance {
                return SolverOutcome {
                    converged: true,
                    iterations: iter + 1,
                    residual: rel_residual,
                };
            }

            z.par_iter_mut()
                .zip(&r)
                .zip(&inv_diag)
                .for_each(|((zi, ri), di)| *zi = ri * di);
            let rho_new = dot(&r, &z);
            let beta = rho_new / rho;
            rho = rho_new;
            p.par_iter_mut().zip(&z).for_each(|(pi, zi)| *pi = zi + beta * *pi);
        }

        SolverOutcome {
            converged: false,
            iterations: self.max_iterations,
            residual: rel_residual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::tests::laplacian_1d;

    #[test]
    fn test_cg_spd() {
        let a = CsrMatrix::from_rows(vec![vec![(0, 4.0), (1, 1.0)], vec![(0, 1.0), (1, 3.0)]]);
        let b = [1.0, 2.0];
        let mut x = [0.0; 2];

        let outcome = ConjugateGradient {
            max_iterations: 100,
            tolerance: 1e-12,
        }
        .solve(&a, &b, &mut x);

        assert!(outcome.converged, "CG should converge for SPD matrix");
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-10, "x0 = {}", x[0]);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-10, "x1 = {}", x[1]);
    }

    #[test]
    fn test_cg_identity_converges_immediately() {
        let id = CsrMatrix::identity(5);
        let b: Vec<f64> = (1..=5).map(f64::from).collect();
        let mut x = vec![0.0; 5];
        let outcome = ConjugateGradient::default().solve(&id, &b, &mut x);

        assert!(outcome.converged);
        assert!(outcome.iterations <= 1);
        assert_eq!(x, b);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let mut x = vec![3.0; 4];
        let outcome = ConjugateGradient::default().solve(&laplacian_1d(4), &[0.0; 4], &mut x);
        assert_eq!(outcome, SolverOutcome::trivial());
        assert_eq!(x, vec![0.0; 4]);
    }

    #[test]
    fn test_cg_singular_consistent_system() {
        // Pure Neumann 1D Laplacian: rows sum to zero, rhs has zero mean
        let a = CsrMatrix::from_rows(vec![
            vec![(0, 1.0), (1, -1.0)],
            vec![(0, -1.0), (1, 2.0), (2, -1.0)],
            vec![(1, -1.0), (2, 1.0)],
        ]);
        let b = [1.0, 0.0, -1.0];
        let mut x = [0.0; 3];
        let outcome = ConjugateGradient {
            max_iterations: 50,
            tolerance: 1e-12,
        }
        .solve(&a, &b, &mut x);

        assert!(outcome.converged, "{:?}", outcome);
        let mut ax = [0.0; 3];
        a.matvec(&x, &mut ax);
        for (lhs, rhs) in ax.iter().zip(&b) {
            assert!((lhs - rhs).abs() < 1e-9);
        }
    }

    #[test]
    fn test_indefinite_preconditioned_residual_breaks_down() {
        // Diagonal of mixed sign: r . D^-1 r = 1 - 1 = 0 on the first step
        let a = CsrMatrix::from_rows(vec![vec![(0, 1.0)], vec![(1, -1.0)]]);
        let mut x = [0.0; 2];
        let outcome = ConjugateGradient::default().solve(&a, &[1.0, 1.0], &mut x);

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(x, [0.0, 0.0]);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let mut x = vec![0.0; 50];
        let outcome = ConjugateGradient {
            max_iterations: 2,
            tolerance: 1e-14,
        }
        .solve(&laplacian_1d(50), &vec![1.0; 50], &mut x);

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 2);
        assert!(x.iter().all(|v| v.is_finite()));
    }
}
