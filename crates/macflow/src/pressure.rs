//! Pressure projection on the staggered grid.
//!
//! One call to [`PressureProjectionSolver::solve`] runs the whole step:
//!
//! 1. face weights: boundary solver weights, intersected with the boundary SDF
//! 2. system assembly: one row per fluid cell, 7-point weighted Laplacian
//! 3. linear solve through the injected [`LinearSystemSolver`]
//! 4. pressure gradient subtraction on every open face
//!
//! The system is stored positive semi-definite:
//!
//! ```text
//! sum_f w_f (p_c - p_n) / h^2 = -sum_f (+/-) w_f u*_f / (h dt)
//! ```
//!
//! Air cells (fluid SDF >= 0) hold zero pressure. Next to the free surface the
//! air neighbor is replaced by a ghost value placed at the interface, so the
//! coefficient toward it is scaled by 1 / theta, theta being the fraction of
//! the cell-to-cell segment inside the fluid.

use crate::boundary::{BoundaryConditionSolver, FractionalBoundarySolver, Side};
use crate::error::ProjectionError;
use crate::field::{CellGrid, ConstantField, ScalarField};
use crate::fraction::inside_fraction_segment;
use crate::grid::{Axis, FaceGrid, GridShape};
use crate::linear::{remove_null_space, ConjugateGradient, CsrMatrix, LinearSystem, LinearSystemSolver, SolverOutcome};
use crate::weights::FaceWeights;
use rayon::prelude::*;

/// Lower bound on the ghost-fluid interface fraction.
const MIN_INTERFACE_FRACTION: f32 = 0.01;

/// Optional geometry for a projection step.
///
/// Defaults: no boundary solver (every face open), boundary SDF everywhere
/// open, fluid SDF everywhere fluid.
#[derive(Clone, Copy, Default)]
pub struct ProjectionDomain<'a> {
    /// Supplies collider face weights; must be current for the input grid
    pub boundary: Option<&'a dyn BoundaryConditionSolver>,
    /// Extra solid geometry, negative inside
    pub boundary_sdf: Option<&'a dyn ScalarField>,
    /// Liquid region, negative inside; positive cells are air
    pub fluid_sdf: Option<&'a dyn ScalarField>,
}

impl<'a> ProjectionDomain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundary(mut self, boundary: &'a dyn BoundaryConditionSolver) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_boundary_sdf(mut self, sdf: &'a dyn ScalarField) -> Self {
        self.boundary_sdf = Some(sdf);
        self
    }

    pub fn with_fluid_sdf(mut self, sdf: &'a dyn ScalarField) -> Self {
        self.fluid_sdf = Some(sdf);
        self
    }
}

/// Outcome of a projection step that produced a velocity field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionReport {
    outcome: SolverOutcome,
    fluid_cells: usize,
    non_finite: usize,
}

impl ProjectionReport {
    /// False if the linear solver stopped at its iteration cap; the velocity
    /// is then a best-effort result.
    #[inline]
    pub fn converged(&self) -> bool {
        self.outcome.converged
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.outcome.iterations
    }

    #[inline]
    pub fn residual(&self) -> f64 {
        self.outcome.residual
    }

    #[inline]
    pub fn solver_outcome(&self) -> SolverOutcome {
        self.outcome
    }

    /// Number of unknowns in the pressure system.
    #[inline]
    pub fn fluid_cells(&self) -> usize {
        self.fluid_cells
    }

    /// Non-finite pressure values returned by the linear solver and zeroed.
    #[inline]
    pub fn non_finite(&self) -> usize {
        self.non_finite
    }
}

/// Assembled pressure system and the cell <-> row mapping.
struct Assembly {
    system: LinearSystem,
    /// Cell index of each row
    row_cells: Vec<usize>,
    /// Row of each cell, `None` for air
    cell_rows: Vec<Option<usize>>,
}

/// Makes a face velocity field divergence free.
pub struct PressureProjectionSolver {
    linear_solver: Box<dyn LinearSystemSolver>,
    pressure: CellGrid,
    weights: FaceWeights,
    fluid_sdf: CellGrid,
}

impl Default for PressureProjectionSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureProjectionSolver {
    /// Solver using Jacobi-preconditioned conjugate gradient.
    pub fn new() -> Self {
        Self::with_linear_system_solver(Box::new(ConjugateGradient::default()))
    }

    pub fn with_linear_system_solver(linear_solver: Box<dyn LinearSystemSolver>) -> Self {
        let shape = GridShape::default();
        Self {
            linear_solver,
            pressure: CellGrid::new(shape, 0.0),
            weights: FaceWeights::open(shape),
            fluid_sdf: CellGrid::new(shape, -crate::field::FAR_FIELD),
        }
    }

    pub fn set_linear_system_solver(&mut self, linear_solver: Box<dyn LinearSystemSolver>) {
        self.linear_solver = linear_solver;
    }

    pub fn linear_system_solver(&self) -> &dyn LinearSystemSolver {
        self.linear_solver.as_ref()
    }

    /// A boundary solver whose weights this projection expects.
    pub fn suggested_boundary_condition_solver(&self) -> Box<dyn BoundaryConditionSolver> {
        Box::new(FractionalBoundarySolver::new())
    }

    /// Pressure of the last step (zero in air cells).
    pub fn pressure(&self) -> &CellGrid {
        &self.pressure
    }

    /// Face weights used by the last step.
    pub fn face_weights(&self) -> &FaceWeights {
        &self.weights
    }

    /// Fluid SDF sampled at cell centers in the last step.
    pub fn fluid_sdf(&self) -> &CellGrid {
        &self.fluid_sdf
    }

    /// Project `input` onto a divergence-free field, written to `output`.
    ///
    /// Invalid input returns `Err` with `output` untouched. A linear solver
    /// that does not converge still yields `Ok`; check
    /// [`ProjectionReport::converged`].
    pub fn solve(
        &mut self,
        input: &FaceGrid,
        dt: f32,
        output: &mut FaceGrid,
        domain: &ProjectionDomain<'_>,
    ) -> Result<ProjectionReport, ProjectionError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ProjectionError::InvalidTimeStep(dt));
        }
        if output.shape() != input.shape() {
            return Err(ProjectionError::ShapeMismatch {
                expected: input.resolution(),
                found: output.resolution(),
            });
        }
        if let Some(boundary) = domain.boundary {
            if !boundary.is_current_for(input) {
                return Err(ProjectionError::StaleBoundary);
            }
        }
        let shape = *input.shape();

        let weights = Self::build_weights(&shape, domain);
        log::trace!("Projection: weights built");

        let fluid_sdf = match domain.fluid_sdf {
            Some(sdf) => CellGrid::from_field(shape, sdf),
            None => CellGrid::from_field(shape, &ConstantField::INSIDE),
        };

        let mut assembly = Self::build_system(input, dt, &weights, &fluid_sdf);
        log::trace!("Projection: system built");

        let mut outcome = if assembly.system.is_empty() {
            SolverOutcome::trivial()
        } else {
            assembly.system.solve_with(self.linear_solver.as_ref())
        };
        if !outcome.converged {
            log::warn!(
                "Pressure solve did not converge: {} iterations, residual {:.3e}",
                outcome.iterations,
                outcome.residual
            );
        }

        let mut non_finite = 0;
        for p in assembly.system.solution.iter_mut() {
            if !p.is_finite() {
                *p = 0.0;
                non_finite += 1;
            }
        }
        if non_finite > 0 {
            log::warn!("Pressure solve returned {} non-finite values, zeroed", non_finite);
            outcome.converged = false;
        }
        log::trace!("Projection: pressure solved");

        Self::apply_pressure_gradient(input, dt, output, &weights, &fluid_sdf, &assembly);
        log::trace!("Projection: pressure gradient applied");

        let mut pressure = CellGrid::new(shape, 0.0);
        {
            let data = pressure.data_mut();
            for (&cell, &p) in assembly.row_cells.iter().zip(&assembly.system.solution) {
                data[cell] = p as f32;
            }
        }
        self.pressure = pressure;
        self.weights = weights;
        self.fluid_sdf = fluid_sdf;

        Ok(ProjectionReport {
            outcome,
            fluid_cells: assembly.row_cells.len(),
            non_finite,
        })
    }

    fn build_weights(shape: &GridShape, domain: &ProjectionDomain<'_>) -> FaceWeights {
        let mut weights = match domain.boundary {
            Some(boundary) => boundary.face_weights().clone(),
            None => FaceWeights::open(*shape),
        };
        if let Some(sdf) = domain.boundary_sdf {
            weights.intersect(&FaceWeights::from_sdf(*shape, sdf));
        }
        weights
    }

    fn build_system(input: &FaceGrid, dt: f32, weights: &FaceWeights, fluid_sdf: &CellGrid) -> Assembly {
        let shape = *input.shape();
        let phi = fluid_sdf.data();

        let mut cell_rows = vec![None; shape.cell_count()];
        let mut row_cells = Vec::new();
        for (cell, &value) in phi.iter().enumerate() {
            if value < 0.0 {
                cell_rows[cell] = Some(row_cells.len());
                row_cells.push(cell);
            }
        }

        let inv_dt = 1.0 / dt as f64;
        let (rows, mut rhs): (Vec<Vec<(usize, f64)>>, Vec<f64>) = row_cells
            .par_iter()
            .enumerate()
            .map(|(row, &cell)| {
                let coords = shape.cell_coords(cell);
                let mut diagonal = 0.0_f64;
                let mut divergence = 0.0_f64;
                let mut entries = Vec::with_capacity(7);

                for axis in Axis::ALL {
                    let a = axis.index();
                    let h = shape.spacing[a] as f64;
                    let inv_h2 = 1.0 / (h * h);

                    for side in [Side::Lower, Side::Upper] {
                        let mut face = coords;
                        let sign = match side {
                            Side::Lower => -1.0,
                            Side::Upper => {
                                face[a] += 1;
                                1.0
                            }
                        };
                        let w = weights.weight(axis, face[0], face[1], face[2]) as f64;
                        if w <= 0.0 {
                            continue;
                        }
                        divergence += sign * w * input.face(axis, face[0], face[1], face[2]) as f64 / h;

                        let Some(neighbor) = neighbor_cell(&shape, coords, axis, side) else {
                            continue;
                        };
                        match cell_rows[neighbor] {
                            Some(neighbor_row) => {
                                diagonal += w * inv_h2;
                                entries.push((neighbor_row, -w * inv_h2));
                            }
                            None => {
                                let theta = interface_fraction(phi[cell], phi[neighbor]) as f64;
                                diagonal += w * inv_h2 / theta;
                            }
                        }
                    }
                }

                if diagonal <= 0.0 {
                    // Sealed cell: nothing couples it to the rest, pin p = 0
                    return (vec![(row, 1.0)], 0.0);
                }
                entries.push((row, diagonal));
                entries.sort_by_key(|&(col, _)| col);
                (entries, -divergence * inv_dt)
            })
            .unzip();

        let matrix = CsrMatrix::from_rows(rows);
        let adjusted = remove_null_space(&matrix, &mut rhs);
        log::debug!(
            "Pressure system: {} rows, {} non-zeros, {} unanchored blocks",
            matrix.num_rows(),
            matrix.nnz(),
            adjusted
        );

        Assembly {
            system: LinearSystem::new(matrix, rhs),
            row_cells,
            cell_rows,
        }
    }

    /// Writes `output` = `input` minus dt * grad(p) on every open face with a
    /// fluid cell on at least one side. Every other face keeps its input value.
    fn apply_pressure_gradient(
        input: &FaceGrid,
        dt: f32,
        output: &mut FaceGrid,
        weights: &FaceWeights,
        fluid_sdf: &CellGrid,
        assembly: &Assembly,
    ) {
        let shape = *input.shape();
        let phi = fluid_sdf.data();
        let p = &assembly.system.solution;
        let cell_rows = &assembly.cell_rows;
        let dt = dt as f64;

        output.set(input);
        for axis in Axis::ALL {
            let a = axis.index();
            let n = shape.resolution[a];
            let h = shape.spacing[a] as f64;
            let w = weights.component(axis);

            output.par_update_faces(axis, |coords, _, value| {
                if coords[a] == 0 || coords[a] == n {
                    return value;
                }
                if w[shape.face_index(axis, coords[0], coords[1], coords[2])] <= 0.0 {
                    return value;
                }

                let upper = shape.cell_index(coords[0], coords[1], coords[2]);
                let mut lower_coords = coords;
                lower_coords[a] -= 1;
                let lower = shape.cell_index(lower_coords[0], lower_coords[1], lower_coords[2]);

                let gradient = match (cell_rows[lower], cell_rows[upper]) {
                    (None, None) => return value,
                    (Some(l), Some(u)) => (p[u] - p[l]) / h,
                    (Some(l), None) => {
                        let theta = interface_fraction(phi[lower], phi[upper]) as f64;
                        -p[l] / (theta * h)
                    }
                    (None, Some(u)) => {
                        let theta = interface_fraction(phi[upper], phi[lower]) as f64;
                        p[u] / (theta * h)
                    }
                };
                (value as f64 - dt * gradient) as f32
            });
        }
    }
}

/// Cell across the `side` face of `coords` along `axis`, if inside the grid.
fn neighbor_cell(shape: &GridShape, coords: [usize; 3], axis: Axis, side: Side) -> Option<usize> {
    let a = axis.index();
    let mut c = coords;
    match side {
        Side::Lower => c[a] = coords[a].checked_sub(1)?,
        Side::Upper => {
            if coords[a] + 1 >= shape.resolution[a] {
                return None;
            }
            c[a] += 1;
        }
    }
    Some(shape.cell_index(c[0], c[1], c[2]))
}

/// Fraction of the segment from a fluid cell center to an air cell center
/// lying inside the fluid, bounded away from zero.
fn interface_fraction(phi_fluid: f32, phi_air: f32) -> f32 {
    inside_fraction_segment(phi_fluid, phi_air).max(MIN_INTERFACE_FRACTION)
}
