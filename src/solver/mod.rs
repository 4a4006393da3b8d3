#![allow(non_snake_case)]
//! Proxal solver module.
//!
//! The solver handles dense convex quadratic programs of the form
//!
//! ```text
//!   minimize   0.5 xᵀHx + gᵀx
//!   s.t.       Ax = b
//!              l ≤ Cx ≤ u
//! ```
//!
//! through a proximal augmented-Lagrangian outer loop around a
//! primal-dual semismooth Newton inner solver, with an incrementally
//! maintained LDLᵀ factorization of the active-set KKT system.
//!
//! The main interface is [`QpSolver`](crate::solver::QpSolver):
//! `setup` validates and ingests the problem, `solve` runs the outer
//! loop, and `update` / `warm_start` / `update_proximal_parameters`
//! modify the problem or the starting state between solves.

mod info_print;
mod inner;
mod kkt;
mod linesearch;
mod linsolve;
mod model;
mod outer;
mod results;
mod ruiz;
mod settings;
mod workspace;

pub use model::*;
pub use results::*;
pub use ruiz::*;
pub use settings::*;
pub use workspace::*;

use crate::algebra::*;
use std::time::Instant;

/// One-shot convenience entry point: setup, solve, and return the
/// results.
#[allow(clippy::too_many_arguments)]
pub fn solve_qp<T: FloatT>(
    H: &Matrix<T>,
    g: &[T],
    A: &Matrix<T>,
    b: &[T],
    C: &Matrix<T>,
    u: &[T],
    l: &[T],
    settings: Settings<T>,
) -> Result<Results<T>, SolverError> {
    let mut solver = QpSolver::setup(H, g, A, b, C, u, l, settings)?;
    solver.solve();
    Ok(solver.results)
}

/// Dense proximal augmented-Lagrangian QP solver
///
/// Owns the problem model, the solution results, the workspace and the
/// equilibration state.  Between calls the iterate in `results` is held
/// in the original (unscaled) problem space.
pub struct QpSolver<T = f64>
where
    T: FloatT,
{
    pub model: Model<T>,
    pub results: Results<T>,
    pub work: Workspace<T>,
    pub ruiz: RuizEquilibration<T>,
    pub settings: Settings<T>,
}

impl<T> QpSolver<T>
where
    T: FloatT,
{
    /// Validates and ingests a problem, equilibrates it, and performs
    /// the first factorization of the regularized KKT matrix.
    #[allow(clippy::too_many_arguments)]
    pub fn setup(
        H: &Matrix<T>,
        g: &[T],
        A: &Matrix<T>,
        b: &[T],
        C: &Matrix<T>,
        u: &[T],
        l: &[T],
        settings: Settings<T>,
    ) -> Result<Self, SolverError> {
        let model = Model::new(H, g, A, b, C, u, l)?;
        let results = Results::new(model.dim, model.n_eq, model.n_in, &settings);
        let work = Workspace::new(model.dim, model.n_eq, model.n_in);
        let ruiz = RuizEquilibration::new(model.dim, model.n_eq, model.n_in);

        let mut solver = Self {
            model,
            results,
            work,
            ruiz,
            settings,
        };
        solver.setup_internal()?;
        Ok(solver)
    }

    // shared setup pass: reset state per the initial-guess mode, copy
    // and equilibrate the problem blocks, factorize, and seed the
    // iterate when requested
    fn setup_internal(&mut self) -> Result<(), SolverError> {
        let now = Instant::now();
        let Self {
            model,
            results,
            work,
            ruiz,
            settings,
        } = self;

        match settings.initial_guess {
            InitialGuess::EqualityConstrainedInitialGuess
            | InitialGuess::NoInitialGuess
            | InitialGuess::WarmStart => {
                work.cleanup();
                results.cleanup(settings);
            }
            InitialGuess::ColdStartWithPreviousResult => {
                work.cleanup();
                results.cold_start(settings);
            }
            InitialGuess::WarmStartWithPreviousResult => {
                work.cleanup();
                results.cleanup_statistics();
            }
        }

        work.H_scaled.copy_from(&model.H);
        work.g_scaled.copy_from(&model.g);
        work.A_scaled.copy_from(&model.A);
        work.b_scaled.copy_from(&model.b);
        work.C_scaled.copy_from(&model.C);
        work.u_scaled.copy_from(&model.u);
        work.l_scaled.copy_from(&model.l);

        work.primal_feasibility_rhs_1_eq = model.b.norm_inf();
        work.primal_feasibility_rhs_1_in_u = model.u.norm_inf();
        work.primal_feasibility_rhs_1_in_l = model.l.norm_inf();
        work.dual_feasibility_rhs_2 = model.g.norm_inf();

        {
            let qp = QpViewMut {
                H: &mut work.H_scaled,
                g: work.g_scaled.as_mut_slice(),
                A: &mut work.A_scaled,
                b: work.b_scaled.as_mut_slice(),
                C: &mut work.C_scaled,
                u: work.u_scaled.as_mut_slice(),
                l: work.l_scaled.as_mut_slice(),
            };
            match settings.preconditioner_status {
                PreconditionerStatus::Execute => ruiz.scale_qp_in_place(
                    qp,
                    true,
                    settings.preconditioner_max_iter,
                    settings.preconditioner_accuracy,
                ),
                PreconditionerStatus::Identity => {
                    ruiz.reset_to_identity();
                    ruiz.scale_qp_in_place(qp, false, 0, T::zero());
                }
                PreconditionerStatus::Keep => {
                    ruiz.scale_qp_in_place(qp, false, 0, T::zero());
                }
            }
        }
        work.correction_guess_rhs_g = work.g_scaled.norm_inf();

        kkt::setup_factorization(model, results, work)?;

        if settings.initial_guess == InitialGuess::EqualityConstrainedInitialGuess {
            outer::compute_equality_constrained_initial_guess(settings, model, results, work)?;
            // back to the unscaled resting convention
            ruiz.unscale_primal_in_place(&mut results.x);
            ruiz.unscale_dual_in_place_eq(&mut results.y);
        }

        self.results.info.setup_time = now.elapsed().as_secs_f64();
        Ok(())
    }

    /// Runs the BCL outer loop from the current iterate and fills
    /// `results`.
    pub fn solve(&mut self) {
        let now = Instant::now();
        info_print::print_banner(&self.settings, &self.model);

        let Self {
            model,
            results,
            work,
            ruiz,
            settings,
        } = self;

        // the loop operates in the equilibrated space
        ruiz.scale_primal_in_place(&mut results.x);
        ruiz.scale_dual_in_place_eq(&mut results.y);
        ruiz.scale_dual_in_place_in(&mut results.z);

        if outer::qp_solve(settings, model, results, work, ruiz).is_err() {
            results.info.status = SolverStatus::NonFinite;
            ruiz.unscale_primal_in_place(&mut results.x);
            ruiz.unscale_dual_in_place_eq(&mut results.y);
            ruiz.unscale_dual_in_place_in(&mut results.z);
        }

        self.results.info.run_time = now.elapsed().as_secs_f64();
        info_print::print_footer(&self.settings, &self.results);
    }

    /// Replaces any subset of the problem data; missing fields keep
    /// their current values.  Re-runs the setup pass (equilibration and
    /// factorization) on the updated model.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        H: Option<&Matrix<T>>,
        g: Option<&[T]>,
        A: Option<&Matrix<T>>,
        b: Option<&[T]>,
        C: Option<&Matrix<T>>,
        u: Option<&[T]>,
        l: Option<&[T]>,
    ) -> Result<(), SolverError> {
        let model = &mut self.model;

        if let Some(H) = H {
            if H.nrows() != model.dim || !H.is_square() {
                return Err(SolverError::IncompatibleDimension);
            }
            model.H.copy_from(H);
        }
        if let Some(g) = g {
            if g.len() != model.dim {
                return Err(SolverError::IncompatibleDimension);
            }
            model.g.copy_from(g);
        }
        if let Some(A) = A {
            if A.nrows() != model.n_eq || (model.n_eq > 0 && A.ncols() != model.dim) {
                return Err(SolverError::IncompatibleDimension);
            }
            if model.n_eq > 0 {
                model.A.copy_from(A);
            }
        }
        if let Some(b) = b {
            if b.len() != model.n_eq {
                return Err(SolverError::IncompatibleDimension);
            }
            model.b.copy_from(b);
        }
        if let Some(C) = C {
            if C.nrows() != model.n_in || (model.n_in > 0 && C.ncols() != model.dim) {
                return Err(SolverError::IncompatibleDimension);
            }
            if model.n_in > 0 {
                model.C.copy_from(C);
            }
        }
        if let Some(u) = u {
            if u.len() != model.n_in {
                return Err(SolverError::IncompatibleDimension);
            }
            model.u.copy_from(u);
        }
        if let Some(l) = l {
            if l.len() != model.n_in {
                return Err(SolverError::IncompatibleDimension);
            }
            model.l.copy_from(l);
        }
        check_bound_order(&model.u, &model.l)?;

        self.setup_internal()
    }

    /// Installs a warm-started iterate (in original problem space) and
    /// switches the initial-guess mode to `WarmStart`.  Missing fields
    /// keep their current values.
    pub fn warm_start(
        &mut self,
        x: Option<&[T]>,
        y: Option<&[T]>,
        z: Option<&[T]>,
    ) -> Result<(), SolverError> {
        if let Some(x) = x {
            if x.len() != self.model.dim {
                return Err(SolverError::IncompatibleDimension);
            }
            self.results.x.copy_from(x);
        }
        if let Some(y) = y {
            if y.len() != self.model.n_eq {
                return Err(SolverError::IncompatibleDimension);
            }
            self.results.y.copy_from(y);
        }
        if let Some(z) = z {
            if z.len() != self.model.n_in {
                return Err(SolverError::IncompatibleDimension);
            }
            self.results.z.copy_from(z);
        }
        self.settings.initial_guess = InitialGuess::WarmStart;
        Ok(())
    }

    /// Overwrites the proximal parameters, keeping the cached inverses
    /// consistent, and restores the factorization invariant at the new
    /// values.
    pub fn update_proximal_parameters(
        &mut self,
        rho: Option<T>,
        mu_eq: Option<T>,
        mu_in: Option<T>,
    ) -> Result<(), SolverError> {
        let info = &mut self.results.info;

        if let Some(rho) = rho {
            info.rho = rho;
        }
        if let Some(mu_eq) = mu_eq {
            info.mu_eq = mu_eq;
            info.mu_eq_inv = T::recip(mu_eq);
        }
        if let Some(mu_in) = mu_in {
            info.mu_in = mu_in;
            info.mu_in_inv = T::recip(mu_in);
        }

        self.work.reset_active_set();
        kkt::setup_factorization(&self.model, &self.results, &mut self.work)?;
        Ok(())
    }
}
