#![allow(non_snake_case)]
//! Inner linear solver: iterative refinement around the LDL store, with
//! stagnation detection and a single refactorization retry on drift.

use crate::algebra::*;
use crate::ldl::LdlError;

use super::kkt::refactorize;
use super::{Model, Results, Settings, Workspace};

/// Computes the true refinement residual `err = rhs − M·dw_aug` against
/// the intended KKT matrix, assembled on the fly from the scaled data and
/// the current (ρ, μ, active set) rather than from the LDL factors.
pub(crate) fn iterative_residual<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
    inner_pb_dim: usize,
) {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);

    work.err[..inner_pb_dim].copy_from(&work.rhs[..inner_pb_dim]);

    work.H_scaled.gemv(&mut work.err[..dim], &work.dw_aug[..dim], -T::one(), T::one());
    work.err[..dim].axpby(-results.info.rho, &work.dw_aug[..dim], T::one());
    work.A_scaled.t().gemv(
        &mut work.err[..dim],
        &work.dw_aug[dim..dim + n_eq],
        -T::one(),
        T::one(),
    );

    for i in 0..n_in {
        let j = work.current_bijection_map[i];
        if j < work.n_c {
            let dzj = work.dw_aug[dim + n_eq + j];
            work.C_scaled.row_axpy(&mut work.err[..dim], i, -dzj);
            work.err[dim + n_eq + j] -=
                work.C_scaled.row_dot(i, &work.dw_aug[..dim]) - dzj * results.info.mu_in_inv;
        }
    }

    for i in 0..n_eq {
        work.err[dim + i] -= work.A_scaled.row_dot(i, &work.dw_aug[..dim])
            - work.dw_aug[dim + i] * results.info.mu_eq_inv;
    }
}

/// Solves the reduced KKT system for the staged `rhs`, leaving the
/// solution in `dw_aug` and zeroing the used rhs slice on exit.
///
/// One backsolve seeds the iterate; refinement passes continue while the
/// residual exceeds `eps`, up to the configured cap or until the residual
/// fails to decrease twice in a row.  If the final residual still exceeds
/// `max(eps, eps_refact)` the factorization is assumed to have drifted:
/// a full refactorization (with active rows re-inserted) is performed and
/// the refinement loop runs once more.
pub(crate) fn iterative_solve<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    eps: T,
    inner_pb_dim: usize,
) -> Result<(), LdlError> {
    work.err.set(T::zero());

    let norm_err = refinement_loop(settings, model, results, work, eps, inner_pb_dim);

    if norm_err >= T::max(eps, settings.eps_refact) {
        let rho = results.info.rho;
        refactorize(model, results, work, rho)?;
        refinement_loop(settings, model, results, work, eps, inner_pb_dim);
    }

    work.rhs[..inner_pb_dim].set(T::zero());
    Ok(())
}

fn refinement_loop<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
    eps: T,
    inner_pb_dim: usize,
) -> T {
    work.dw_aug[..inner_pb_dim].copy_from(&work.rhs[..inner_pb_dim]);
    work.ldl.solve_in_place(&mut work.dw_aug[..inner_pb_dim]);

    iterative_residual(model, results, work, inner_pb_dim);

    let mut it = 1;
    let mut it_stability = 0;
    let mut preverr = work.err[..inner_pb_dim].norm_inf();

    if settings.verbose {
        println!("infty_norm(res) {}", preverr);
    }

    while work.err[..inner_pb_dim].norm_inf() >= eps {
        if it >= settings.nb_iterative_refinement {
            break;
        }
        it += 1;

        work.ldl.solve_in_place(&mut work.err[..inner_pb_dim]);
        for i in 0..inner_pb_dim {
            work.dw_aug[i] += work.err[i];
        }

        work.err[..inner_pb_dim].set(T::zero());
        iterative_residual(model, results, work, inner_pb_dim);

        let norm_err = work.err[..inner_pb_dim].norm_inf();
        if norm_err > preverr {
            it_stability += 1;
        } else {
            it_stability = 0;
        }
        if it_stability == 2 {
            break;
        }
        preverr = norm_err;

        if settings.verbose {
            println!("infty_norm(res) {}", norm_err);
        }
    }

    work.err[..inner_pb_dim].norm_inf()
}
