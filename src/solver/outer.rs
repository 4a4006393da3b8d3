#![allow(non_snake_case)]
//! The BCL outer loop: global residuals, termination, the μ/η schedule
//! with cold restart, and orchestration of the inner step variants.

use crate::algebra::*;
use crate::ldl::LdlError;
use itertools::izip;

use super::info_print;
use super::inner::{correction_guess, initial_guess};
use super::kkt::{mu_update, refactorize};
use super::linsolve::iterative_solve;
use super::{Model, Results, RuizEquilibration, Settings, SolverStatus, Workspace};

/// Global primal residual in unscaled space.
///
/// Returns `(lhs, eq_rhs_0, in_rhs_0, eq_lhs, in_lhs)` where `lhs` is
/// the residual norm and the `rhs_0` terms are `‖A·x‖∞` and `‖C·x‖∞`
/// for relative termination.  On exit `primal_residual_eq_scaled` holds
/// the scaled equality residual and `primal_residual_in_scaled_up` the
/// unscaled `C·x`.
pub(crate) fn global_primal_residual<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
    ruiz: &RuizEquilibration<T>,
) -> (T, T, T, T, T) {
    work.A_scaled.gemv(
        &mut work.primal_residual_eq_scaled,
        &results.x,
        T::one(),
        T::zero(),
    );
    work.C_scaled.gemv(
        &mut work.primal_residual_in_scaled_up,
        &results.x,
        T::one(),
        T::zero(),
    );

    ruiz.unscale_primal_residual_in_place_eq(&mut work.primal_residual_eq_scaled);
    let primal_feasibility_eq_rhs_0 = work.primal_residual_eq_scaled.norm_inf();
    ruiz.unscale_primal_residual_in_place_in(&mut work.primal_residual_in_scaled_up);
    let primal_feasibility_in_rhs_0 = work.primal_residual_in_scaled_up.norm_inf();

    for i in 0..model.n_in {
        let cx = work.primal_residual_in_scaled_up[i];
        work.primal_residual_in_scaled_low[i] =
            (cx - model.u[i]).positive_part() + (cx - model.l[i]).negative_part();
    }
    for (r, &b) in izip!(&mut work.primal_residual_eq_scaled, &model.b) {
        *r -= b;
    }

    let primal_feasibility_in_lhs = work.primal_residual_in_scaled_low.norm_inf();
    let primal_feasibility_eq_lhs = work.primal_residual_eq_scaled.norm_inf();
    let primal_feasibility_lhs = T::max(primal_feasibility_eq_lhs, primal_feasibility_in_lhs);

    ruiz.scale_primal_residual_in_place_eq(&mut work.primal_residual_eq_scaled);

    (
        primal_feasibility_lhs,
        primal_feasibility_eq_rhs_0,
        primal_feasibility_in_rhs_0,
        primal_feasibility_eq_lhs,
        primal_feasibility_in_lhs,
    )
}

/// Global dual residual in unscaled space.
///
/// Returns `(lhs, rhs_0, rhs_1, rhs_3)` with the norms of `H·x`, `Aᵀy`
/// and `Cᵀz` for relative termination.  On exit `dual_residual_scaled`
/// holds the scaled dual residual of the current iterate.
pub(crate) fn global_dual_residual<T: FloatT>(
    results: &Results<T>,
    work: &mut Workspace<T>,
    ruiz: &RuizEquilibration<T>,
) -> (T, T, T, T) {
    work.dual_residual_scaled.copy_from(&work.g_scaled);

    work.H_scaled.gemv(&mut work.CTz, &results.x, T::one(), T::zero());
    for (r, &v) in izip!(&mut work.dual_residual_scaled, &work.CTz) {
        *r += v;
    }
    ruiz.unscale_dual_residual_in_place(&mut work.CTz);
    let dual_feasibility_rhs_0 = work.CTz.norm_inf();

    work.A_scaled.t().gemv(&mut work.CTz, &results.y, T::one(), T::zero());
    for (r, &v) in izip!(&mut work.dual_residual_scaled, &work.CTz) {
        *r += v;
    }
    ruiz.unscale_dual_residual_in_place(&mut work.CTz);
    let dual_feasibility_rhs_1 = work.CTz.norm_inf();

    work.C_scaled.t().gemv(&mut work.CTz, &results.z, T::one(), T::zero());
    for (r, &v) in izip!(&mut work.dual_residual_scaled, &work.CTz) {
        *r += v;
    }
    ruiz.unscale_dual_residual_in_place(&mut work.CTz);
    let dual_feasibility_rhs_3 = work.CTz.norm_inf();

    ruiz.unscale_dual_residual_in_place(&mut work.dual_residual_scaled);
    let dual_feasibility_lhs = work.dual_residual_scaled.norm_inf();
    ruiz.scale_dual_residual_in_place(&mut work.dual_residual_scaled);

    (
        dual_feasibility_lhs,
        dual_feasibility_rhs_0,
        dual_feasibility_rhs_1,
        dual_feasibility_rhs_3,
    )
}

/// Seeds (x, y) by solving the equality-constrained KKT system of
/// dimension dim + n_eq.
pub(crate) fn compute_equality_constrained_initial_guess<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
) -> Result<(), LdlError> {
    let (dim, n_eq) = (model.dim, model.n_eq);

    work.rhs.set(T::zero());
    work.rhs[..dim].scalarop_from(|v| -v, &work.g_scaled);
    work.rhs[dim..dim + n_eq].copy_from(&work.b_scaled);

    iterative_solve(settings, model, results, work, T::one(), dim + n_eq)?;

    results.x.copy_from(&work.dw_aug[..dim]);
    results.y.copy_from(&work.dw_aug[dim..dim + n_eq]);
    work.dw_aug.set(T::zero());
    Ok(())
}

/// BCL tolerance/penalty schedule.  Returns true on a good step.
#[allow(clippy::too_many_arguments)]
fn bcl_update<T: FloatT>(
    settings: &Settings<T>,
    results: &mut Results<T>,
    work: &Workspace<T>,
    primal_feasibility_lhs: T,
    bcl_eta_ext: &mut T,
    bcl_eta_in: &mut T,
    bcl_eta_ext_init: T,
    eps_in_min: T,
    new_bcl_mu_in: &mut T,
    new_bcl_mu_eq: &mut T,
    new_bcl_mu_in_inv: &mut T,
    new_bcl_mu_eq_inv: &mut T,
) -> bool {
    if primal_feasibility_lhs <= *bcl_eta_ext {
        if settings.verbose {
            println!("good step");
        }
        *bcl_eta_ext = *bcl_eta_ext * T::powf(results.info.mu_in_inv, settings.beta_bcl);
        *bcl_eta_in = T::max(*bcl_eta_in * results.info.mu_in_inv, eps_in_min);
        true
    } else {
        if settings.verbose {
            println!("bad step");
        }
        results.y.copy_from(&work.y_prev);
        results.z.copy_from(&work.z_prev);

        *new_bcl_mu_in = T::min(
            results.info.mu_in * settings.mu_update_factor,
            settings.mu_max_in,
        );
        *new_bcl_mu_eq = T::min(
            results.info.mu_eq * settings.mu_update_factor,
            settings.mu_max_eq,
        );
        *new_bcl_mu_in_inv = T::max(
            results.info.mu_in_inv * settings.mu_update_inv_factor,
            settings.mu_max_in_inv,
        );
        *new_bcl_mu_eq_inv = T::max(
            results.info.mu_eq_inv * settings.mu_update_inv_factor,
            settings.mu_max_eq_inv,
        );

        *bcl_eta_ext = bcl_eta_ext_init * T::powf(*new_bcl_mu_in_inv, settings.alpha_bcl);
        *bcl_eta_in = T::max(*new_bcl_mu_in_inv, eps_in_min);
        false
    }
}

/// Runs the BCL outer loop to termination on the current iterate.
pub(crate) fn qp_solve<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    ruiz: &RuizEquilibration<T>,
) -> Result<(), LdlError> {
    let (_dim, n_in) = (model.dim, model.n_in);
    let machine_eps = T::epsilon();

    results.info.status = SolverStatus::Unsolved;

    let bcl_eta_ext_init = T::powf((0.1).as_T(), settings.alpha_bcl);
    let mut bcl_eta_ext = bcl_eta_ext_init;
    let mut bcl_eta_in = T::one();
    let eps_in_min = T::min(settings.eps_abs, (1e-9).as_T());

    let mut consecutive_bad_steps = 0usize;
    let mut iterate_unscaled = false;

    for iter in 0..=settings.max_iter {
        results.info.n_ext += 1;
        if iter == settings.max_iter {
            break;
        }

        let (
            primal_feasibility_lhs,
            primal_feasibility_eq_rhs_0,
            primal_feasibility_in_rhs_0,
            _primal_feasibility_eq_lhs,
            _primal_feasibility_in_lhs,
        ) = global_primal_residual(model, results, work, ruiz);

        let (
            dual_feasibility_lhs,
            mut dual_feasibility_rhs_0,
            mut dual_feasibility_rhs_1,
            mut dual_feasibility_rhs_3,
        ) = global_dual_residual(results, work, ruiz);

        if !(primal_feasibility_lhs.is_finite() && dual_feasibility_lhs.is_finite()) {
            results.info.status = SolverStatus::NonFinite;
            break;
        }

        let mut new_bcl_mu_in = results.info.mu_in;
        let mut new_bcl_mu_eq = results.info.mu_eq;
        let mut new_bcl_mu_in_inv = results.info.mu_in_inv;
        let mut new_bcl_mu_eq_inv = results.info.mu_eq_inv;

        let mut rhs_pri = settings.eps_abs;
        if settings.eps_rel != T::zero() {
            rhs_pri += settings.eps_rel
                * T::max(
                    T::max(primal_feasibility_eq_rhs_0, primal_feasibility_in_rhs_0),
                    T::max(
                        T::max(
                            work.primal_feasibility_rhs_1_eq,
                            work.primal_feasibility_rhs_1_in_u,
                        ),
                        work.primal_feasibility_rhs_1_in_l,
                    ),
                );
        }
        let mut is_primal_feasible = primal_feasibility_lhs <= rhs_pri;

        let mut rhs_dua = settings.eps_abs;
        if settings.eps_rel != T::zero() {
            rhs_dua += settings.eps_rel
                * T::max(
                    T::max(dual_feasibility_rhs_3, dual_feasibility_rhs_0),
                    T::max(dual_feasibility_rhs_1, work.dual_feasibility_rhs_2),
                );
        }
        let mut is_dual_feasible = dual_feasibility_lhs <= rhs_dua;

        if settings.verbose {
            info_print::print_iteration(
                iter,
                primal_feasibility_lhs,
                dual_feasibility_lhs,
                bcl_eta_ext,
                bcl_eta_in,
                results,
            );
        }

        if is_primal_feasible {
            if dual_feasibility_lhs >= settings.refactor_dual_feasibility_threshold
                && results.info.rho != settings.refactor_rho_threshold
            {
                let rho_new = settings.refactor_rho_threshold;
                refactorize(model, results, work, rho_new)?;
                results.info.rho = rho_new;
            }
            if is_dual_feasible {
                ruiz.unscale_primal_in_place(&mut results.x);
                ruiz.unscale_dual_in_place_eq(&mut results.y);
                ruiz.unscale_dual_in_place_in(&mut results.z);
                iterate_unscaled = true;
                results.info.status = SolverStatus::Solved;
                break;
            }
        }

        work.x_prev.copy_from(&results.x);
        work.y_prev.copy_from(&results.y);
        work.z_prev.copy_from(&results.z);

        let do_initial_guess_fact =
            primal_feasibility_lhs < settings.eps_initial_guess || n_in == 0;

        let mut err_in = T::zero();

        if do_initial_guess_fact {
            err_in = initial_guess(settings, model, results, work, ruiz, bcl_eta_in)?;
            results.info.n_tot += 1;
        }

        let do_correction_guess = (!do_initial_guess_fact && n_in != 0)
            || (do_initial_guess_fact && err_in >= bcl_eta_in && n_in != 0);

        if settings.verbose {
            println!("error from initial guess : {} bcl_eta_in {}", err_in, bcl_eta_in);
        }

        if do_initial_guess_fact && err_in >= bcl_eta_in && n_in != 0 {
            // switch the residual buffers from the saddle-point form to
            // the augmented Lagrangian of the correction guess
            work.C_scaled.t().gemv(
                &mut work.dual_residual_scaled,
                &results.z,
                -T::one(),
                T::one(),
            );
            work.A_scaled.t().gemv(
                &mut work.dual_residual_scaled,
                &work.primal_residual_eq_scaled,
                results.info.mu_eq,
                T::one(),
            );
            for (r, &y) in izip!(&mut work.primal_residual_eq_scaled, &results.y) {
                *r += y * results.info.mu_eq_inv;
            }
            for (r, &z) in izip!(&mut work.primal_residual_in_scaled_up, &results.z) {
                *r += z * results.info.mu_in_inv;
            }
            for (r, &z) in izip!(&mut work.primal_residual_in_scaled_low, &results.z) {
                *r += z * results.info.mu_in_inv;
            }
            for i in 0..n_in {
                work.active_part_z[i] = results.info.mu_in
                    * (work.primal_residual_in_scaled_up[i].positive_part()
                        + work.primal_residual_in_scaled_low[i].negative_part());
            }
            work.C_scaled.t().gemv(
                &mut work.dual_residual_scaled,
                &work.active_part_z,
                T::one(),
                T::one(),
            );
        }
        if !do_initial_guess_fact && n_in != 0 {
            // stage the correction-guess residuals from scratch;
            // `primal_residual_in_scaled_up` holds the unscaled C·x here
            ruiz.scale_primal_residual_in_place_in(&mut work.primal_residual_in_scaled_up);
            for (r, &zp) in izip!(&mut work.primal_residual_in_scaled_up, &work.z_prev) {
                *r += zp * results.info.mu_in_inv;
            }
            work.primal_residual_in_scaled_low
                .copy_from(&work.primal_residual_in_scaled_up);
            for (r, &u) in izip!(&mut work.primal_residual_in_scaled_up, &work.u_scaled) {
                *r -= u;
            }
            for (r, &l) in izip!(&mut work.primal_residual_in_scaled_low, &work.l_scaled) {
                *r -= l;
            }

            work.A_scaled.t().gemv(
                &mut work.dual_residual_scaled,
                &work.primal_residual_eq_scaled,
                results.info.mu_eq,
                T::one(),
            );
            for (r, &y) in izip!(&mut work.primal_residual_eq_scaled, &results.y) {
                *r += y * results.info.mu_eq_inv;
            }
            for i in 0..n_in {
                work.active_part_z[i] = results.info.mu_in
                    * (work.primal_residual_in_scaled_up[i].positive_part()
                        + work.primal_residual_in_scaled_low[i].negative_part())
                    - results.z[i];
            }
            work.C_scaled.t().gemv(
                &mut work.dual_residual_scaled,
                &work.active_part_z,
                T::one(),
                T::one(),
            );
        }

        if do_correction_guess {
            err_in = correction_guess(settings, model, results, work, bcl_eta_in)?;
            if settings.verbose {
                println!("error from correction guess : {}", err_in);
            }
        }

        let (
            primal_feasibility_lhs_new,
            primal_feasibility_eq_rhs_0,
            primal_feasibility_in_rhs_0,
            _,
            _,
        ) = global_primal_residual(model, results, work, ruiz);

        is_primal_feasible = primal_feasibility_lhs_new
            <= settings.eps_abs
                + settings.eps_rel
                    * T::max(
                        T::max(primal_feasibility_eq_rhs_0, primal_feasibility_in_rhs_0),
                        T::max(
                            T::max(
                                work.primal_feasibility_rhs_1_eq,
                                work.primal_feasibility_rhs_1_in_u,
                            ),
                            work.primal_feasibility_rhs_1_in_l,
                        ),
                    );

        if is_primal_feasible {
            let (dual_feasibility_lhs_new, r0, r1, r3) =
                global_dual_residual(results, work, ruiz);
            (dual_feasibility_rhs_0, dual_feasibility_rhs_1, dual_feasibility_rhs_3) =
                (r0, r1, r3);

            is_dual_feasible = dual_feasibility_lhs_new
                <= settings.eps_abs
                    + settings.eps_rel
                        * T::max(
                            T::max(dual_feasibility_rhs_3, dual_feasibility_rhs_0),
                            T::max(dual_feasibility_rhs_1, work.dual_feasibility_rhs_2),
                        );

            if is_dual_feasible {
                ruiz.unscale_primal_in_place(&mut results.x);
                ruiz.unscale_dual_in_place_eq(&mut results.y);
                ruiz.unscale_dual_in_place_in(&mut results.z);
                iterate_unscaled = true;
                results.info.status = SolverStatus::Solved;
                break;
            }
        }

        let good_step = bcl_update(
            settings,
            results,
            work,
            primal_feasibility_lhs_new,
            &mut bcl_eta_ext,
            &mut bcl_eta_in,
            bcl_eta_ext_init,
            eps_in_min,
            &mut new_bcl_mu_in,
            &mut new_bcl_mu_eq,
            &mut new_bcl_mu_in_inv,
            &mut new_bcl_mu_eq_inv,
        );
        if good_step {
            consecutive_bad_steps = 0;
        } else {
            consecutive_bad_steps += 1;
        }

        // cold restart when both residuals stopped improving at a
        // large penalty.  The dual recompute also refreshes the dual
        // residual buffer for the next initial guess.
        let (dual_feasibility_lhs_new, _, _, _) = global_dual_residual(results, work, ruiz);

        if primal_feasibility_lhs_new / T::max(primal_feasibility_lhs, machine_eps) >= T::one()
            && dual_feasibility_lhs_new / T::max(primal_feasibility_lhs, machine_eps) >= T::one()
            && results.info.mu_in >= (1e5).as_T()
        {
            if settings.verbose {
                println!("cold restart");
            }
            new_bcl_mu_in = settings.cold_reset_mu_in;
            new_bcl_mu_eq = settings.cold_reset_mu_eq;
            new_bcl_mu_in_inv = settings.cold_reset_mu_in_inv;
            new_bcl_mu_eq_inv = settings.cold_reset_mu_eq_inv;
        }

        if settings.infeasibility_check
            && !good_step
            && consecutive_bad_steps >= 5
            && results.info.mu_in >= settings.mu_max_in
            && primal_feasibility_lhs_new >= primal_feasibility_lhs
        {
            results.info.status = SolverStatus::Infeasible;
            break;
        }

        // effective mu update
        if results.info.mu_in != new_bcl_mu_in || results.info.mu_eq != new_bcl_mu_eq {
            results.info.n_mu_updates += 1;
            mu_update(model, results, work, new_bcl_mu_eq_inv, new_bcl_mu_in_inv);
        }
        results.info.mu_eq = new_bcl_mu_eq;
        results.info.mu_in = new_bcl_mu_in;
        results.info.mu_eq_inv = new_bcl_mu_eq_inv;
        results.info.mu_in_inv = new_bcl_mu_in_inv;
    }

    if results.info.status == SolverStatus::Unsolved {
        results.info.status = SolverStatus::MaxIterReached;
    }
    if !iterate_unscaled {
        ruiz.unscale_primal_in_place(&mut results.x);
        ruiz.unscale_dual_in_place_eq(&mut results.y);
        ruiz.unscale_dual_in_place_in(&mut results.z);
    }

    // objective of the returned iterate, in original space
    model.H.gemv(&mut work.CTz, &results.x, (0.5).as_T(), T::zero());
    for (v, &g) in izip!(&mut work.CTz, &model.g) {
        *v += g;
    }
    results.info.obj_val = work.CTz.dot(&results.x);

    Ok(())
}
