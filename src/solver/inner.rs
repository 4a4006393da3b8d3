#![allow(non_snake_case)]
//! Inner step variants of the BCL loop: the exact active-set projection
//! from a warm dual (initial guess) and the semismooth Newton iteration
//! on the projected stationarity residual (correction guess).

use crate::algebra::*;
use crate::ldl::LdlError;
use itertools::izip;

use super::kkt::active_set_change;
use super::linesearch::{correction_guess_ls, initial_guess_ls};
use super::linsolve::iterative_solve;
use super::{Model, Results, RuizEquilibration, Settings, Workspace};

/// One exact Newton step of the KKT system restricted to the active set
/// predicted from the warm dual `z_prev`, followed by an exact line
/// search.  Returns the saddle-point residual norm of the new iterate,
/// or one when the step length collapses.
///
/// Expects `primal_residual_in_scaled_up` to hold the unscaled `C·x`
/// and `dual_residual_scaled`/`primal_residual_eq_scaled` the scaled
/// residuals of the current iterate.
pub(crate) fn initial_guess<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    ruiz: &RuizEquilibration<T>,
    eps_int: T,
) -> Result<T, LdlError> {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);
    let mu_eq_inv = results.info.mu_eq_inv;
    let mu_in_inv = results.info.mu_in_inv;

    // stage the unscaled classification residuals C·x + z_e/μ_in − u
    // (resp. − l) from the warm dual
    ruiz.unscale_dual_in_place_in(&mut work.z_prev);
    for (r, &ze) in izip!(&mut work.primal_residual_in_scaled_up, &work.z_prev) {
        *r += ze * mu_in_inv;
    }
    work.primal_residual_in_scaled_low.copy_from(&work.primal_residual_in_scaled_up);
    for (r, &u) in izip!(&mut work.primal_residual_in_scaled_up, &model.u) {
        *r -= u;
    }
    for (r, &l) in izip!(&mut work.primal_residual_in_scaled_low, &model.l) {
        *r -= l;
    }
    for i in 0..n_in {
        work.active_set_up[i] = work.primal_residual_in_scaled_up[i] >= T::zero();
        work.active_set_low[i] = work.primal_residual_in_scaled_low[i] <= T::zero();
        work.active_inequalities[i] = work.active_set_up[i] || work.active_set_low[i];
    }

    // return the staged residuals and the warm dual to scaled space
    for (r, &ze) in izip!(&mut work.primal_residual_in_scaled_up, &work.z_prev) {
        *r -= ze * mu_in_inv;
    }
    for (r, &ze) in izip!(&mut work.primal_residual_in_scaled_low, &work.z_prev) {
        *r -= ze * mu_in_inv;
    }
    ruiz.scale_primal_residual_in_place_in(&mut work.primal_residual_in_scaled_up);
    ruiz.scale_primal_residual_in_place_in(&mut work.primal_residual_in_scaled_low);
    ruiz.scale_dual_in_place_in(&mut work.z_prev);

    let numactive = work.active_inequalities.iter().filter(|&&b| b).count();
    let inner_pb_dim = dim + n_eq + numactive;

    work.rhs.set(T::zero());
    work.active_part_z.set(T::zero());
    active_set_change(model, results, work);

    // rhs: stationarity and equality residuals in the head, active
    // residual rows in the tail; inactive duals move into the head
    work.rhs[..dim].scalarop_from(|v| -v, &work.dual_residual_scaled);
    work.rhs[dim..dim + n_eq].scalarop_from(|v| -v, &work.primal_residual_eq_scaled);
    for i in 0..n_in {
        let j = work.current_bijection_map[i];
        if j < work.n_c {
            if work.active_set_up[i] {
                work.rhs[j + dim + n_eq] = -work.primal_residual_in_scaled_up[i];
            } else if work.active_set_low[i] {
                work.rhs[j + dim + n_eq] = -work.primal_residual_in_scaled_low[i];
            }
        } else {
            work.C_scaled.row_axpy(&mut work.rhs[..dim], i, results.z[i]);
        }
    }

    iterative_solve(settings, model, results, work, eps_int, inner_pb_dim)?;

    // unpermute the tail of the Newton step into a full-length dz;
    // inactive components step their dual to zero
    for j in 0..n_in {
        let i = work.current_bijection_map[j];
        work.active_part_z[j] = if i < work.n_c {
            work.dw_aug[dim + n_eq + i]
        } else {
            -results.z[j]
        };
    }
    work.dw_aug[dim + n_eq..dim + n_eq + n_in].copy_from(&work.active_part_z);

    // restage the scaled residuals with the warm dual folded back in
    for (r, &ze) in izip!(&mut work.primal_residual_in_scaled_up, &work.z_prev) {
        *r += ze * mu_in_inv;
    }
    for (r, &ze) in izip!(&mut work.primal_residual_in_scaled_low, &work.z_prev) {
        *r += ze * mu_in_inv;
    }

    // step images Adx, Hdx, Cdx
    work.A_scaled.gemv(&mut work.Adx, &work.dw_aug[..dim], T::one(), T::zero());
    for (adx, &dy) in izip!(&mut work.Adx, &work.dw_aug[dim..dim + n_eq]) {
        *adx -= dy * mu_eq_inv;
    }
    work.H_scaled.gemv(&mut work.Hdx, &work.dw_aug[..dim], T::one(), T::zero());
    work.A_scaled.t().gemv(
        &mut work.Hdx,
        &work.dw_aug[dim..dim + n_eq],
        T::one(),
        T::one(),
    );
    work.Hdx.axpby(results.info.rho, &work.dw_aug[..dim], T::one());
    work.C_scaled.gemv(&mut work.Cdx, &work.dw_aug[..dim], T::one(), T::zero());

    // the inactive-dual contribution added to the rhs above is removed
    // from the dual residual before the line search
    work.C_scaled.t().gemv(
        &mut work.dual_residual_scaled,
        &work.z_prev,
        -T::one(),
        T::one(),
    );

    initial_guess_ls(model, results, work);
    if settings.verbose {
        println!("alpha from initial guess {}", work.alpha);
    }
    let alpha = work.alpha;

    // advance the staged residuals and reclassify at the stepped point
    work.primal_residual_in_scaled_up.axpby(alpha, &work.Cdx, T::one());
    work.primal_residual_in_scaled_low.axpby(alpha, &work.Cdx, T::one());
    for i in 0..n_in {
        work.active_set_up[i] = work.primal_residual_in_scaled_up[i] >= T::zero();
        work.active_set_low[i] = work.primal_residual_in_scaled_low[i] <= T::zero();
        work.active_inequalities[i] = work.active_set_up[i] || work.active_set_low[i];
    }

    results.x.axpby(alpha, &work.dw_aug[..dim], T::one());
    results.y.axpby(alpha, &work.dw_aug[dim..dim + n_eq], T::one());

    // combine old and new active sets through the signs of z + α·dz
    for j in 0..n_in {
        work.active_part_z[j] = results.z[j] + alpha * work.dw_aug[dim + n_eq + j];
    }
    work.primal_residual_in_scaled_up_plus_alphaCdx
        .scalarop_from(|v| v.positive_part(), &work.active_part_z);
    work.primal_residual_in_scaled_low_plus_alphaCdx
        .scalarop_from(|v| v.negative_part(), &work.active_part_z);
    for i in 0..n_in {
        let mut zi = T::zero();
        if work.active_set_up[i] {
            zi += work.primal_residual_in_scaled_up_plus_alphaCdx[i];
        }
        if work.active_set_low[i] {
            zi += work.primal_residual_in_scaled_low_plus_alphaCdx[i];
        }
        if !work.active_inequalities[i] {
            zi = work.active_part_z[i];
        }
        results.z[i] = zi;
    }

    work.primal_residual_eq_scaled.axpby(alpha, &work.Adx, T::one());
    work.dual_residual_scaled.axpby(alpha, &work.Hdx, T::one());
    work.dw_aug.set(T::zero());

    let mut err_saddle_point = compute_primal_dual_residual(model, results, work);
    if T::abs(alpha) < (1e-10).as_T() {
        err_saddle_point = T::one();
    }
    Ok(err_saddle_point)
}

/// Saddle-point residual of the current iterate against the staged
/// buffers.
///
/// Mutates `primal_residual_in_scaled_up`/`_low` by removing `z/μ_in`
/// and folds `C_sᵀz` into the dual residual; these in-place changes are
/// deliberate and are relied upon by the follow-up correction-guess
/// staging in the outer loop.
pub(crate) fn compute_primal_dual_residual<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
) -> T {
    let n_in = model.n_in;
    let mu_in_inv = results.info.mu_in_inv;

    for (r, &z) in izip!(&mut work.primal_residual_in_scaled_up, &results.z) {
        *r -= z * mu_in_inv;
    }
    for (r, &z) in izip!(&mut work.primal_residual_in_scaled_low, &results.z) {
        *r -= z * mu_in_inv;
    }
    let prim_eq_e = work.primal_residual_eq_scaled.norm_inf();
    work.C_scaled.t().gemv(
        &mut work.dual_residual_scaled,
        &results.z,
        T::one(),
        T::one(),
    );
    let dual_e = work.dual_residual_scaled.norm_inf();
    let mut err = T::max(prim_eq_e, dual_e);

    for i in 0..n_in {
        work.primal_residual_in_scaled_up_plus_alphaCdx[i] =
            work.primal_residual_in_scaled_up[i].positive_part() + work.primal_residual_in_scaled_low[i].negative_part();
    }
    for i in 0..n_in {
        work.active_set_up[i] = results.z[i] > T::zero();
        work.active_set_low[i] = results.z[i] < T::zero();
    }
    // project: staged up-residual where z > 0, low where z < 0,
    // the line-searched residual elsewhere
    for i in 0..n_in {
        let mut zi = T::zero();
        if work.active_set_up[i] {
            zi += work.primal_residual_in_scaled_up[i];
        }
        if work.active_set_low[i] {
            zi += work.primal_residual_in_scaled_low[i];
        }
        if !work.active_set_up[i] && !work.active_set_low[i] {
            zi += work.primal_residual_in_scaled_up_plus_alphaCdx[i];
        }
        work.active_part_z[i] = zi;
    }
    err = T::max(err, work.active_part_z.norm_inf());

    err
}

/// One semismooth Newton step: classify, synchronize the active set,
/// and solve with `[-dual_residual; 0; 0]` as the right-hand side.
pub(crate) fn newton_step<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    eps: T,
) -> Result<(), LdlError> {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);

    for i in 0..n_in {
        work.active_set_up[i] = work.primal_residual_in_scaled_up[i] > T::zero();
        work.active_set_low[i] = work.primal_residual_in_scaled_low[i] < T::zero();
        work.active_inequalities[i] = work.active_set_up[i] || work.active_set_low[i];
    }
    let numactive = work.active_inequalities.iter().filter(|&&b| b).count();
    let inner_pb_dim = dim + n_eq + numactive;

    work.rhs.set(T::zero());
    work.dw_aug.set(T::zero());
    work.rhs[..dim].scalarop_from(|v| -v, &work.dual_residual_scaled);

    active_set_change(model, results, work);

    iterative_solve(settings, model, results, work, eps, inner_pb_dim)
}

/// Reduces the projected stationarity residual via repeated semismooth
/// Newton steps with exact line search.  Returns the final scaled dual
/// residual norm.
pub(crate) fn correction_guess<T: FloatT>(
    settings: &Settings<T>,
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    eps_int: T,
) -> Result<T, LdlError> {
    let (dim, n_in) = (model.dim, model.n_in);
    let mu_eq = results.info.mu_eq;
    let mu_in = results.info.mu_in;
    let rho = results.info.rho;

    let mut err_in: T = (1e6).as_T();

    for iter in 0..=settings.max_iter_in {
        if iter == settings.max_iter_in {
            results.info.n_tot += settings.max_iter_in;
            break;
        }

        newton_step(settings, model, results, work, eps_int)?;

        work.H_scaled.gemv(&mut work.Hdx, &work.dw_aug[..dim], T::one(), T::zero());
        work.A_scaled.gemv(&mut work.Adx, &work.dw_aug[..dim], T::one(), T::zero());
        work.C_scaled.gemv(&mut work.Cdx, &work.dw_aug[..dim], T::one(), T::zero());

        if n_in > 0 {
            correction_guess_ls(model, results, work);
        } else {
            work.alpha = T::one();
        }
        let alpha = work.alpha;

        let mut step_norm = T::zero();
        for &dx in &work.dw_aug[..dim] {
            step_norm = T::max(step_norm, T::abs(alpha * dx));
        }
        if step_norm < (1e-11).as_T() {
            results.info.n_tot += iter + 1;
            if settings.verbose {
                println!("infty_norm(alpha_step * dx) {}", step_norm);
            }
            break;
        }

        results.x.axpby(alpha, &work.dw_aug[..dim], T::one());
        work.primal_residual_in_scaled_up.axpby(alpha, &work.Cdx, T::one());
        work.primal_residual_in_scaled_low.axpby(alpha, &work.Cdx, T::one());
        work.primal_residual_eq_scaled.axpby(alpha, &work.Adx, T::one());

        // first-order multiplier estimates from the staged residuals
        results.y.scalarop_from(|r| mu_eq * r, &work.primal_residual_eq_scaled);
        for i in 0..n_in {
            results.z[i] = mu_in
                * (work.primal_residual_in_scaled_up[i].positive_part()
                    + work.primal_residual_in_scaled_low[i].negative_part());
        }

        // dual residual of the inner Lagrangian, with its natural scale
        work.H_scaled.gemv(&mut work.dual_residual_scaled, &results.x, T::one(), T::zero());
        let mut rhs_c = T::max(work.correction_guess_rhs_g, work.dual_residual_scaled.norm_inf());

        work.A_scaled.t().gemv(&mut work.CTz, &results.y, T::one(), T::zero());
        for (r, &v) in izip!(&mut work.dual_residual_scaled, &work.CTz) {
            *r += v;
        }
        rhs_c = T::max(rhs_c, work.CTz.norm_inf());

        work.C_scaled.t().gemv(&mut work.CTz, &results.z, T::one(), T::zero());
        for (r, &v) in izip!(&mut work.dual_residual_scaled, &work.CTz) {
            *r += v;
        }
        rhs_c = T::max(rhs_c, work.CTz.norm_inf());

        for i in 0..dim {
            work.dual_residual_scaled[i] +=
                work.g_scaled[i] + rho * (results.x[i] - work.x_prev[i]);
        }
        rhs_c += T::one();

        err_in = work.dual_residual_scaled.norm_inf();
        if settings.verbose {
            println!(
                "---it in {} projection norm {} alpha {} rhs {}",
                iter,
                err_in,
                alpha,
                eps_int * rhs_c
            );
        }

        if err_in <= eps_int * rhs_c {
            results.info.n_tot += iter + 1;
            break;
        }
    }

    Ok(err_in)
}
