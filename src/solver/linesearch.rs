#![allow(non_snake_case)]
//! Exact line searches for the two inner step variants.
//!
//! Both merit functions are convex and piecewise quadratic in the step
//! length, with breakpoints exactly where a staged inequality residual
//! `r + α·Cdx` crosses zero.  The searches collect the positive
//! breakpoints, classify each interval at a test point, evaluate the
//! quadratic piece analytically and return the exact minimizer.  No
//! backtracking is involved.

use crate::algebra::*;
use std::cmp::Ordering;

use super::{Model, Results, Workspace};

// gather positive breakpoints of r_up/r_low + α·Cdx into work.alphas,
// sorted ascending with exact duplicates removed
fn stage_breakpoints<T: FloatT>(alphas: &mut Vec<T>, r_up: &[T], r_low: &[T], Cdx: &[T]) {
    alphas.clear();
    for i in 0..Cdx.len() {
        let cdx = Cdx[i];
        if cdx != T::zero() {
            // infinite bounds produce infinite crossing points; those
            // rows never change classification over α ≥ 0
            let a1 = -r_up[i] / cdx;
            if a1 > T::zero() && a1.is_finite() {
                alphas.push(a1);
            }
            let a2 = -r_low[i] / cdx;
            if a2 > T::zero() && a2.is_finite() {
                alphas.push(a2);
            }
        }
    }
    alphas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    alphas.dedup();
}

/// Exact minimizer of the saddle-point merit function for the
/// initial-guess step.
///
/// On each interval the residual of the active-set-restricted KKT system
/// is affine in α, so its squared norm is quadratic: the head block is
/// `r_d + α·Hdx` plus the active columns `C_iᵀ(z_i + α·dz_i)`, the middle
/// block `r_eq + α·Adx`, and per inequality either the staged residual
/// (active) or the vanishing dual `(z_i + α·dz_i)/μ_in` (inactive).
/// The best interval minimizer over α ≥ 0 wins.
pub(crate) fn initial_guess_ls<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
) {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);
    let mu_in_inv = results.info.mu_in_inv;

    let Workspace {
        dual_residual_scaled,
        Hdx,
        primal_residual_eq_scaled,
        Adx,
        primal_residual_in_scaled_up: r_up,
        primal_residual_in_scaled_low: r_low,
        Cdx,
        dw_aug,
        C_scaled,
        ls_rhs,
        ls_dir,
        alphas,
        alpha,
        ..
    } = work;
    let dz = &dw_aug[dim + n_eq..dim + n_eq + n_in];
    let z = &results.z;

    stage_breakpoints(alphas, r_up, r_low, Cdx);

    // quadratic coefficients (pp, pq, qq) of ½‖p + αq‖² with the
    // active-set classification frozen at the test point
    let mut quad_coeffs = |test: T| -> (T, T, T) {
        ls_rhs.copy_from(dual_residual_scaled);
        ls_dir.copy_from(Hdx);

        let (mut pp, mut pq, mut qq) = (T::zero(), T::zero(), T::zero());
        for i in 0..n_in {
            let su = r_up[i] + test * Cdx[i];
            let sl = r_low[i] + test * Cdx[i];
            let (pi, qi);
            if su >= T::zero() || sl <= T::zero() {
                C_scaled.row_axpy(ls_rhs, i, z[i]);
                C_scaled.row_axpy(ls_dir, i, dz[i]);
                pi = if su >= T::zero() { r_up[i] } else { r_low[i] };
                qi = Cdx[i];
            } else {
                pi = z[i] * mu_in_inv;
                qi = dz[i] * mu_in_inv;
            }
            pp += pi * pi;
            pq += pi * qi;
            qq += qi * qi;
        }
        pp += ls_rhs.dot(ls_rhs);
        pq += ls_rhs.dot(ls_dir);
        qq += ls_dir.dot(ls_dir);

        pp += primal_residual_eq_scaled.dot(primal_residual_eq_scaled);
        pq += primal_residual_eq_scaled.dot(Adx);
        qq += Adx.dot(Adx);

        (pp, pq, qq)
    };

    let mut best_alpha = T::zero();
    let mut best_val = T::infinity();

    let mut lo = T::zero();
    for k in 0..=alphas.len() {
        let hi = if k < alphas.len() {
            alphas[k]
        } else {
            T::infinity()
        };
        if hi <= lo {
            continue;
        }
        let test = if hi.is_finite() {
            (lo + hi) / (2.0).as_T()
        } else {
            lo + T::one()
        };

        let (pp, pq, qq) = quad_coeffs(test);
        let mut cand = if qq > T::zero() { -pq / qq } else { lo };
        cand = T::min(T::max(cand, lo), hi);
        let val = (pp + cand * pq * (2.0).as_T() + cand * cand * qq) * (0.5).as_T();

        if val < best_val {
            best_val = val;
            best_alpha = cand;
        }
        lo = hi;
    }

    *alpha = best_alpha;
}

/// Exact minimizer of the primal augmented-Lagrangian merit for the
/// correction-guess step.
///
/// The derivative is piecewise linear and increasing:
///
/// ```text
///   φ'(α) = a·α + b + μ_in·Σ_active (r_i + α·Cdx_i)·Cdx_i
/// ```
///
/// with `a = dxᵀ(H+ρI)dx + μ_eq·‖Adx‖²` and `b` the slope at zero.  The
/// scan walks the intervals between breakpoints and returns the exact
/// root of the derivative, or zero when the derivative is already
/// nonnegative at the origin.
pub(crate) fn correction_guess_ls<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
) {
    let (dim, n_in) = (model.dim, model.n_in);
    let (mu_eq, mu_in) = (results.info.mu_eq, results.info.mu_in);
    let rho = results.info.rho;

    let Workspace {
        Hdx,
        Adx,
        Cdx,
        primal_residual_eq_scaled: r_eq,
        primal_residual_in_scaled_up: r_up,
        primal_residual_in_scaled_low: r_low,
        dw_aug,
        g_scaled,
        x_prev,
        alphas,
        alpha,
        ..
    } = work;
    let dx = &dw_aug[..dim];
    let x = &results.x;

    // constant parts of the derivative
    let a0 = Hdx.dot(dx) + mu_eq * Adx.dot(Adx) + rho * dx.dot(dx);
    let mut b0 = Hdx.dot(x) + g_scaled.dot(dx) + mu_eq * r_eq.dot(Adx);
    for i in 0..dim {
        b0 += rho * dx[i] * (x[i] - x_prev[i]);
    }

    stage_breakpoints(alphas, r_up, r_low, Cdx);

    // derivative coefficients on the interval containing the test point
    let interval_coeffs = |test: T| -> (T, T) {
        let (mut a, mut b) = (a0, b0);
        for i in 0..n_in {
            let su = r_up[i] + test * Cdx[i];
            let sl = r_low[i] + test * Cdx[i];
            if su > T::zero() {
                a += mu_in * Cdx[i] * Cdx[i];
                b += mu_in * r_up[i] * Cdx[i];
            } else if sl < T::zero() {
                a += mu_in * Cdx[i] * Cdx[i];
                b += mu_in * r_low[i] * Cdx[i];
            }
        }
        (a, b)
    };

    let mut lo = T::zero();
    let mut out = T::zero();
    for k in 0..=alphas.len() {
        let hi = if k < alphas.len() {
            alphas[k]
        } else {
            T::infinity()
        };
        if hi <= lo {
            continue;
        }
        let test = if hi.is_finite() {
            (lo + hi) / (2.0).as_T()
        } else {
            lo + T::one()
        };

        let (a, b) = interval_coeffs(test);
        let grad_lo = a * lo + b;
        if grad_lo >= T::zero() {
            // already increasing at the interval start
            out = lo;
            break;
        }
        let grad_hi = a * hi + b;
        if grad_hi >= T::zero() || !hi.is_finite() {
            out = if a > T::zero() {
                let root = -b / a;
                T::min(T::max(root, lo), hi)
            } else {
                lo
            };
            break;
        }
        lo = hi;
    }

    *alpha = T::max(out, T::zero());
}
