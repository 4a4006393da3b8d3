#![allow(non_snake_case)]
//! Assembly and incremental maintenance of the regularized KKT matrix.
//!
//! The factorization invariant: after any of the operations here, the LDL
//! store factors exactly
//!
//! ```text
//!   [ H_s + ρ·I    A_sᵀ        C_active_sᵀ ]
//!   [ A_s          -μ_eq⁻¹·I   0           ]
//!   [ C_active_s   0           -μ_in⁻¹·I   ]
//! ```
//!
//! at the current (ρ, μ, active set).  The workspace `kkt` buffer holds
//! only the leading dim+n_eq block; active inequality rows exist only
//! inside the LDL store and are re-inserted after every full refactor.

use crate::algebra::*;
use crate::ldl::LdlError;

use super::{Model, Results, Workspace};

/// Builds the equality-constrained KKT block and performs the first
/// factorization.  The active set is expected to be empty.
pub(crate) fn setup_factorization<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
) -> Result<(), LdlError> {
    let (dim, n_eq) = (model.dim, model.n_eq);
    debug_assert_eq!(work.n_c, 0);

    for j in 0..dim {
        for i in 0..dim {
            work.kkt[(i, j)] = work.H_scaled[(i, j)];
        }
        work.kkt[(j, j)] += results.info.rho;
    }
    for i in 0..n_eq {
        for j in 0..dim {
            let v = work.A_scaled[(i, j)];
            work.kkt[(dim + i, j)] = v;
            work.kkt[(j, dim + i)] = v;
        }
        for j in 0..n_eq {
            work.kkt[(dim + i, dim + j)] = T::zero();
        }
        work.kkt[(dim + i, dim + i)] = -results.info.mu_eq_inv;
    }

    work.ldl.factorize(&work.kkt)
}

/// Full refactorization at a new primal proximal parameter, preserving
/// the active set: the kkt diagonal is moved to `rho_new`, factored, and
/// every active row is re-inserted in bijection order.
///
/// The caller owns the update of `results.info.rho`.
pub(crate) fn refactorize<T: FloatT>(
    model: &Model<T>,
    results: &mut Results<T>,
    work: &mut Workspace<T>,
    rho_new: T,
) -> Result<(), LdlError> {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);

    work.dw_aug.set(T::zero());
    for i in 0..dim {
        work.kkt[(i, i)] += rho_new - results.info.rho;
    }
    for i in 0..n_eq {
        work.kkt[(dim + i, dim + i)] = -results.info.mu_eq_inv;
    }
    work.ldl.factorize(&work.kkt)?;
    results.info.n_refactor += 1;

    for j in 0..work.n_c {
        for i in 0..n_in {
            if j == work.current_bijection_map[i] {
                work.C_scaled.row_to(&mut work.dw_aug[..dim], i);
                work.dw_aug[dim + n_eq + j] = -results.info.mu_in_inv;
                work.ldl.insert_at(dim + n_eq + j, &work.dw_aug[..dim + n_eq + j + 1]);
                work.dw_aug[dim + n_eq + j] = T::zero();
            }
        }
    }
    work.dw_aug.set(T::zero());
    Ok(())
}

/// Moves the penalty diagonals of the factored KKT matrix to new values
/// through one rank-one update per equality row and per active
/// inequality row.
pub(crate) fn mu_update<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
    mu_eq_new_inv: T,
    mu_in_new_inv: T,
) {
    let (dim, n_eq) = (model.dim, model.n_eq);
    let n_aug = dim + n_eq + work.n_c;

    work.dw_aug[..n_aug].set(T::zero());
    if n_eq > 0 {
        // the diagonal entry is -mu_eq_inv, so it moves by the
        // difference of the old and new inverses
        let diff = results.info.mu_eq_inv - mu_eq_new_inv;
        for i in 0..n_eq {
            work.dw_aug[dim + i] = T::one();
            work.ldl.rank_one_update(&work.dw_aug[..n_aug], diff);
            work.dw_aug[dim + i] = T::zero();
        }
    }
    if work.n_c > 0 {
        let diff = results.info.mu_in_inv - mu_in_new_inv;
        for i in 0..work.n_c {
            work.dw_aug[dim + n_eq + i] = T::one();
            work.ldl.rank_one_update(&work.dw_aug[..n_aug], diff);
            work.dw_aug[dim + n_eq + i] = T::zero();
        }
    }
}

/// Synchronizes the LDL store and the bijection with the planned active
/// set in `work.active_inequalities`: deletions first, then insertions
/// at position `n_c`.
pub(crate) fn active_set_change<T: FloatT>(
    model: &Model<T>,
    results: &Results<T>,
    work: &mut Workspace<T>,
) {
    let (dim, n_eq, n_in) = (model.dim, model.n_eq, model.n_in);
    let n = dim + n_eq;

    work.new_bijection_map.copy_from_slice(&work.current_bijection_map);
    work.dw_aug.set(T::zero());

    // deletions
    for i in 0..n_in {
        if !work.active_inequalities[i] && work.new_bijection_map[i] < work.n_c {
            let pos = work.new_bijection_map[i];
            work.ldl.delete_at(n + pos);
            for b in work.new_bijection_map.iter_mut() {
                if *b > pos {
                    *b -= 1;
                }
            }
            work.new_bijection_map[i] = n_in - 1;
            work.n_c -= 1;
        }
    }

    // insertions
    for i in 0..n_in {
        if work.active_inequalities[i] && work.new_bijection_map[i] >= work.n_c {
            let pos = work.new_bijection_map[i];
            work.C_scaled.row_to(&mut work.dw_aug[..dim], i);
            work.dw_aug[n + work.n_c] = -results.info.mu_in_inv;
            work.ldl.insert_at(n + work.n_c, &work.dw_aug[..n + work.n_c + 1]);
            work.dw_aug[n + work.n_c] = T::zero();

            for b in work.new_bijection_map.iter_mut() {
                if *b >= work.n_c && *b < pos {
                    *b += 1;
                }
            }
            work.new_bijection_map[i] = work.n_c;
            work.n_c += 1;
        }
    }

    work.current_bijection_map.copy_from_slice(&work.new_bijection_map);
    work.dw_aug.set(T::zero());
}
