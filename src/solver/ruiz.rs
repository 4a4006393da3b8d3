#![allow(non_snake_case)]
use crate::algebra::*;

/// Mutable view over the scaled problem blocks held in the workspace
pub struct QpViewMut<'a, T> {
    pub H: &'a mut Matrix<T>,
    pub g: &'a mut [T],
    pub A: &'a mut Matrix<T>,
    pub b: &'a mut [T],
    pub C: &'a mut Matrix<T>,
    pub u: &'a mut [T],
    pub l: &'a mut [T],
}

/// Ruiz equilibration state
///
/// Holds one diagonal scaling value per primal variable, equality row and
/// inequality row, stacked into `delta`, plus the scalar cost scaling
/// `c`.  The scaled problem relates to the original by
///
/// ```text
///   H_s = c·D·H·D     g_s = c·D·g
///   A_s = E·A·D       b_s = E·b
///   C_s = F·C·D       u_s = F·u     l_s = F·l
/// ```
///
/// with `D = diag(delta[..dim])`, `E = diag(delta[dim..dim+n_eq])` and
/// `F = diag(delta[dim+n_eq..])`.  Every `scale_*`/`unscale_*` pair below
/// is pointwise inverse.
#[derive(Debug, Clone)]
pub struct RuizEquilibration<T> {
    pub delta: Vec<T>,
    pub c: T,
    dim: usize,
    n_eq: usize,
}

impl<T> RuizEquilibration<T>
where
    T: FloatT,
{
    pub fn new(dim: usize, n_eq: usize, n_in: usize) -> Self {
        Self {
            delta: vec![T::one(); dim + n_eq + n_in],
            c: T::one(),
            dim,
            n_eq,
        }
    }

    pub fn reset_to_identity(&mut self) {
        self.delta.set(T::one());
        self.c = T::one();
    }

    /// Equilibrates the problem blocks in place.
    ///
    /// With `execute` set, runs up to `max_iter` balancing sweeps until
    /// every row/column infinity norm of `[H A C]` is within `accuracy`
    /// of one, then applies the cost normalization.  Otherwise reapplies
    /// the stored scaling to fresh problem data.
    pub fn scale_qp_in_place(
        &mut self,
        qp: QpViewMut<T>,
        execute: bool,
        max_iter: usize,
        accuracy: T,
    ) {
        let (dim, n_eq) = (self.dim, self.n_eq);

        if !execute {
            let (dh, tail) = self.delta.split_at(dim);
            let (de, df) = tail.split_at(n_eq);
            qp.H.lrscale(dh, dh);
            qp.H.scale(self.c);
            qp.g.hadamard(dh);
            qp.g.scale(self.c);
            qp.A.lrscale(de, dh);
            qp.b.hadamard(de);
            qp.C.lrscale(df, dh);
            qp.u.hadamard(df);
            qp.l.hadamard(df);
            return;
        }

        self.reset_to_identity();

        // setup-time scratch; nothing here is called from the solve loop
        let total = self.delta.len();
        let mut delta_cur = vec![T::one(); total];
        let mut col_norms = vec![T::zero(); dim];
        let mut row_norms_eq = vec![T::zero(); n_eq];
        let mut row_norms_in = vec![T::zero(); total - dim - n_eq];

        for _ in 0..max_iter {
            // aggregated column norms of the stacked [H; A; C] block,
            // and row norms of the constraint blocks
            col_norms.set(T::zero());
            qp.H.col_norms_no_reset(&mut col_norms);
            qp.A.col_norms_no_reset(&mut col_norms);
            qp.C.col_norms_no_reset(&mut col_norms);
            qp.A.row_norms(&mut row_norms_eq);
            qp.C.row_norms(&mut row_norms_in);

            let mut err = T::zero();
            for &n in col_norms.iter().chain(&row_norms_eq).chain(&row_norms_in) {
                err = T::max(err, T::abs(T::one() - n));
            }
            if err <= accuracy {
                break;
            }

            // zero rows or columns should not get scaled
            let balance = |n: T| {
                if n == T::zero() {
                    T::one()
                } else {
                    T::recip(n.sqrt())
                }
            };
            delta_cur[..dim].scalarop_from(balance, &col_norms);
            delta_cur[dim..dim + n_eq].scalarop_from(balance, &row_norms_eq);
            delta_cur[dim + n_eq..].scalarop_from(balance, &row_norms_in);

            {
                let (dh, tail) = delta_cur.split_at(dim);
                let (de, df) = tail.split_at(n_eq);
                qp.H.lrscale(dh, dh);
                qp.g.hadamard(dh);
                qp.A.lrscale(de, dh);
                qp.b.hadamard(de);
                qp.C.lrscale(df, dh);
                qp.u.hadamard(df);
                qp.l.hadamard(df);
            }
            self.delta.hadamard(&delta_cur);
        }

        // cost normalization against the scaled objective data
        qp.H.col_norms(&mut col_norms);
        let scale_cost = T::max(T::max(col_norms.mean(), qp.g.norm_inf()), T::one());
        let γ = T::recip(scale_cost);
        qp.g.scale(γ);
        qp.H.scale(γ);
        self.c = γ;
    }

    // -------------------------------------------------------------
    // elementwise scaling of iterates and residuals.
    // each pair below is pointwise inverse.
    // -------------------------------------------------------------

    pub fn scale_primal_in_place(&self, x: &mut [T]) {
        for (x, &d) in std::iter::zip(x, &self.delta[..self.dim]) {
            *x /= d;
        }
    }
    pub fn unscale_primal_in_place(&self, x: &mut [T]) {
        x.hadamard(&self.delta[..self.dim]);
    }

    pub fn scale_dual_in_place_eq(&self, y: &mut [T]) {
        let c = self.c;
        for (y, &d) in std::iter::zip(y, &self.delta[self.dim..self.dim + self.n_eq]) {
            *y = *y * c / d;
        }
    }
    pub fn unscale_dual_in_place_eq(&self, y: &mut [T]) {
        let cinv = T::recip(self.c);
        for (y, &d) in std::iter::zip(y, &self.delta[self.dim..self.dim + self.n_eq]) {
            *y = *y * d * cinv;
        }
    }

    pub fn scale_dual_in_place_in(&self, z: &mut [T]) {
        let c = self.c;
        for (z, &d) in std::iter::zip(z, &self.delta[self.dim + self.n_eq..]) {
            *z = *z * c / d;
        }
    }
    pub fn unscale_dual_in_place_in(&self, z: &mut [T]) {
        let cinv = T::recip(self.c);
        for (z, &d) in std::iter::zip(z, &self.delta[self.dim + self.n_eq..]) {
            *z = *z * d * cinv;
        }
    }

    pub fn scale_primal_residual_in_place_eq(&self, r: &mut [T]) {
        r.hadamard(&self.delta[self.dim..self.dim + self.n_eq]);
    }
    pub fn unscale_primal_residual_in_place_eq(&self, r: &mut [T]) {
        for (r, &d) in std::iter::zip(r, &self.delta[self.dim..self.dim + self.n_eq]) {
            *r /= d;
        }
    }

    pub fn scale_primal_residual_in_place_in(&self, r: &mut [T]) {
        r.hadamard(&self.delta[self.dim + self.n_eq..]);
    }
    pub fn unscale_primal_residual_in_place_in(&self, r: &mut [T]) {
        for (r, &d) in std::iter::zip(r, &self.delta[self.dim + self.n_eq..]) {
            *r /= d;
        }
    }

    pub fn scale_dual_residual_in_place(&self, r: &mut [T]) {
        let c = self.c;
        for (r, &d) in std::iter::zip(r, &self.delta[..self.dim]) {
            *r = *r * c * d;
        }
    }
    pub fn unscale_dual_residual_in_place(&self, r: &mut [T]) {
        let cinv = T::recip(self.c);
        for (r, &d) in std::iter::zip(r, &self.delta[..self.dim]) {
            *r = *r * cinv / d;
        }
    }
}
