#![allow(non_snake_case)]
use crate::algebra::*;
use thiserror::Error;

/// Error codes returnable from [`DenseLdl`](DenseLdl) factor operations
#[derive(Error, Debug)]
pub enum LdlError {
    #[error("Matrix dimension fields are incompatible")]
    IncompatibleDimension,
    #[error("Matrix factorization produced a zero pivot")]
    ZeroPivot,
}

/// Performs an editable $LDL^T$ factorization of a symmetric quasidefinite matrix
///
/// The factorization is unpivoted so that row/column positions remain
/// stable under [`insert_at`](DenseLdl::insert_at) and
/// [`delete_at`](DenseLdl::delete_at).  This is appropriate for the
/// regularized KKT matrices produced by the solver, which are strongly
/// quasidefinite by construction.
#[derive(Debug, Clone)]
pub struct DenseLdl<T = f64> {
    // fixed capacity of the store
    cap: usize,
    // current factored dimension
    n: usize,
    // unit lower triangular factor, held in the leading block
    // of a capacity-sized dense matrix
    L: Matrix<T>,
    // diagonal of D
    D: Vec<T>,
    // workspace for updates and inserted columns
    work: Vec<T>,
}

impl<T> DenseLdl<T>
where
    T: FloatT,
{
    /// Creates an empty store able to factor matrices up to dimension `cap`.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            n: 0,
            L: Matrix::zeros((cap, cap)),
            D: vec![T::zero(); cap],
            work: vec![T::zero(); cap],
        }
    }

    /// Current dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Factors the symmetric matrix `mat`, replacing any previous factorization.
    pub fn factorize(&mut self, mat: &Matrix<T>) -> Result<(), LdlError> {
        if !mat.is_square() || mat.nrows() > self.cap {
            return Err(LdlError::IncompatibleDimension);
        }
        let n = mat.nrows();
        self.n = n;

        for j in 0..n {
            let mut dj = mat[(j, j)];
            for k in 0..j {
                dj -= self.L[(j, k)] * self.L[(j, k)] * self.D[k];
            }
            if dj == T::zero() {
                return Err(LdlError::ZeroPivot);
            }
            self.D[j] = dj;
            self.L[(j, j)] = T::one();

            for i in (j + 1)..n {
                let mut v = mat[(i, j)];
                for k in 0..j {
                    v -= self.L[(i, k)] * self.L[(j, k)] * self.D[k];
                }
                self.L[(i, j)] = v / dj;
            }
        }
        Ok(())
    }

    /// Solves `M·x = v` in place using the current factors, with `v`
    /// of the current factored dimension.
    pub fn solve_in_place(&self, v: &mut [T]) {
        let n = self.n;
        assert_eq!(v.len(), n);

        // M = L D Lᵀ: forward substitution, diagonal scaling,
        // then backward substitution
        for j in 0..n {
            let vj = v[j];
            for i in (j + 1)..n {
                v[i] -= self.L[(i, j)] * vj;
            }
        }
        for i in 0..n {
            v[i] /= self.D[i];
        }
        for j in (0..n).rev() {
            let mut vj = v[j];
            for i in (j + 1)..n {
                vj -= self.L[(i, j)] * v[i];
            }
            v[j] = vj;
        }
    }

    /// Updates the factors to those of `M + σ·w·wᵀ`.
    pub fn rank_one_update(&mut self, w: &[T], σ: T) {
        assert_eq!(w.len(), self.n);
        self.work[..self.n].copy_from(w);
        self.rank_one_update_range(0, σ);
    }

    // rank-one update restricted to the trailing factor block
    // [start, n), with the update vector staged in self.work.
    // Method C1 of Gill, Golub, Murray and Saunders.
    fn rank_one_update_range(&mut self, start: usize, σ: T) {
        let n = self.n;
        let mut α = σ;

        for j in start..n {
            let p = self.work[j];
            let dj = self.D[j];
            let dnew = dj + α * p * p;
            let γ = p * α / dnew;
            self.D[j] = dnew;
            α = α * dj / dnew;

            for i in (j + 1)..n {
                self.work[i] -= p * self.L[(i, j)];
                self.L[(i, j)] += γ * self.work[i];
            }
        }
    }

    /// Grows the factored matrix by one row/column at position `k`, whose
    /// new column in `M` is `w` (length `n+1`, diagonal entry at `w[k]`).
    pub fn insert_at(&mut self, k: usize, w: &[T]) {
        let n = self.n;
        assert!(k <= n && n < self.cap);
        assert_eq!(w.len(), n + 1);

        // shift the trailing factor one slot down and right
        for j in (k..n).rev() {
            for i in (j..n).rev() {
                let v = self.L[(i, j)];
                self.L[(i + 1, j + 1)] = v;
            }
        }
        for j in 0..k {
            for i in (k..n).rev() {
                let v = self.L[(i, j)];
                self.L[(i + 1, j)] = v;
            }
        }
        for i in (k..n).rev() {
            self.D[i + 1] = self.D[i];
        }
        self.n = n + 1;

        // new row k of L against the leading block: with t = L₁₁⁻¹·w[..k],
        // the row is t./D and the new pivot is w[k] - Σ tᵢ²/Dᵢ
        self.work[..k].copy_from(&w[..k]);
        for j in 0..k {
            let t = self.work[j];
            for i in (j + 1)..k {
                self.work[i] -= self.L[(i, j)] * t;
            }
        }
        let mut dk = w[k];
        for j in 0..k {
            let t = self.work[j];
            self.L[(k, j)] = t / self.D[j];
            dk -= t * t / self.D[j];
        }
        self.D[k] = dk;
        self.L[(k, k)] = T::one();

        // new column k below the diagonal
        for i in (k + 1)..=n {
            let mut v = w[i];
            for j in 0..k {
                v -= self.L[(i, j)] * self.work[j];
            }
            self.L[(i, k)] = v / dk;
        }

        // the trailing Schur complement loses dk·l₃₂·l₃₂ᵀ
        for i in (k + 1)..=n {
            self.work[i] = self.L[(i, k)];
        }
        self.rank_one_update_range(k + 1, -dk);
    }

    /// Shrinks the factored matrix by removing row/column `k`.
    pub fn delete_at(&mut self, k: usize) {
        let n = self.n;
        assert!(k < n);
        let dk = self.D[k];

        // save the deleted subdiagonal column, aligned to
        // post-deletion indices
        for i in (k + 1)..n {
            self.work[i - 1] = self.L[(i, k)];
        }

        // shift the trailing factor one slot up and left
        for j in 0..k {
            for i in (k + 1)..n {
                let v = self.L[(i, j)];
                self.L[(i - 1, j)] = v;
            }
        }
        for j in (k + 1)..n {
            for i in j..n {
                let v = self.L[(i, j)];
                self.L[(i - 1, j - 1)] = v;
            }
        }
        for i in (k + 1)..n {
            self.D[i - 1] = self.D[i];
        }
        self.n = n - 1;

        // the trailing Schur complement regains dk·l₃₂·l₃₂ᵀ
        self.rank_one_update_range(k, dk);
    }

    /// Returns `L·D·Lᵀ` for diagnostics.
    pub fn reconstructed_matrix(&self) -> Matrix<T> {
        let n = self.n;
        let mut M = Matrix::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let mut v = T::zero();
                for k in 0..=j {
                    v += self.L[(i, k)] * self.D[k] * self.L[(j, k)];
                }
                M[(i, j)] = v;
                M[(j, i)] = v;
            }
        }
        M
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_matrix() -> Matrix<f64> {
        // symmetric quasidefinite, column major
        Matrix::new_from_slice(
            (4, 4),
            &[
                4.0, 1.0, 2.0, 1.0, //
                1.0, 3.0, 0.5, 0.0, //
                2.0, 0.5, -2.0, 0.2, //
                1.0, 0.0, 0.2, -3.0, //
            ],
        )
    }

    fn norm_inf_diff(a: &Matrix<f64>, b: &Matrix<f64>) -> f64 {
        a.data.norm_inf_diff(&b.data)
    }

    #[test]
    fn test_factor_and_solve() {
        let M = test_matrix();
        let mut ldl = DenseLdl::new(6);
        ldl.factorize(&M).unwrap();

        assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &M) < 1e-12);

        let mut v = vec![1.0, -2.0, 0.5, 3.0];
        let b = v.clone();
        ldl.solve_in_place(&mut v);

        let mut bcheck = vec![0.0; 4];
        M.gemv(&mut bcheck, &v, 1.0, 0.0);
        assert!(bcheck.norm_inf_diff(&b) < 1e-12);
    }

    #[test]
    fn test_rank_one_update() {
        let mut M = test_matrix();
        let mut ldl = DenseLdl::new(6);
        ldl.factorize(&M).unwrap();

        let w = vec![1.0, 0.5, -1.0, 0.25];
        let σ = 0.5;
        ldl.rank_one_update(&w, σ);

        for i in 0..4 {
            for j in 0..4 {
                M[(i, j)] += σ * w[i] * w[j];
            }
        }
        assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &M) < 1e-12);
    }

    #[test]
    fn test_insert_then_delete_is_identity() {
        let M = test_matrix();
        let mut ldl = DenseLdl::new(6);
        ldl.factorize(&M).unwrap();
        let before = ldl.reconstructed_matrix();

        for k in 0..=4 {
            let mut w = vec![0.3, -0.1, 0.2, 0.05, -2.0];
            w.swap(k, 4); // diagonal entry lands at position k
            ldl.insert_at(k, &w);
            assert_eq!(ldl.dim(), 5);
            ldl.delete_at(k);
            assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &before) < 1e-10);
        }
    }

    #[test]
    fn test_insert_matches_refactorize() {
        let M = test_matrix();
        let mut ldl = DenseLdl::new(6);
        ldl.factorize(&M).unwrap();

        let k = 2;
        let w = vec![0.7, -0.3, -5.0, 0.1, 0.4];
        ldl.insert_at(k, &w);

        // embed the new row/column into a dense matrix directly
        let mut Mbig = Matrix::zeros((5, 5));
        for i in 0..4 {
            for j in 0..4 {
                let ii = if i < k { i } else { i + 1 };
                let jj = if j < k { j } else { j + 1 };
                Mbig[(ii, jj)] = M[(i, j)];
            }
        }
        for i in 0..5 {
            Mbig[(i, k)] = w[i];
            Mbig[(k, i)] = w[i];
        }

        assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &Mbig) < 1e-10);
    }
}
