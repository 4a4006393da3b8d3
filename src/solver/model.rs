#![allow(non_snake_case)]
use crate::algebra::*;
use crate::ldl::LdlError;
use thiserror::Error;

/// Errors raised synchronously from the solver API
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Matrix or vector dimensions are incompatible")]
    IncompatibleDimension,
    #[error("Lower bound exceeds upper bound at inequality row {0}")]
    BoundOrder(usize),
    #[error(transparent)]
    Ldl(#[from] LdlError),
}

/// QP problem data as provided by the user, without any scaling applied
///
/// Holds the problem
/// ```text
///   minimize   0.5 xᵀHx + gᵀx
///   s.t.       Ax = b
///              l ≤ Cx ≤ u
/// ```
/// Immutable during a solve; rewritten by `setup` and `update`.
#[derive(Debug, Clone)]
pub struct Model<T> {
    pub dim: usize,
    pub n_eq: usize,
    pub n_in: usize,

    pub H: Matrix<T>,
    pub g: Vec<T>,
    pub A: Matrix<T>,
    pub b: Vec<T>,
    pub C: Matrix<T>,
    pub u: Vec<T>,
    pub l: Vec<T>,
}

impl<T> Model<T>
where
    T: FloatT,
{
    pub fn new(
        H: &Matrix<T>,
        g: &[T],
        A: &Matrix<T>,
        b: &[T],
        C: &Matrix<T>,
        u: &[T],
        l: &[T],
    ) -> Result<Self, SolverError> {
        let dim = g.len();
        let n_eq = b.len();
        let n_in = u.len();

        check_dimensions(H, g, A, b, C, u, l)?;
        check_bound_order(u, l)?;

        // empty constraint blocks are normalized to (0, dim) so the
        // workspace shapes stay consistent
        let A = if n_eq == 0 {
            Matrix::zeros((0, dim))
        } else {
            A.clone()
        };
        let C = if n_in == 0 {
            Matrix::zeros((0, dim))
        } else {
            C.clone()
        };

        Ok(Self {
            dim,
            n_eq,
            n_in,
            H: H.clone(),
            g: g.to_vec(),
            A,
            b: b.to_vec(),
            C,
            u: u.to_vec(),
            l: l.to_vec(),
        })
    }
}

pub(crate) fn check_dimensions<T: FloatT>(
    H: &Matrix<T>,
    g: &[T],
    A: &Matrix<T>,
    b: &[T],
    C: &Matrix<T>,
    u: &[T],
    l: &[T],
) -> Result<(), SolverError> {
    let dim = g.len();

    if !H.is_square() || H.nrows() != dim {
        return Err(SolverError::IncompatibleDimension);
    }
    if A.nrows() != b.len() || (A.nrows() > 0 && A.ncols() != dim) {
        return Err(SolverError::IncompatibleDimension);
    }
    if C.nrows() != u.len() || u.len() != l.len() || (C.nrows() > 0 && C.ncols() != dim) {
        return Err(SolverError::IncompatibleDimension);
    }
    Ok(())
}

pub(crate) fn check_bound_order<T: FloatT>(u: &[T], l: &[T]) -> Result<(), SolverError> {
    for (i, (&ui, &li)) in std::iter::zip(u, l).enumerate() {
        if li > ui {
            return Err(SolverError::BoundOrder(i));
        }
    }
    Ok(())
}
