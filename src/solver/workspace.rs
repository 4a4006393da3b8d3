#![allow(non_snake_case)]
use crate::algebra::*;
use crate::ldl::DenseLdl;

/// Solver workspace: scaled problem data, the KKT buffer and its
/// factorization, residual and step buffers, and the active-set state.
///
/// All buffers are allocated once at setup to their maximal dimension so
/// that no allocation happens during a solve.
#[derive(Debug, Clone)]
pub struct Workspace<T> {
    // scaled problem blocks
    pub H_scaled: Matrix<T>,
    pub g_scaled: Vec<T>,
    pub A_scaled: Matrix<T>,
    pub b_scaled: Vec<T>,
    pub C_scaled: Matrix<T>,
    pub u_scaled: Vec<T>,
    pub l_scaled: Vec<T>,

    // iterate saved at the top of each outer iteration
    pub x_prev: Vec<T>,
    pub y_prev: Vec<T>,
    pub z_prev: Vec<T>,

    // regularized KKT buffer of the equality-constrained block
    // (dim + n_eq); active inequality rows live only in the LDL store
    pub kkt: Matrix<T>,
    pub ldl: DenseLdl<T>,

    // active set state: the bijection maps an original inequality
    // index to its position in the LDL store, with the active ones
    // occupying positions [0, n_c)
    pub current_bijection_map: Vec<usize>,
    pub new_bijection_map: Vec<usize>,
    pub n_c: usize,
    pub active_set_up: Vec<bool>,
    pub active_set_low: Vec<bool>,
    pub active_inequalities: Vec<bool>,

    // residual buffers, overwritten each iteration
    pub primal_residual_eq_scaled: Vec<T>,
    pub primal_residual_in_scaled_up: Vec<T>,
    pub primal_residual_in_scaled_low: Vec<T>,
    pub primal_residual_in_scaled_up_plus_alphaCdx: Vec<T>,
    pub primal_residual_in_scaled_low_plus_alphaCdx: Vec<T>,
    pub dual_residual_scaled: Vec<T>,
    pub CTz: Vec<T>,
    pub active_part_z: Vec<T>,

    // inner linear system buffers, maximal dimension dim + n_eq + n_in
    pub rhs: Vec<T>,
    pub dw_aug: Vec<T>,
    pub err: Vec<T>,

    // step images
    pub Hdx: Vec<T>,
    pub Adx: Vec<T>,
    pub Cdx: Vec<T>,

    // line search state
    pub alpha: T,
    pub alphas: Vec<T>,
    pub ls_rhs: Vec<T>,
    pub ls_dir: Vec<T>,

    // cached norms of the unscaled data, for relative termination
    pub primal_feasibility_rhs_1_eq: T,
    pub primal_feasibility_rhs_1_in_u: T,
    pub primal_feasibility_rhs_1_in_l: T,
    pub dual_feasibility_rhs_2: T,
    // infinity norm of the scaled linear cost, for the inner stop rule
    pub correction_guess_rhs_g: T,
}

impl<T> Workspace<T>
where
    T: FloatT,
{
    pub fn new(dim: usize, n_eq: usize, n_in: usize) -> Self {
        let n_aug = dim + n_eq + n_in;

        Self {
            H_scaled: Matrix::zeros((dim, dim)),
            g_scaled: vec![T::zero(); dim],
            A_scaled: Matrix::zeros((n_eq, dim)),
            b_scaled: vec![T::zero(); n_eq],
            C_scaled: Matrix::zeros((n_in, dim)),
            u_scaled: vec![T::zero(); n_in],
            l_scaled: vec![T::zero(); n_in],

            x_prev: vec![T::zero(); dim],
            y_prev: vec![T::zero(); n_eq],
            z_prev: vec![T::zero(); n_in],

            kkt: Matrix::zeros((dim + n_eq, dim + n_eq)),
            ldl: DenseLdl::new(n_aug),

            current_bijection_map: (0..n_in).collect(),
            new_bijection_map: (0..n_in).collect(),
            n_c: 0,
            active_set_up: vec![false; n_in],
            active_set_low: vec![false; n_in],
            active_inequalities: vec![false; n_in],

            primal_residual_eq_scaled: vec![T::zero(); n_eq],
            primal_residual_in_scaled_up: vec![T::zero(); n_in],
            primal_residual_in_scaled_low: vec![T::zero(); n_in],
            primal_residual_in_scaled_up_plus_alphaCdx: vec![T::zero(); n_in],
            primal_residual_in_scaled_low_plus_alphaCdx: vec![T::zero(); n_in],
            dual_residual_scaled: vec![T::zero(); dim],
            CTz: vec![T::zero(); dim],
            active_part_z: vec![T::zero(); n_in],

            rhs: vec![T::zero(); n_aug],
            dw_aug: vec![T::zero(); n_aug],
            err: vec![T::zero(); n_aug],

            Hdx: vec![T::zero(); dim],
            Adx: vec![T::zero(); n_eq],
            Cdx: vec![T::zero(); n_in],

            alpha: T::one(),
            alphas: Vec::with_capacity(2 * n_in),
            ls_rhs: vec![T::zero(); dim],
            ls_dir: vec![T::zero(); dim],

            primal_feasibility_rhs_1_eq: T::zero(),
            primal_feasibility_rhs_1_in_u: T::zero(),
            primal_feasibility_rhs_1_in_l: T::zero(),
            dual_feasibility_rhs_2: T::zero(),
            correction_guess_rhs_g: T::zero(),
        }
    }

    /// Empty the active set and restore the identity bijection.
    pub fn reset_active_set(&mut self) {
        for (i, b) in self.current_bijection_map.iter_mut().enumerate() {
            *b = i;
        }
        self.new_bijection_map.copy_from_slice(&self.current_bijection_map);
        self.n_c = 0;

        for i in 0..self.active_inequalities.len() {
            self.active_set_up[i] = false;
            self.active_set_low[i] = false;
            self.active_inequalities[i] = false;
        }
    }

    /// Reset the iteration state: buffers zeroed, active set emptied,
    /// bijection restored to the identity.
    pub fn cleanup(&mut self) {
        self.x_prev.set(T::zero());
        self.y_prev.set(T::zero());
        self.z_prev.set(T::zero());

        self.reset_active_set();

        self.primal_residual_eq_scaled.set(T::zero());
        self.primal_residual_in_scaled_up.set(T::zero());
        self.primal_residual_in_scaled_low.set(T::zero());
        self.primal_residual_in_scaled_up_plus_alphaCdx.set(T::zero());
        self.primal_residual_in_scaled_low_plus_alphaCdx.set(T::zero());
        self.dual_residual_scaled.set(T::zero());
        self.CTz.set(T::zero());
        self.active_part_z.set(T::zero());

        self.rhs.set(T::zero());
        self.dw_aug.set(T::zero());
        self.err.set(T::zero());

        self.Hdx.set(T::zero());
        self.Adx.set(T::zero());
        self.Cdx.set(T::zero());

        self.alpha = T::one();
    }
}
