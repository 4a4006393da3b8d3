use super::Settings;
use crate::algebra::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ---------------------------------
// Solver status type
// ---------------------------------

/// Final status reported by the solver
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverStatus {
    ///no solve attempted yet, or solve in progress
    #[default]
    Unsolved,
    ///primal and dual residuals met the requested tolerances
    Solved,
    ///outer iteration cap hit; the iterate is the best found so far
    MaxIterReached,
    ///an iterate or residual became NaN or infinite
    NonFinite,
    ///persistent bad steps at saturated penalties with no primal progress
    Infeasible,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Solve statistics and proximal-parameter state
#[derive(Debug, Clone)]
pub struct Info<T> {
    pub status: SolverStatus,
    /// outer (BCL) iterations
    pub n_ext: usize,
    /// total inner iterations
    pub n_tot: usize,
    /// penalty parameter updates applied to the factorization
    pub n_mu_updates: usize,
    /// full refactorizations (drift recovery and the ρ rule)
    pub n_refactor: usize,

    // proximal parameters, with cached inverses
    pub rho: T,
    pub mu_eq: T,
    pub mu_eq_inv: T,
    pub mu_in: T,
    pub mu_in_inv: T,

    /// primal objective at the returned iterate
    pub obj_val: T,
    /// setup wall-clock time, seconds
    pub setup_time: f64,
    /// solve wall-clock time, seconds
    pub run_time: f64,
}

/// Solver results: the primal/dual iterate plus solve statistics
#[derive(Debug, Clone)]
pub struct Results<T> {
    /// primal solution
    pub x: Vec<T>,
    /// equality multipliers
    pub y: Vec<T>,
    /// inequality multipliers
    pub z: Vec<T>,
    pub info: Info<T>,
}

impl<T> Results<T>
where
    T: FloatT,
{
    pub fn new(dim: usize, n_eq: usize, n_in: usize, settings: &Settings<T>) -> Self {
        Self {
            x: vec![T::zero(); dim],
            y: vec![T::zero(); n_eq],
            z: vec![T::zero(); n_in],
            info: Info {
                status: SolverStatus::Unsolved,
                n_ext: 0,
                n_tot: 0,
                n_mu_updates: 0,
                n_refactor: 0,
                rho: settings.default_rho,
                mu_eq: settings.default_mu_eq,
                mu_eq_inv: T::recip(settings.default_mu_eq),
                mu_in: settings.default_mu_in,
                mu_in_inv: T::recip(settings.default_mu_in),
                obj_val: T::nan(),
                setup_time: 0f64,
                run_time: 0f64,
            },
        }
    }

    /// Full reset: zero the iterate and restore default proximal parameters.
    pub fn cleanup(&mut self, settings: &Settings<T>) {
        self.x.set(T::zero());
        self.y.set(T::zero());
        self.z.set(T::zero());
        self.cold_start(settings);
    }

    /// Keep the iterate but restore proximal parameters and statistics.
    pub fn cold_start(&mut self, settings: &Settings<T>) {
        self.info.rho = settings.default_rho;
        self.info.mu_eq = settings.default_mu_eq;
        self.info.mu_eq_inv = T::recip(settings.default_mu_eq);
        self.info.mu_in = settings.default_mu_in;
        self.info.mu_in_inv = T::recip(settings.default_mu_in);
        self.cleanup_statistics();
    }

    /// Reset statistics only.
    pub fn cleanup_statistics(&mut self) {
        self.info.status = SolverStatus::Unsolved;
        self.info.n_ext = 0;
        self.info.n_tot = 0;
        self.info.n_mu_updates = 0;
        self.info.n_refactor = 0;
        self.info.obj_val = T::nan();
        self.info.run_time = 0f64;
    }
}
