use crate::algebra::*;
use derive_builder::Builder;

#[cfg(feature = "serde")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Initial guess strategy applied at `setup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialGuess {
    /// seed (x, y) from the equality-constrained KKT system
    EqualityConstrainedInitialGuess,
    /// keep the previous iterate but restart the proximal parameters
    ColdStartWithPreviousResult,
    /// start from the zero iterate
    NoInitialGuess,
    /// iterate supplied through `warm_start`
    WarmStart,
    /// keep the previous iterate and statistics are reset only
    WarmStartWithPreviousResult,
}

/// Equilibration strategy applied at `setup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PreconditionerStatus {
    /// run the Ruiz balancing sweeps on the new problem data
    Execute,
    /// no scaling (identity preconditioner)
    Identity,
    /// reapply the previously computed scaling to the new data
    Keep,
}

/// Solver settings, built with [`SettingsBuilder`](SettingsBuilder)
/// or through [`Settings::default`](Settings::default)

#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "T: Serialize + DeserializeOwned"))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings<T: FloatT> {
    ///absolute termination threshold on primal/dual residuals
    #[builder(default = "(1e-9).as_T()")]
    pub eps_abs: T,

    ///relative termination threshold on primal/dual residuals
    #[builder(default = "T::zero()")]
    pub eps_rel: T,

    ///maximum number of outer (BCL) iterations
    #[builder(default = "10_000")]
    pub max_iter: usize,

    ///maximum number of inner (semismooth Newton) iterations
    #[builder(default = "1500")]
    pub max_iter_in: usize,

    ///maximum iterative refinement passes per KKT solve
    #[builder(default = "10")]
    pub nb_iterative_refinement: usize,

    ///refinement residual above which factorization drift is assumed
    #[builder(default = "(1e-6).as_T()")]
    pub eps_refact: T,

    ///primal residual threshold for taking the initial-guess branch
    #[builder(default = "(1e-2).as_T()")]
    pub eps_initial_guess: T,

    ///exponent of the initial outer tolerance schedule
    #[builder(default = "(0.1).as_T()")]
    pub alpha_bcl: T,

    ///exponent of the outer tolerance tightening on good steps
    #[builder(default = "(0.9).as_T()")]
    pub beta_bcl: T,

    ///penalty growth factor on bad BCL steps
    #[builder(default = "(10.0).as_T()")]
    pub mu_update_factor: T,

    ///inverse of `mu_update_factor`
    #[builder(default = "(0.1).as_T()")]
    pub mu_update_inv_factor: T,

    ///equality penalty cap
    #[builder(default = "(1e9).as_T()")]
    pub mu_max_eq: T,

    ///inequality penalty cap
    #[builder(default = "(1e8).as_T()")]
    pub mu_max_in: T,

    ///inverse of `mu_max_eq`
    #[builder(default = "(1e-9).as_T()")]
    pub mu_max_eq_inv: T,

    ///inverse of `mu_max_in`
    #[builder(default = "(1e-8).as_T()")]
    pub mu_max_in_inv: T,

    ///equality penalty restored by a cold restart
    #[builder(default = "(1.1).as_T()")]
    pub cold_reset_mu_eq: T,

    ///inequality penalty restored by a cold restart
    #[builder(default = "(1.1).as_T()")]
    pub cold_reset_mu_in: T,

    ///inverse of `cold_reset_mu_eq`
    #[builder(default = "T::recip((1.1).as_T())")]
    pub cold_reset_mu_eq_inv: T,

    ///inverse of `cold_reset_mu_in`
    #[builder(default = "T::recip((1.1).as_T())")]
    pub cold_reset_mu_in_inv: T,

    ///primal proximal parameter at setup
    #[builder(default = "(1e-6).as_T()")]
    pub default_rho: T,

    ///equality penalty at setup
    #[builder(default = "(1e3).as_T()")]
    pub default_mu_eq: T,

    ///inequality penalty at setup
    #[builder(default = "(1e1).as_T()")]
    pub default_mu_in: T,

    ///proximal parameter installed by the dual-feasibility refactor rule
    #[builder(default = "(1e-7).as_T()")]
    pub refactor_rho_threshold: T,

    ///dual residual above which the refactor rule fires
    #[builder(default = "(1e-2).as_T()")]
    pub refactor_dual_feasibility_threshold: T,

    ///maximum Ruiz balancing sweeps
    #[builder(default = "10")]
    pub preconditioner_max_iter: usize,

    ///Ruiz sweep termination accuracy on row/column norms
    #[builder(default = "(1e-3).as_T()")]
    pub preconditioner_accuracy: T,

    ///initial guess strategy
    #[builder(default = "InitialGuess::EqualityConstrainedInitialGuess")]
    pub initial_guess: InitialGuess,

    ///equilibration strategy
    #[builder(default = "PreconditionerStatus::Execute")]
    pub preconditioner_status: PreconditionerStatus,

    ///declare infeasibility on persistent bad steps at saturated penalties.
    ///When disabled such solves terminate with `MaxIterReached`.
    #[builder(default = "false")]
    pub infeasibility_check: bool,

    ///verbose progress printing
    #[builder(default = "false")]
    pub verbose: bool,
}

impl<T> Default for Settings<T>
where
    T: FloatT,
{
    fn default() -> Settings<T> {
        SettingsBuilder::<T>::default().build().unwrap()
    }
}

// pre build checker (for auto-validation when using the builder)

/// Automatic pre-build settings validation
impl<T> SettingsBuilder<T>
where
    T: FloatT,
{
    pub fn validate(&self) -> Result<(), String> {
        if let Some(eps_abs) = self.eps_abs {
            if eps_abs <= T::zero() {
                return Err("eps_abs must be strictly positive".to_string());
            }
        }
        if let Some(factor) = self.mu_update_factor {
            if factor <= T::one() {
                return Err("mu_update_factor must exceed 1".to_string());
            }
        }
        if let Some(rho) = self.default_rho {
            if rho <= T::zero() {
                return Err("default_rho must be strictly positive".to_string());
            }
        }
        Ok(())
    }
}

#[test]
fn test_settings_validate() {
    // all standard settings
    SettingsBuilder::<f64>::default().build().unwrap();

    // fail on shrinking penalty factor
    assert!(SettingsBuilder::<f64>::default()
        .mu_update_factor(0.5)
        .build()
        .is_err());

    // fail on non-positive tolerance
    assert!(SettingsBuilder::<f64>::default()
        .eps_abs(0.0)
        .build()
        .is_err());
}
