//! Verbose progress reporting.  Nothing here is called unless the
//! `verbose` setting is enabled.

use crate::algebra::*;

use super::{Model, Results, Settings};

pub(crate) fn print_banner<T: FloatT>(settings: &Settings<T>, model: &Model<T>) {
    if !settings.verbose {
        return;
    }
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    println!("-------------------------------------------------------------");
    println!("            Proxal v{} - dense proximal AL QP solver", VERSION);
    println!("-------------------------------------------------------------");
    println!("problem:");
    println!("  variables     = {}", model.dim);
    println!("  equalities    = {}", model.n_eq);
    println!("  inequalities  = {}", model.n_in);
    println!();
}

pub(crate) fn print_iteration<T: FloatT>(
    iter: usize,
    primal_feasibility_lhs: T,
    dual_feasibility_lhs: T,
    bcl_eta_ext: T,
    bcl_eta_in: T,
    results: &Results<T>,
) {
    println!(
        "---------------it : {} primal residual : {:e} dual residual : {:e}",
        iter, primal_feasibility_lhs, dual_feasibility_lhs
    );
    println!(
        "bcl_eta_ext : {:e} bcl_eta_in : {:e} rho : {:e} bcl_mu_eq : {:e} bcl_mu_in : {:e}",
        bcl_eta_ext, bcl_eta_in, results.info.rho, results.info.mu_eq, results.info.mu_in
    );
}

pub(crate) fn print_footer<T: FloatT>(settings: &Settings<T>, results: &Results<T>) {
    if !settings.verbose {
        return;
    }
    println!("-------------------------------------------------------------");
    println!("status     = {}", results.info.status);
    println!("iterations = {} (outer), {} (inner)", results.info.n_ext, results.info.n_tot);
    println!("mu updates = {}", results.info.n_mu_updates);
    println!("refactors  = {}", results.info.n_refactor);
    println!("objective  = {:e}", results.info.obj_val);
    println!("solve time = {:.3e} s", results.info.run_time);
    println!("-------------------------------------------------------------");
}
