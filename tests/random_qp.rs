#![allow(non_snake_case)]
use proxal::solver::*;

mod common;

// random feasible strictly-convex programs across a spread of shapes
// must reach the KKT tolerance within the outer iteration cap
#[test]
fn test_random_feasible_qps() {
    let shapes = [
        (2, 0, 2),
        (3, 1, 0),
        (5, 2, 4),
        (8, 3, 6),
        (10, 0, 10),
        (15, 5, 10),
        (20, 8, 14),
        (30, 10, 20),
    ];

    for (case, &(dim, n_eq, n_in)) in shapes.iter().enumerate() {
        let qp = common::random_feasible_qp(dim, n_eq, n_in, 1000 + case as u64);

        let settings = SettingsBuilder::<f64>::default()
            .max_iter(200)
            .build()
            .unwrap();

        let mut solver = QpSolver::setup(
            &qp.H,
            &qp.g,
            &qp.A,
            &qp.b,
            &qp.C,
            &qp.u,
            &qp.l,
            settings,
        )
        .unwrap();
        solver.solve();

        assert_eq!(
            solver.results.info.status,
            SolverStatus::Solved,
            "case {} ({},{},{}) not solved",
            case,
            dim,
            n_eq,
            n_in
        );

        let r_p = common::primal_residual_norm(&qp, &solver.results.x);
        let r_d = common::dual_residual_norm(
            &qp,
            &solver.results.x,
            &solver.results.y,
            &solver.results.z,
        );
        assert!(r_p <= 1e-6, "case {} primal residual {}", case, r_p);
        assert!(r_d <= 1e-6, "case {} dual residual {}", case, r_d);
    }
}

// the dual sign convention must hold at the solution: positive
// multipliers on active upper bounds, negative on active lower bounds
#[test]
fn test_dual_sign_convention() {
    for seed in [5u64, 6, 7] {
        let qp = common::random_feasible_qp(6, 0, 8, seed);
        let mut solver = QpSolver::setup(
            &qp.H,
            &qp.g,
            &qp.A,
            &qp.b,
            &qp.C,
            &qp.u,
            &qp.l,
            Settings::default(),
        )
        .unwrap();
        solver.solve();
        assert_eq!(solver.results.info.status, SolverStatus::Solved);

        let mut cx = vec![0.0; qp.u.len()];
        qp.C.gemv(&mut cx, &solver.results.x, 1.0, 0.0);
        for i in 0..qp.u.len() {
            let z = solver.results.z[i];
            if z > 1e-7 {
                assert!((cx[i] - qp.u[i]).abs() <= 1e-5);
            } else if z < -1e-7 {
                assert!((cx[i] - qp.l[i]).abs() <= 1e-5);
            }
        }
    }
}

// the penalty sequence is monotone between cold restarts: with a
// feasible problem at default settings no cold restart occurs and the
// final penalties never shrink below their initial values
#[test]
fn test_mu_monotone_on_feasible_problem() {
    let qp = common::random_feasible_qp(12, 4, 8, 77);
    let mut solver = QpSolver::setup(
        &qp.H,
        &qp.g,
        &qp.A,
        &qp.b,
        &qp.C,
        &qp.u,
        &qp.l,
        Settings::default(),
    )
    .unwrap();
    solver.solve();
    assert_eq!(solver.results.info.status, SolverStatus::Solved);

    assert!(solver.results.info.mu_in >= solver.settings.default_mu_in);
    assert!(solver.results.info.mu_eq >= solver.settings.default_mu_eq);
    assert!(solver.results.info.mu_in_inv <= 1.0 / solver.settings.default_mu_in + 1e-12);
}
