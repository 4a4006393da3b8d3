#![allow(non_snake_case)]
use proxal::{algebra::*, solver::*};

mod common;

#[test]
fn test_qp_unconstrained() {
    // H = I, g = (-1, -2): minimizer (1, 2)
    let H = Matrix::identity(2);
    let g = [-1.0, -2.0];
    let A = Matrix::zeros((0, 2));
    let b: [f64; 0] = [];
    let C = Matrix::zeros((0, 2));
    let u: [f64; 0] = [];
    let l: [f64; 0] = [];

    let mut solver =
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();
    solver.solve();

    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    assert!((solver.results.x[0] - 1.0).abs() <= 1e-6);
    assert!((solver.results.x[1] - 2.0).abs() <= 1e-6);
    assert!((solver.results.info.obj_val - (-2.5)).abs() <= 1e-6);
    assert!(solver.results.y.is_empty());
    assert!(solver.results.z.is_empty());
    assert!(solver.results.info.n_ext <= 3);
}

#[test]
fn test_qp_equality_constrained() {
    // H = I, g = 0, x1 + x2 = 1: minimizer (0.5, 0.5)
    let H = Matrix::identity(2);
    let g = [0.0, 0.0];
    let A = Matrix::new_from_slice((1, 2), &[1.0, 1.0]);
    let b = [1.0];
    let C = Matrix::zeros((0, 2));
    let u: [f64; 0] = [];
    let l: [f64; 0] = [];

    let settings = SettingsBuilder::<f64>::default()
        .initial_guess(InitialGuess::EqualityConstrainedInitialGuess)
        .build()
        .unwrap();

    let mut solver = QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, settings).unwrap();
    solver.solve();

    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    assert!((solver.results.x[0] - 0.5).abs() <= 1e-6);
    assert!((solver.results.x[1] - 0.5).abs() <= 1e-6);
    assert!((solver.results.y[0] - (-0.5)).abs() <= 1e-5);
    assert!(solver.results.info.n_ext <= 5);
}

#[test]
fn test_qp_box_constrained() {
    // unconstrained optimum (3, -2) lies outside the unit box
    let H = Matrix::identity(2);
    let g = [-3.0, 2.0];
    let A = Matrix::zeros((0, 2));
    let b: [f64; 0] = [];
    let C = Matrix::identity(2);
    let u = [1.0, 1.0];
    let l = [-1.0, -1.0];

    let mut solver =
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();
    solver.solve();

    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    assert!((solver.results.x[0] - 1.0).abs() <= 1e-6);
    assert!((solver.results.x[1] - (-1.0)).abs() <= 1e-6);
    // upper bound active on the first row, lower on the second
    assert!(solver.results.z[0] > 0.0);
    assert!(solver.results.z[1] < 0.0);
}

#[test]
fn test_qp_one_sided() {
    // scalar problem with an upper bound only, through the one-shot
    // entry point
    let H = Matrix::identity(1);
    let g = [-5.0];
    let A = Matrix::zeros((0, 1));
    let b: [f64; 0] = [];
    let C = Matrix::identity(1);
    let u = [1.0];
    let l = [f64::NEG_INFINITY];

    let results = solve_qp(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();

    assert_eq!(results.info.status, SolverStatus::Solved);
    assert!((results.x[0] - 1.0).abs() <= 1e-6);
    assert!(results.z[0] > 0.0);
}

#[test]
fn test_invalid_inputs() {
    let H = Matrix::identity(2);
    let g = [0.0, 0.0];
    let A = Matrix::zeros((0, 2));
    let b: [f64; 0] = [];
    let C = Matrix::identity(2);

    // reversed bounds
    let u = [-1.0, 1.0];
    let l = [1.0, -1.0];
    assert!(matches!(
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()),
        Err(SolverError::BoundOrder(0))
    ));

    // mismatched dimensions
    let g_bad = [0.0; 3];
    let u = [1.0, 1.0];
    let l = [-1.0, -1.0];
    assert!(matches!(
        QpSolver::setup(&H, &g_bad, &A, &b, &C, &u, &l, Settings::default()),
        Err(SolverError::IncompatibleDimension)
    ));
}

#[test]
fn test_objective_value_matches_iterate() {
    let qp = common::random_feasible_qp(6, 2, 4, 99);
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
    let x = &solver.results.x;
    let expected = 0.5 * qp.H.quad_form(x) + qp.g.dot(x);
    assert!((solver.results.info.obj_val - expected).abs() <= 1e-9 * (1.0 + expected.abs()));
}
