#![allow(non_snake_case)]
use proxal::{algebra::*, solver::*};

fn box_qp(g: [f64; 2]) -> (Matrix<f64>, [f64; 2], Matrix<f64>, [f64; 0], Matrix<f64>, [f64; 2], [f64; 2])
{
    (
        Matrix::identity(2),
        g,
        Matrix::zeros((0, 2)),
        [],
        Matrix::identity(2),
        [1.0, 1.0],
        [-1.0, -1.0],
    )
}

#[test]
fn test_warm_start_resumes_faster() {
    // solve with the optimum at (1, -1), then move it to (1, 1)
    let (H, g, A, b, C, u, l) = box_qp([-3.0, 2.0]);
    let mut solver =
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();
    solver.solve();
    assert_eq!(solver.results.info.status, SolverStatus::Solved);

    let x_prev = solver.results.x.clone();
    let y_prev = solver.results.y.clone();
    let z_prev = solver.results.z.clone();

    // cold reference solve of the shifted problem
    let g_new = [-3.0, -2.0];
    let (H2, _, A2, b2, C2, u2, l2) = box_qp(g_new);
    let mut cold = QpSolver::setup(&H2, &g_new, &A2, &b2, &C2, &u2, &l2, Settings::default())
        .unwrap();
    cold.solve();
    assert_eq!(cold.results.info.status, SolverStatus::Solved);
    let cold_iters = cold.results.info.n_ext;

    // warm-started resume on the updated solver
    solver.update(None, Some(&g_new), None, None, None, None, None).unwrap();
    solver
        .warm_start(Some(&x_prev), Some(&y_prev), Some(&z_prev))
        .unwrap();
    solver.solve();

    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    assert!((solver.results.x[0] - 1.0).abs() <= 1e-6);
    assert!((solver.results.x[1] - 1.0).abs() <= 1e-6);
    assert!(solver.results.info.n_ext <= cold_iters);
}

#[test]
fn test_warm_start_with_previous_result() {
    let (H, g, A, b, C, u, l) = box_qp([-3.0, 2.0]);
    let mut solver =
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();
    solver.solve();
    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    let x_opt = solver.results.x.clone();

    // re-solve the same problem from the kept iterate
    solver.settings.initial_guess = InitialGuess::WarmStartWithPreviousResult;
    solver.update(None, None, None, None, None, None, None).unwrap();
    assert!((solver.results.x[0] - x_opt[0]).abs() <= 1e-12);
    solver.solve();

    assert_eq!(solver.results.info.status, SolverStatus::Solved);
    assert!(solver.results.info.n_ext <= 2);
    assert!((solver.results.x[0] - 1.0).abs() <= 1e-6);
    assert!((solver.results.x[1] - (-1.0)).abs() <= 1e-6);
}

#[test]
fn test_warm_start_dimension_checks() {
    let (H, g, A, b, C, u, l) = box_qp([-3.0, 2.0]);
    let mut solver =
        QpSolver::setup(&H, &g, &A, &b, &C, &u, &l, Settings::default()).unwrap();

    assert!(matches!(
        solver.warm_start(Some(&[1.0, 2.0, 3.0]), None, None),
        Err(SolverError::IncompatibleDimension)
    ));
    assert!(solver.warm_start(Some(&[0.5, 0.5]), None, Some(&[0.0, 0.0])).is_ok());
    assert_eq!(solver.settings.initial_guess, InitialGuess::WarmStart);
}
