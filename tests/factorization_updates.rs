#![allow(non_snake_case)]
use proxal::{algebra::*, ldl::*, solver::*};

mod common;

fn norm_inf_diff(a: &Matrix<f64>, b: &Matrix<f64>) -> f64 {
    assert_eq!(a.nrows(), b.nrows());
    a.data.norm_inf_diff(&b.data)
}

// assemble the reduced KKT matrix the factorization is expected to hold
fn expected_kkt(solver: &QpSolver<f64>) -> Matrix<f64> {
    let (dim, n_eq, n_in) = (solver.model.dim, solver.model.n_eq, solver.model.n_in);
    let n_c = solver.work.n_c;
    let n = dim + n_eq + n_c;
    let mut M = Matrix::zeros((n, n));

    for i in 0..dim {
        for j in 0..dim {
            M[(i, j)] = solver.work.H_scaled[(i, j)];
        }
        M[(i, i)] += solver.results.info.rho;
    }
    for i in 0..n_eq {
        for j in 0..dim {
            M[(dim + i, j)] = solver.work.A_scaled[(i, j)];
            M[(j, dim + i)] = solver.work.A_scaled[(i, j)];
        }
        M[(dim + i, dim + i)] = -solver.results.info.mu_eq_inv;
    }
    for i in 0..n_in {
        let pos = solver.work.current_bijection_map[i];
        if pos < n_c {
            for j in 0..dim {
                M[(dim + n_eq + pos, j)] = solver.work.C_scaled[(i, j)];
                M[(j, dim + n_eq + pos)] = solver.work.C_scaled[(i, j)];
            }
            M[(dim + n_eq + pos, dim + n_eq + pos)] = -solver.results.info.mu_in_inv;
        }
    }
    M
}

#[test]
fn test_factorization_matches_kkt_after_setup() {
    let qp = common::random_feasible_qp(5, 2, 3, 7);
    let solver = QpSolver::setup(
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

    assert_eq!(solver.work.n_c, 0);
    let M = expected_kkt(&solver);
    assert!(norm_inf_diff(&solver.work.ldl.reconstructed_matrix(), &M) < 1e-6);
}

#[test]
fn test_factorization_matches_kkt_after_solve() {
    // box-constrained solve ends with a nonempty active set after a
    // history of activations, deactivations and mu updates
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

    let M = expected_kkt(&solver);
    assert!(norm_inf_diff(&solver.work.ldl.reconstructed_matrix(), &M) < 1e-6);

    // the bijection remains a permutation with the active block leading
    let mut seen = vec![false; 2];
    for &p in &solver.work.current_bijection_map {
        assert!(!seen[p]);
        seen[p] = true;
    }
}

#[test]
fn test_insert_then_delete_roundtrip() {
    let mut rng = common::Lehmer64::new(3);
    let n = 6;

    // a quasidefinite test matrix: SPD head block, negative tail diagonal
    let mut M = rng.positive_definite(n);
    for i in 4..n {
        for j in 0..n {
            M[(i, j)] = if i == j { -2.0 } else { 0.1 * M[(i, j)] };
            M[(j, i)] = M[(i, j)];
        }
    }

    let mut ldl = DenseLdl::new(n + 1);
    ldl.factorize(&M).unwrap();
    let before = ldl.reconstructed_matrix();

    for k in [0, 2, n] {
        let mut w = rng.vector(n + 1);
        w[k] = -3.0;
        ldl.insert_at(k, &w);
        ldl.delete_at(k);
        assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &before) < 1e-10);
    }
}

#[test]
fn test_mu_update_is_invertible() {
    // the mu update is a sequence of unit rank-one updates on the
    // penalty diagonals; applying the opposite differences restores
    // the factorization
    let mut rng = common::Lehmer64::new(11);
    let (dim, n_eq) = (4, 2);
    let n = dim + n_eq;

    let M = rng.positive_definite(dim);
    let mut kkt = Matrix::zeros((n, n));
    for i in 0..dim {
        for j in 0..dim {
            kkt[(i, j)] = M[(i, j)];
        }
    }
    let a_rows = rng.matrix(n_eq, dim);
    for i in 0..n_eq {
        for j in 0..dim {
            kkt[(dim + i, j)] = a_rows[(i, j)];
            kkt[(j, dim + i)] = a_rows[(i, j)];
        }
        kkt[(dim + i, dim + i)] = -1e-3;
    }

    let mut ldl = DenseLdl::new(n);
    ldl.factorize(&kkt).unwrap();
    let before = ldl.reconstructed_matrix();

    let diff = 1e-3 - 1e-4; // mu_eq 1e3 -> 1e4
    let mut e = vec![0.0; n];
    for i in 0..n_eq {
        e[dim + i] = 1.0;
        ldl.rank_one_update(&e, diff);
        e[dim + i] = 0.0;
    }
    for i in 0..n_eq {
        e[dim + i] = 1.0;
        ldl.rank_one_update(&e, -diff);
        e[dim + i] = 0.0;
    }

    assert!(norm_inf_diff(&ldl.reconstructed_matrix(), &before) < 1e-10);
}

#[test]
fn test_proximal_parameter_update() {
    let qp = common::random_feasible_qp(4, 1, 2, 21);
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

    solver
        .update_proximal_parameters(Some(1e-5), Some(1e4), Some(1e2))
        .unwrap();

    assert_eq!(solver.results.info.rho, 1e-5);
    assert_eq!(solver.results.info.mu_eq_inv, 1e-4);
    assert_eq!(solver.results.info.mu_in_inv, 1e-2);

    // the factorization tracks the new parameters
    let M = expected_kkt(&solver);
    assert!(norm_inf_diff(&solver.work.ldl.reconstructed_matrix(), &M) < 1e-6);

    solver.solve();
    assert_eq!(solver.results.info.status, SolverStatus::Solved);
}
