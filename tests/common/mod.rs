#![allow(non_snake_case)]
#![allow(dead_code)]
//! Shared test utilities: a deterministic Lehmer generator and random
//! QP construction helpers.

use proxal::algebra::*;

/// 128-bit Lehmer multiplicative generator, deterministic across runs.
pub struct Lehmer64 {
    state: u128,
}

impl Lehmer64 {
    const MULT: u128 = 0xda942042e4dd58b5;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: seed as u128 + 1,
        };
        rng.next_u64();
        rng.next_u64();
        rng
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(Self::MULT);
        (self.state >> 64) as u64
    }

    /// uniform sample in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        let a = self.next_u64() >> 11;
        a as f64 / (1u64 << 53) as f64
    }

    /// standard normal sample via Box-Muller
    pub fn normal(&mut self) -> f64 {
        let pi2 = std::f64::consts::PI * 2.0;
        let u1 = self.uniform().max(1e-300);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (pi2 * u2).cos()
    }

    pub fn vector(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.normal()).collect()
    }

    pub fn matrix(&mut self, m: usize, n: usize) -> Matrix<f64> {
        let mut out = Matrix::zeros((m, n));
        for j in 0..n {
            for i in 0..m {
                out[(i, j)] = self.normal();
            }
        }
        out
    }

    /// strictly convex symmetric matrix `BᵀB/n + I`
    pub fn positive_definite(&mut self, n: usize) -> Matrix<f64> {
        let B = self.matrix(n, n);
        let mut H = Matrix::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let mut v = 0.0;
                for k in 0..n {
                    v += B[(k, i)] * B[(k, j)];
                }
                H[(i, j)] = v / n as f64;
            }
            H[(i, i)] += 1.0;
        }
        H
    }
}

/// A random strictly convex QP with a feasible point by construction.
pub struct RandomQp {
    pub H: Matrix<f64>,
    pub g: Vec<f64>,
    pub A: Matrix<f64>,
    pub b: Vec<f64>,
    pub C: Matrix<f64>,
    pub u: Vec<f64>,
    pub l: Vec<f64>,
}

pub fn random_feasible_qp(dim: usize, n_eq: usize, n_in: usize, seed: u64) -> RandomQp {
    let mut rng = Lehmer64::new(seed);

    let H = rng.positive_definite(dim);
    let g = rng.vector(dim);
    let A = rng.matrix(n_eq, dim);
    let C = rng.matrix(n_in, dim);

    // x0 is feasible: b interpolates it exactly, the box holds a margin
    let x0 = rng.vector(dim);
    let mut b = vec![0.0; n_eq];
    A.gemv(&mut b, &x0, 1.0, 0.0);

    let mut cx = vec![0.0; n_in];
    C.gemv(&mut cx, &x0, 1.0, 0.0);
    let u: Vec<f64> = cx.iter().map(|&v| v + 0.1 + rng.uniform()).collect();
    let l: Vec<f64> = cx.iter().map(|&v| v - 0.1 - rng.uniform()).collect();

    RandomQp {
        H,
        g,
        A,
        b,
        C,
        u,
        l,
    }
}

/// Infinity norm of the primal residual of `(x)` in original space.
pub fn primal_residual_norm(qp: &RandomQp, x: &[f64]) -> f64 {
    let mut r_eq = vec![0.0; qp.b.len()];
    qp.A.gemv(&mut r_eq, x, 1.0, 0.0);
    for (r, &b) in r_eq.iter_mut().zip(&qp.b) {
        *r -= b;
    }

    let mut cx = vec![0.0; qp.u.len()];
    qp.C.gemv(&mut cx, x, 1.0, 0.0);
    let mut out = r_eq.norm_inf();
    for i in 0..cx.len() {
        out = out.max((cx[i] - qp.u[i]).max(0.0));
        out = out.max((qp.l[i] - cx[i]).max(0.0));
    }
    out
}

/// Infinity norm of the dual (stationarity) residual in original space.
pub fn dual_residual_norm(qp: &RandomQp, x: &[f64], y: &[f64], z: &[f64]) -> f64 {
    let mut r = qp.g.clone();
    qp.H.gemv(&mut r, x, 1.0, 1.0);
    qp.A.t().gemv(&mut r, y, 1.0, 1.0);
    qp.C.t().gemv(&mut r, z, 1.0, 1.0);
    r.norm_inf()
}
