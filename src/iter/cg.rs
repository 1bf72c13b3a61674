//! Conjugate Gradient solver
//!
//! Solves (AᴴA + λI) x = Aᴴb for the Hermitian positive semi-definite
//! normal operator AᴴA. Complex vectors are handled through their
//! interleaved real views: for a Hermitian operator every inner product the
//! recurrence needs is real.

use num_complex::Complex32;
use tracing::debug;

use crate::utils::simd_ops::{
    as_real, as_real_mut, axpy_f32, dot_product_f32, norm_squared_f32, sub_f32, xpby_f32,
};

/// Relative residual at which the recurrence is considered exhausted
const RESIDUAL_COLLAPSE: f32 = 1e-6;

/// Conjugate gradient parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgConfig {
    pub max_iterations: usize,
    /// Tikhonov weight added to the normal operator
    pub l2_lambda: f32,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self { max_iterations: 50, l2_lambda: 0.0 }
    }
}

/// Conjugate gradient solver
///
/// # Arguments
/// * `conf` - Iteration count and Tikhonov weight
/// * `normal` - Closure that computes dst = AᴴA src
/// * `x` - Initial guess, overwritten with the solution
/// * `rhs` - Right-hand side Aᴴb
/// * `progress` - Called with `(iteration, x)` after every update
///
/// Stops after `max_iterations` updates, or earlier once the residual has
/// collapsed to rounding level.
pub fn conjgrad<N, F>(
    conf: &CgConfig,
    normal: N,
    x: &mut [Complex32],
    rhs: &[Complex32],
    mut progress: F,
)
where
    N: Fn(&mut [Complex32], &[Complex32]),
    F: FnMut(usize, &[Complex32]),
{
    let n = x.len();
    let lambda = conf.l2_lambda;

    // (AᴴA + λI) v
    let apply = |dst: &mut [Complex32], v: &[Complex32]| {
        normal(dst, v);
        if lambda != 0.0 {
            axpy_f32(as_real_mut(dst), lambda, as_real(v));
        }
    };

    let mut ap = vec![Complex32::new(0.0, 0.0); n];

    // r = b - A*x
    apply(&mut ap, x);
    let mut r = vec![Complex32::new(0.0, 0.0); n];
    sub_f32(as_real_mut(&mut r), as_real(rhs), as_real(&ap));

    let mut p = r.clone();

    let mut rsold = norm_squared_f32(as_real(&r));
    let rs_stop = rsold * RESIDUAL_COLLAPSE * RESIDUAL_COLLAPSE;

    if rsold == 0.0 {
        return;
    }

    for iter in 0..conf.max_iterations {
        apply(&mut ap, &p);

        let pap = dot_product_f32(as_real(&p), as_real(&ap));

        if pap.abs() < 1e-20 {
            break;
        }

        let alpha = rsold / pap;

        // x = x + alpha * p
        axpy_f32(as_real_mut(x), alpha, as_real(&p));

        // r = r - alpha * A*p
        axpy_f32(as_real_mut(&mut r), -alpha, as_real(&ap));

        let rsnew = norm_squared_f32(as_real(&r));

        debug!("CG iteration {}: residual {:.4e}", iter, rsnew.sqrt());
        progress(iter, x);

        if rsnew <= rs_stop {
            break;
        }

        let beta = rsnew / rsold;

        // p = r + beta * p
        xpby_f32(as_real_mut(&mut p), as_real(&r), beta);

        rsold = rsnew;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linops::testing::random_vector;
    use crate::linops::{LinearOperator, Identity};
    use crate::shape::Shape;

    fn c(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    /// Small dense operator y = M x with M stored column-major (rows x cols)
    struct Dense {
        rows: usize,
        cols: usize,
        m: Vec<Complex32>,
        domain: Shape,
        codomain: Shape,
    }

    impl Dense {
        fn new(rows: usize, cols: usize, m: Vec<Complex32>) -> Self {
            Self { rows, cols, m, domain: Shape::new(&[cols]), codomain: Shape::new(&[rows]) }
        }
    }

    impl LinearOperator for Dense {
        fn domain(&self) -> &Shape {
            &self.domain
        }

        fn codomain(&self) -> &Shape {
            &self.codomain
        }

        fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
            for i in 0..self.rows {
                dst[i] = (0..self.cols).map(|j| self.m[i + j * self.rows] * src[j]).sum();
            }
        }

        fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
            for j in 0..self.cols {
                dst[j] = (0..self.rows).map(|i| self.m[i + j * self.rows].conj() * src[i]).sum();
            }
        }
    }

    fn well_conditioned(rows: usize, cols: usize) -> Dense {
        // Identity-dominated block with a small random perturbation
        let noise = random_vector(rows * cols, 42);
        let m = (0..rows * cols)
            .map(|k| {
                let (i, j) = (k % rows, k / rows);
                let base = if i == j { c(2.0 + i as f32 * 0.25, 0.0) } else { c(0.0, 0.0) };
                base + noise[k] * 0.2
            })
            .collect();
        Dense::new(rows, cols, m)
    }

    #[test]
    fn test_cg_identity() {
        // Solve Ix = b in one step
        let b = vec![c(1.0, -1.0), c(2.0, 0.5), c(3.0, 0.0)];
        let mut x = vec![c(0.0, 0.0); 3];
        let op = Identity::new(&Shape::new(&[3]));

        let conf = CgConfig { max_iterations: 1, l2_lambda: 0.0 };
        conjgrad(&conf, |d: &mut [Complex32], s: &[Complex32]| op.normal(d, s), &mut x, &b, |_, _| {});

        for (xi, bi) in x.iter().zip(b.iter()) {
            assert!((*xi - *bi).norm() < 1e-6, "x should equal b");
        }
    }

    #[test]
    fn test_cg_diagonal() {
        // Solve diag(2,3,4) * x = [2, 6, 12]
        // Solution: x = [1, 2, 3]
        let b = vec![c(2.0, 0.0), c(6.0, 0.0), c(12.0, 0.0)];
        let diag = [2.0f32, 3.0, 4.0];
        let mut x = vec![c(0.0, 0.0); 3];

        conjgrad(
            &CgConfig { max_iterations: 100, l2_lambda: 0.0 },
            |d: &mut [Complex32], s: &[Complex32]| {
                for ((di, si), w) in d.iter_mut().zip(s.iter()).zip(diag.iter()) {
                    *di = *si * *w;
                }
            },
            &mut x, &b, |_, _| {},
        );

        let expected = [1.0f32, 2.0, 3.0];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi.re - ei).abs() < 1e-4, "Expected {}, got {}", ei, xi);
        }
    }

    #[test]
    fn test_cg_tikhonov() {
        // (1 + λ) x = b with λ = 1 gives x = b / 2
        let b = vec![c(4.0, 2.0), c(-2.0, 8.0)];
        let mut x = vec![c(0.0, 0.0); 2];

        conjgrad(
            &CgConfig { max_iterations: 5, l2_lambda: 1.0 },
            |d: &mut [Complex32], s: &[Complex32]| d.copy_from_slice(s),
            &mut x, &b, |_, _| {},
        );

        assert!((x[0] - c(2.0, 1.0)).norm() < 1e-5);
        assert!((x[1] - c(-1.0, 4.0)).norm() < 1e-5);
    }

    #[test]
    fn test_cg_residual_non_increasing() {
        let op = well_conditioned(8, 6);
        let b = random_vector(8, 5);

        let mut rhs = vec![c(0.0, 0.0); 6];
        op.adjoint(&mut rhs, &b);

        let residual = |x: &[Complex32]| -> f32 {
            let mut ax = vec![c(0.0, 0.0); 8];
            op.forward(&mut ax, x);
            ax.iter().zip(b.iter()).map(|(a, bi)| (*a - *bi).norm_sqr()).sum::<f32>().sqrt()
        };

        let mut x = vec![c(0.0, 0.0); 6];
        let mut history = vec![residual(&x)];
        conjgrad(
            &CgConfig { max_iterations: 6, l2_lambda: 0.0 },
            |d: &mut [Complex32], s: &[Complex32]| op.normal(d, s),
            &mut x, &rhs,
            |_, xi| history.push(residual(xi)),
        );

        assert!(history.len() > 2);
        for w in history.windows(2) {
            assert!(w[1] <= w[0] * (1.0 + 1e-4) + 1e-6, "residual increased: {:?}", history);
        }

        // Least-squares optimum reached: Aᴴ(Ax - b) ≈ 0
        let mut ax = vec![c(0.0, 0.0); 8];
        op.forward(&mut ax, &x);
        let r: Vec<Complex32> = ax.iter().zip(b.iter()).map(|(a, bi)| *a - *bi).collect();
        let mut g = vec![c(0.0, 0.0); 6];
        op.adjoint(&mut g, &r);
        let gnorm: f32 = g.iter().map(|v| v.norm_sqr()).sum::<f32>().sqrt();
        assert!(gnorm < 1e-3, "gradient norm {}", gnorm);
    }

    #[test]
    fn test_cg_zero_rhs_keeps_zero() {
        let mut x = vec![c(0.0, 0.0); 4];
        let b = vec![c(0.0, 0.0); 4];
        let mut calls = 0;
        conjgrad(&CgConfig::default(), |d: &mut [Complex32], s: &[Complex32]| d.copy_from_slice(s), &mut x, &b, |_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(x.iter().all(|v| *v == c(0.0, 0.0)));
    }
}
