//! Fast Iterative Shrinkage/Thresholding Algorithm
//!
//! Beck & Teboulle, "A Fast Iterative Shrinkage-Thresholding Algorithm for
//! Linear Inverse Problems", SIAM J. Imaging Sciences 2009.

use num_complex::Complex32;
use tracing::debug;

use super::{gradient, HogwildSchedule};
use crate::prox::ProximalOperator;
use crate::utils::simd_ops::{as_real, as_real_mut, axpy_f32};

/// FISTA parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FistaConfig {
    pub max_iterations: usize,
    pub step: f32,
    pub hogwild: bool,
}

impl Default for FistaConfig {
    fn default() -> Self {
        Self { max_iterations: 50, step: 1.0, hogwild: false }
    }
}

/// FISTA
///
/// Keeps the proximal iterate in `x` and an extrapolated point `y`:
///
/// x_k = prox(τ, y - τ ∇f(y))
/// t_{k+1} = (1 + sqrt(1 + 4 t_k²)) / 2
/// y = x_k + (t_k - 1) / t_{k+1} · (x_k - x_{k-1})
pub fn fista<N, F>(
    conf: &FistaConfig,
    normal: N,
    mut prox: Option<&mut dyn ProximalOperator>,
    x: &mut [Complex32],
    rhs: &[Complex32],
    mut progress: F,
)
where
    N: Fn(&mut [Complex32], &[Complex32]),
    F: FnMut(usize, &[Complex32]),
{
    let n = x.len();
    let mut grad = vec![Complex32::new(0.0, 0.0); n];
    let mut y = x.to_vec();
    let mut x_prev = x.to_vec();

    let mut hogwild = HogwildSchedule::new(conf.hogwild);
    let mut tau = conf.step;
    let mut t = 1.0f32;

    for iter in 0..conf.max_iterations {
        gradient(&normal, &mut grad, &y, rhs);

        // x = prox(τ, y - τ grad)
        x.copy_from_slice(&y);
        axpy_f32(as_real_mut(x), -tau, as_real(&grad));
        if let Some(p) = prox.as_mut() {
            p.apply_inplace(tau, x);
        }

        let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
        let momentum = (t - 1.0) / t_next;

        // y = x + momentum (x - x_prev)
        y.copy_from_slice(x);
        axpy_f32(as_real_mut(&mut y), momentum, as_real(x));
        axpy_f32(as_real_mut(&mut y), -momentum, as_real(&x_prev));
        x_prev.copy_from_slice(x);
        t = t_next;

        debug!("FISTA iteration {}: step {:.4e}, momentum {:.4}", iter, tau, momentum);
        progress(iter, x);

        tau = hogwild.next(tau);
    }
}
