//! Iterative soft-thresholding (IST)
//!
//! x ← prox(τ, x - τ (AᴴA x - Aᴴb))

use num_complex::Complex32;
use tracing::debug;

use super::{gradient, HogwildSchedule};
use crate::prox::ProximalOperator;
use crate::utils::simd_ops::{as_real, as_real_mut, axpy_f32};

/// IST parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IstConfig {
    pub max_iterations: usize,
    pub step: f32,
    pub hogwild: bool,
}

impl Default for IstConfig {
    fn default() -> Self {
        Self { max_iterations: 50, step: 1.0, hogwild: false }
    }
}

/// Iterative soft-thresholding
///
/// Without a proximal operator this is plain gradient descent on
/// ½||Ax - b||².
pub fn ist<N, F>(
    conf: &IstConfig,
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
    let mut grad = vec![Complex32::new(0.0, 0.0); x.len()];
    let mut hogwild = HogwildSchedule::new(conf.hogwild);
    let mut tau = conf.step;

    for iter in 0..conf.max_iterations {
        gradient(&normal, &mut grad, x, rhs);
        axpy_f32(as_real_mut(x), -tau, as_real(&grad));

        if let Some(p) = prox.as_mut() {
            p.apply_inplace(tau, x);
        }

        debug!("IST iteration {}: step {:.4e}", iter, tau);
        progress(iter, x);

        tau = hogwild.next(tau);
    }
}
