//! Proximal operators
//!
//! A proximal operator `prox(mu, x)` solves
//! `argmin_z  mu·R(z) + ½||z - x||²` for a regularizer `R`. The iterative
//! algorithms call it once per iteration with `mu` equal to their current
//! step size.

use num_complex::Complex32;

/// Parameterized operator applied after each gradient step
///
/// `apply` takes `&mut self` because an operator may advance private state
/// (e.g. the random shift of cycle spinning) on every call. One instance is
/// therefore never shared between concurrent callers.
pub trait ProximalOperator: Send {
    /// Number of elements of the buffers this operator accepts
    fn size(&self) -> usize;

    /// out = prox(mu, input)
    fn apply(&mut self, mu: f32, out: &mut [Complex32], input: &[Complex32]) {
        out.copy_from_slice(input);
        self.apply_inplace(mu, out);
    }

    /// buf = prox(mu, buf)
    fn apply_inplace(&mut self, mu: f32, buf: &mut [Complex32]);
}

/// Complex soft-thresholding: shrink the magnitude by `threshold`, keep the phase
///
/// shrink(z, t) = z · max(|z| - t, 0) / |z|
#[inline]
pub fn soft_thresh(z: Complex32, threshold: f32) -> Complex32 {
    let mag = z.norm();
    if mag > threshold {
        z * ((mag - threshold) / mag)
    } else {
        Complex32::new(0.0, 0.0)
    }
}

/// Proximal map of `lambda ||x||₁` in the identity basis
pub struct L1Thresh {
    size: usize,
    lambda: f32,
}

impl L1Thresh {
    pub fn new(size: usize, lambda: f32) -> Self {
        Self { size, lambda }
    }
}

impl ProximalOperator for L1Thresh {
    fn size(&self) -> usize {
        self.size
    }

    fn apply_inplace(&mut self, mu: f32, buf: &mut [Complex32]) {
        let threshold = self.lambda * mu;
        if threshold == 0.0 {
            return;
        }
        for v in buf.iter_mut() {
            *v = soft_thresh(*v, threshold);
        }
    }
}
