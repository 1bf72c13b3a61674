//! Power iteration for the largest eigenvalue of a self-adjoint operator
//!
//! Used to calibrate the IST/FISTA step size: for the normal operator AᴴA
//! the returned value is the squared spectral norm of A.

use crate::utils::simd_ops::{norm_f32, scale_f32};

/// Default number of power iterations
pub const POWER_ITERATIONS: usize = 30;

/// Returned when the iterate collapses to zero (degenerate operator or input)
pub const EIGENVALUE_SENTINEL: f64 = 1.0;

/// Norms below this are treated as zero
const MIN_NORM: f32 = 1e-30;

/// Estimate the dominant eigenvalue of `op` by power iteration
///
/// # Arguments
/// * `iterations` - Number of operator applications
/// * `op` - Closure computing dst = M src on interleaved real buffers
/// * `u` - Start vector (interleaved real/imaginary pairs), overwritten with
///   the normalized dominant eigenvector estimate
///
/// # Returns
/// ||M u|| for the final unit vector u, or [`EIGENVALUE_SENTINEL`] if a norm
/// vanishes before an estimate exists.
pub fn power_iteration<F>(iterations: usize, mut op: F, u: &mut [f32]) -> f64
where
    F: FnMut(&mut [f32], &[f32]),
{
    let s = norm_f32(u);
    if !(s > MIN_NORM) || iterations == 0 {
        return EIGENVALUE_SENTINEL;
    }
    scale_f32(u, 1.0 / s);

    let mut tmp = vec![0.0f32; u.len()];
    let mut estimate = EIGENVALUE_SENTINEL;

    for _ in 0..iterations {
        op(&mut tmp, u);

        // Growth of a unit vector under M
        let s = norm_f32(&tmp);
        if !(s > MIN_NORM) || !s.is_finite() {
            return EIGENVALUE_SENTINEL;
        }

        u.copy_from_slice(&tmp);
        scale_f32(u, 1.0 / s);
        estimate = s as f64;
    }

    estimate
}
