//! Sampling pattern of measured k-space

use num_complex::Complex32;
use tracing::info;

use crate::error::Result;
use crate::shape::{for_each_position, offset, Shape, COIL_FLAG};

/// Estimate the sampling pattern from k-space
///
/// A position is sampled (1) when any coil holds a nonzero value there,
/// otherwise 0. The result has the k-space shape without the coil dimension.
pub fn estimate_pattern(ksp_shape: &Shape, kspace: &[Complex32]) -> Result<(Shape, Vec<Complex32>)> {
    ksp_shape.check_buffer("kspace", kspace.len())?;

    let pat_shape = ksp_shape.select(!COIL_FLAG);
    let mut pattern = vec![Complex32::new(0.0, 0.0); pat_shape.size()];

    let ksp_strides = ksp_shape.strides();
    let pat_strides = pat_shape.broadcast_strides();
    for_each_position(ksp_shape.dims(), |pos| {
        if kspace[offset(pos, &ksp_strides)] != Complex32::new(0.0, 0.0) {
            pattern[offset(pos, &pat_strides)] = Complex32::new(1.0, 0.0);
        }
    });

    Ok((pat_shape, pattern))
}

/// Log size, sample count and acceleration of a sampling pattern
///
/// The sample count is the squared norm of the pattern, so a binary pattern
/// counts its ones. Returns (size, samples).
pub fn sampling_stats(pat_shape: &Shape, pattern: &[Complex32]) -> (usize, usize) {
    let total = pat_shape.size();
    let samples = pattern.iter().map(|v| v.norm_sqr() as f64).sum::<f64>().round() as usize;
    info!(
        "Size: {} Samples: {} Acc: {:.2}",
        total, samples, total as f32 / samples as f32
    );
    (total, samples)
}
