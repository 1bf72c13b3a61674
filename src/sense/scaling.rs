//! Data scale estimate
//!
//! The reconstruction divides k-space by a scale taken from the
//! root-sum-of-squares image of the adjoint, so that the regularization
//! weight means the same thing for differently scaled scans.

use num_complex::Complex32;
use tracing::info;

use crate::error::Result;
use crate::shape::{for_each_position, offset, Shape, COIL_FLAG};

/// Root-sum-of-squares over the coil dimension
pub fn rss(coilim_shape: &Shape, coilim: &[Complex32]) -> Result<Vec<f32>> {
    coilim_shape.check_buffer("coil images", coilim.len())?;

    let img_shape = coilim_shape.select(!COIL_FLAG);
    let mut sum = vec![0.0f64; img_shape.size()];

    let strides = coilim_shape.strides();
    let img_strides = img_shape.broadcast_strides();
    for_each_position(coilim_shape.dims(), |pos| {
        sum[offset(pos, &img_strides)] += coilim[offset(pos, &strides)].norm_sqr() as f64;
    });

    Ok(sum.into_iter().map(|s| s.sqrt() as f32).collect())
}

/// Estimate the scale of coil images
///
/// With the RSS magnitudes sorted in decreasing order, `median`, `p90` and
/// `max` are the values at ranks n/2, n/10 and 0 (the k-th largest
/// convention: for 1..=100, p90 is 90 and the median 50). The scale is `p90` when
/// the brightest tenth is compact (`max - p90 < 2 (p90 - median)`) and `max`
/// otherwise. All-zero data yields 0, which callers treat as "do not scale".
///
/// # Arguments
/// * `coilim_shape` - Extents of the coil images
/// * `coilim` - Coil images, typically the centered FFT of the adjoint
pub fn estimate_scaling(coilim_shape: &Shape, coilim: &[Complex32]) -> Result<f32> {
    let mut mag = rss(coilim_shape, coilim)?;
    mag.sort_unstable_by(|a, b| b.total_cmp(a));

    let n = mag.len();
    let median = mag[n / 2];
    let p90 = mag[n / 10];
    let max = mag[0];

    let scale = if max - p90 < 2.0 * (p90 - median) { p90 } else { max };
    info!("Scaling: {}", scale);

    Ok(scale)
}
