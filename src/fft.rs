//! Multi-dimensional FFT over flag-selected dimensions using rustfft
//!
//! Transforms run along every dimension selected by a bitmask, one line at a
//! time, on column-major complex arrays. The plain transforms are
//! unnormalized (rustfft convention); the centered unitary variants
//! ([`fftuc`], [`ifftuc`]) scale by `1/sqrt(n)` and move the zero frequency
//! to the middle of each selected dimension.

use num_complex::Complex32;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

use crate::shape::{for_each_position, is_set, offset, Shape};
use crate::utils::padding::circshift;

/// FFT plans for every selected dimension of one shape
pub struct FftNd {
    shape: Shape,
    // (dimension, forward plan, inverse plan)
    plans: Vec<(usize, Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>)>,
}

impl FftNd {
    /// Plan transforms along the dimensions of `shape` selected by `flags`
    ///
    /// Dimensions of extent 1 are skipped.
    pub fn new(shape: &Shape, flags: u32) -> Self {
        let mut planner = FftPlanner::new();
        let plans = (0..shape.ndim())
            .filter(|&d| is_set(flags, d) && shape.dim(d) > 1)
            .map(|d| {
                let n = shape.dim(d);
                (
                    d,
                    planner.plan_fft(n, FftDirection::Forward),
                    planner.plan_fft(n, FftDirection::Inverse),
                )
            })
            .collect();

        Self { shape: shape.clone(), plans }
    }

    /// Number of points in one multi-dimensional transform
    pub fn transform_size(&self) -> usize {
        self.plans.iter().map(|(d, _, _)| self.shape.dim(*d)).product()
    }

    /// In-place forward transform (unnormalized)
    pub fn fft(&self, data: &mut [Complex32]) {
        for (d, fwd, _) in &self.plans {
            transform_axis(&self.shape, *d, fwd.as_ref(), data);
        }
    }

    /// In-place inverse transform (unnormalized)
    pub fn ifft(&self, data: &mut [Complex32]) {
        for (d, _, inv) in &self.plans {
            transform_axis(&self.shape, *d, inv.as_ref(), data);
        }
    }
}

/// Run a 1D transform along dimension `dim` for every line of the array
fn transform_axis(shape: &Shape, dim: usize, plan: &dyn Fft<f32>, data: &mut [Complex32]) {
    debug_assert_eq!(data.len(), shape.size());

    let n = shape.dim(dim);
    let strides = shape.strides();
    let stride = strides[dim];
    let outer = shape.with_dim(dim, 1);

    let mut line = vec![Complex32::new(0.0, 0.0); n];
    let mut scratch = vec![Complex32::new(0.0, 0.0); plan.get_inplace_scratch_len()];

    for_each_position(outer.dims(), |pos| {
        let start = offset(pos, &strides);
        if stride == 1 {
            plan.process_with_scratch(&mut data[start..start + n], &mut scratch);
        } else {
            for (i, v) in line.iter_mut().enumerate() {
                *v = data[start + i * stride];
            }
            plan.process_with_scratch(&mut line, &mut scratch);
            for (i, v) in line.iter().enumerate() {
                data[start + i * stride] = *v;
            }
        }
    });
}

/// Shift vector that moves index 0 to the center of each selected dimension
fn center_shift(shape: &Shape, flags: u32, inverse: bool) -> Vec<usize> {
    shape.dims().iter().enumerate()
        .map(|(d, &n)| {
            if !is_set(flags, d) {
                0
            } else if inverse {
                // ifftshift: move by -(n / 2)
                (n - n / 2) % n
            } else {
                n / 2
            }
        })
        .collect()
}

/// Centered unitary FFT: `fftshift(fft(ifftshift(x))) / sqrt(n)`
pub fn fftuc(shape: &Shape, flags: u32, data: &mut [Complex32]) {
    centered(shape, flags, data, false);
}

fn centered(shape: &Shape, flags: u32, data: &mut [Complex32], inverse: bool) {
    let plan = FftNd::new(shape, flags);
    let mut tmp = vec![Complex32::new(0.0, 0.0); data.len()];

    circshift(shape, &center_shift(shape, flags, true), &mut tmp, data);
    if inverse {
        plan.ifft(&mut tmp);
    } else {
        plan.fft(&mut tmp);
    }
    circshift(shape, &center_shift(shape, flags, false), data, &tmp);

    let scale = 1.0 / (plan.transform_size() as f32).sqrt();
    for v in data.iter_mut() {
        *v *= scale;
    }
}
