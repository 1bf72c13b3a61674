//! Periodic orthogonal wavelet transform over selected dimensions
//!
//! Separable multi-level Daubechies transform with periodic boundaries. At
//! each level the low-pass corner of the previous level is split along every
//! active dimension into low (first half) and high (second half) bands, so
//! the coefficient array has the same shape as the image. Forward and inverse
//! are exact transposes of each other.

use num_complex::Complex32;
use std::f32::consts::SQRT_2;

use crate::shape::{for_each_position, is_set, offset, Shape};

/// Filter length of the Daubechies filter with two vanishing moments
pub const DAU2_LEN: usize = 4;

const SQRT_3: f32 = 1.732_050_8;

/// Daubechies low-pass analysis filter with two vanishing moments
pub const DAU2_LO: [f32; DAU2_LEN] = [
    (1.0 + SQRT_3) / (4.0 * SQRT_2),
    (3.0 + SQRT_3) / (4.0 * SQRT_2),
    (3.0 - SQRT_3) / (4.0 * SQRT_2),
    (1.0 - SQRT_3) / (4.0 * SQRT_2),
];

/// Quadrature mirror of [`DAU2_LO`]: g[k] = (-1)^k h[L-1-k]
pub const DAU2_HI: [f32; DAU2_LEN] = [DAU2_LO[3], -DAU2_LO[2], DAU2_LO[1], -DAU2_LO[0]];

/// Dimensions that take part in the transform: selected and longer than 1
fn active_dims(flags: u32, dims: &[usize]) -> Vec<usize> {
    (0..dims.len()).filter(|&i| is_set(flags, i) && dims[i] > 1).collect()
}

/// Number of decomposition levels for the given extents
///
/// A level is possible while every active dimension is even, at least one
/// filter long, and its half is not below `minsize`.
pub fn num_levels(flags: u32, dims: &[usize], minsize: &[usize], filter_len: usize) -> usize {
    let active = active_dims(flags, dims);
    if active.is_empty() {
        return 0;
    }

    let mut d = dims.to_vec();
    let mut levels = 0;
    loop {
        let splittable = active.iter().all(|&i| {
            d[i] % 2 == 0 && d[i] >= filter_len && d[i] / 2 >= minsize[i].max(1)
        });
        if !splittable {
            return levels;
        }
        for &i in &active {
            d[i] /= 2;
        }
        levels += 1;
    }
}

/// Planned wavelet transform for one array shape
#[derive(Clone, Debug)]
pub struct WaveletTransform {
    shape: Shape,
    active: Vec<usize>,
    levels: usize,
}

impl WaveletTransform {
    pub fn new(shape: &Shape, flags: u32, minsize: &[usize]) -> Self {
        let levels = num_levels(flags, shape.dims(), minsize, DAU2_LEN);
        Self {
            shape: shape.clone(),
            active: active_dims(flags, shape.dims()),
            levels,
        }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Extents of the low-pass corner transformed at `level`
    fn block(&self, level: usize) -> Vec<usize> {
        let mut block = self.shape.dims().to_vec();
        for &i in &self.active {
            block[i] >>= level;
        }
        block
    }

    /// In-place forward transform
    pub fn forward(&self, data: &mut [Complex32]) {
        debug_assert_eq!(data.len(), self.shape.size());
        for level in 0..self.levels {
            let block = self.block(level);
            for &dim in &self.active {
                self.lines(data, &block, dim, analysis);
            }
        }
    }

    /// In-place inverse transform
    pub fn inverse(&self, data: &mut [Complex32]) {
        debug_assert_eq!(data.len(), self.shape.size());
        for level in (0..self.levels).rev() {
            let block = self.block(level);
            for &dim in self.active.iter().rev() {
                self.lines(data, &block, dim, synthesis);
            }
        }
    }

    /// Apply a 1D kernel to every line along `dim` inside the block
    fn lines(
        &self,
        data: &mut [Complex32],
        block: &[usize],
        dim: usize,
        kernel: fn(&[Complex32], &mut [Complex32]),
    ) {
        let n = block[dim];
        let strides = self.shape.strides();
        let stride = strides[dim];

        let mut outer = block.to_vec();
        outer[dim] = 1;

        let mut line = vec![Complex32::new(0.0, 0.0); n];
        let mut out = vec![Complex32::new(0.0, 0.0); n];

        for_each_position(&outer, |pos| {
            let start = offset(pos, &strides);
            for (i, v) in line.iter_mut().enumerate() {
                *v = data[start + i * stride];
            }
            kernel(&line, &mut out);
            for (i, v) in out.iter().enumerate() {
                data[start + i * stride] = *v;
            }
        });
    }
}

/// One periodic analysis step: low band into out[..n/2], high band into out[n/2..]
fn analysis(x: &[Complex32], out: &mut [Complex32]) {
    let n = x.len();
    let half = n / 2;
    for i in 0..half {
        let mut lo = Complex32::new(0.0, 0.0);
        let mut hi = Complex32::new(0.0, 0.0);
        for k in 0..DAU2_LEN {
            let v = x[(2 * i + k) % n];
            lo += v * DAU2_LO[k];
            hi += v * DAU2_HI[k];
        }
        out[i] = lo;
        out[half + i] = hi;
    }
}

/// Transpose of [`analysis`]
fn synthesis(c: &[Complex32], out: &mut [Complex32]) {
    let n = c.len();
    let half = n / 2;
    out.fill(Complex32::new(0.0, 0.0));
    for i in 0..half {
        let lo = c[i];
        let hi = c[half + i];
        for k in 0..DAU2_LEN {
            out[(2 * i + k) % n] += lo * DAU2_LO[k] + hi * DAU2_HI[k];
        }
    }
}
