//! Elementwise operators

use num_complex::Complex32;

use super::LinearOperator;
use crate::error::Result;
use crate::shape::Shape;

/// y = x
pub struct Identity {
    shape: Shape,
}

impl Identity {
    pub fn new(shape: &Shape) -> Self {
        Self { shape: shape.clone() }
    }
}

impl LinearOperator for Identity {
    fn domain(&self) -> &Shape {
        &self.shape
    }

    fn codomain(&self) -> &Shape {
        &self.shape
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        dst.copy_from_slice(src);
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        dst.copy_from_slice(src);
    }

    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        dst.copy_from_slice(src);
    }
}

/// y[i] = w[i] x[i]
pub struct Diagonal {
    shape: Shape,
    weights: Vec<Complex32>,
}

impl Diagonal {
    /// The weight vector must hold one entry per element of `shape`
    pub fn new(shape: &Shape, weights: Vec<Complex32>) -> Result<Self> {
        shape.check_buffer("weights", weights.len())?;
        Ok(Self { shape: shape.clone(), weights })
    }
}

impl LinearOperator for Diagonal {
    fn domain(&self) -> &Shape {
        &self.shape
    }

    fn codomain(&self) -> &Shape {
        &self.shape
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        for ((d, s), w) in dst.iter_mut().zip(src.iter()).zip(self.weights.iter()) {
            *d = *s * *w;
        }
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        for ((d, s), w) in dst.iter_mut().zip(src.iter()).zip(self.weights.iter()) {
            *d = *s * w.conj();
        }
    }

    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        for ((d, s), w) in dst.iter_mut().zip(src.iter()).zip(self.weights.iter()) {
            *d = *s * w.norm_sqr();
        }
    }
}
