//! Wavelet regularization
//!
//! - `transform`: periodic orthogonal Daubechies transform over selected dimensions
//! - `thresh`: l1-wavelet proximal operator with random cycle spinning

pub mod thresh;
pub mod transform;

pub use thresh::*;
pub use transform::*;
