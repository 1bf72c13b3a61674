//! Utility functions
//!
//! - Padding, cropping and circular shifts
//! - SIMD-accelerated vector kernels (optional, with `simd` feature)

pub mod padding;
pub mod simd_ops;

pub use padding::*;
pub use simd_ops::*;
