//! Non-Cartesian sampling
//!
//! - `nufft`: exact non-uniform Fourier operator with Toeplitz normal form

pub mod nufft;

pub use nufft::*;
