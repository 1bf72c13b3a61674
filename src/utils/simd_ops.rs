//! SIMD-accelerated vector kernels for the iterative algorithms
//!
//! Complex buffers are processed as interleaved `f32` pairs (see
//! [`as_real`]), so a real dot product of two such views is the real part of
//! the complex inner product and a real `axpy` is a complex `axpy` with a
//! real scalar. When the `simd` feature is enabled these use 128-bit SIMD
//! (f32x4) which is compatible with both native SSE/NEON and WASM SIMD.
//!
//! All operations have scalar fallbacks when SIMD is disabled.

use num_complex::Complex32;

#[cfg(feature = "simd")]
use wide::f32x4;

/// SIMD lane width (4 for f32x4)
#[cfg(feature = "simd")]
pub const SIMD_WIDTH: usize = 4;

#[cfg(not(feature = "simd"))]
pub const SIMD_WIDTH: usize = 1;

/// View a complex buffer as interleaved real/imaginary pairs
#[inline]
pub fn as_real(x: &[Complex32]) -> &[f32] {
    bytemuck::cast_slice(x)
}

/// Mutable view of a complex buffer as interleaved real/imaginary pairs
#[inline]
pub fn as_real_mut(x: &mut [Complex32]) -> &mut [f32] {
    bytemuck::cast_slice_mut(x)
}

/// View an interleaved real buffer as complex values
#[inline]
pub fn as_complex(x: &[f32]) -> &[Complex32] {
    bytemuck::cast_slice(x)
}

/// Mutable view of an interleaved real buffer as complex values
#[inline]
pub fn as_complex_mut(x: &mut [f32]) -> &mut [Complex32] {
    bytemuck::cast_slice_mut(x)
}

// ============================================================================
// Dot Product Operations
// ============================================================================

/// Compute dot product: sum(a[i] * b[i])
#[cfg(feature = "simd")]
#[inline]
pub fn dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let mut sum = f32x4::ZERO;

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        let vb = f32x4::from(&b[idx..idx + SIMD_WIDTH]);
        sum += va * vb;
    }

    let mut result = sum.reduce_add();

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        result += a[start + i] * b[start + i];
    }

    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai * bi).sum()
}

/// Compute squared norm: sum(a[i]^2)
#[cfg(feature = "simd")]
#[inline]
pub fn norm_squared_f32(a: &[f32]) -> f32 {
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let mut sum = f32x4::ZERO;

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        sum += va * va;
    }

    let mut result = sum.reduce_add();

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        result += a[start + i] * a[start + i];
    }

    result
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn norm_squared_f32(a: &[f32]) -> f32 {
    a.iter().map(|&ai| ai * ai).sum()
}

/// Euclidean norm
#[inline]
pub fn norm_f32(a: &[f32]) -> f32 {
    norm_squared_f32(a).sqrt()
}

// ============================================================================
// Fused Multiply-Add Operations
// ============================================================================

/// Compute a[i] = a[i] + alpha * b[i] (axpy operation)
#[cfg(feature = "simd")]
#[inline]
pub fn axpy_f32(a: &mut [f32], alpha: f32, b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let valpha = f32x4::splat(alpha);

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        let vb = f32x4::from(&b[idx..idx + SIMD_WIDTH]);
        let result = va + valpha * vb;
        a[idx..idx + SIMD_WIDTH].copy_from_slice(result.as_array_ref());
    }

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        a[start + i] += alpha * b[start + i];
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn axpy_f32(a: &mut [f32], alpha: f32, b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, &bi) in a.iter_mut().zip(b.iter()) {
        *ai += alpha * bi;
    }
}

/// Compute a[i] = b[i] + beta * a[i] (used in CG for p update)
#[cfg(feature = "simd")]
#[inline]
pub fn xpby_f32(a: &mut [f32], b: &[f32], beta: f32) {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let vbeta = f32x4::splat(beta);

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        let vb = f32x4::from(&b[idx..idx + SIMD_WIDTH]);
        let result = vb + vbeta * va;
        a[idx..idx + SIMD_WIDTH].copy_from_slice(result.as_array_ref());
    }

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        a[start + i] = b[start + i] + beta * a[start + i];
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn xpby_f32(a: &mut [f32], b: &[f32], beta: f32) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, &bi) in a.iter_mut().zip(b.iter()) {
        *ai = bi + beta * *ai;
    }
}

/// Scale array in place: a[i] = alpha * a[i]
#[cfg(feature = "simd")]
#[inline]
pub fn scale_f32(a: &mut [f32], alpha: f32) {
    let n = a.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    let valpha = f32x4::splat(alpha);

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        let result = valpha * va;
        a[idx..idx + SIMD_WIDTH].copy_from_slice(result.as_array_ref());
    }

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        a[start + i] *= alpha;
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn scale_f32(a: &mut [f32], alpha: f32) {
    for val in a.iter_mut() {
        *val *= alpha;
    }
}

/// Compute out[i] = a[i] - b[i]
#[cfg(feature = "simd")]
#[inline]
pub fn sub_f32(out: &mut [f32], a: &[f32], b: &[f32]) {
    debug_assert!(out.len() == a.len() && a.len() == b.len());
    let n = out.len();
    let chunks = n / SIMD_WIDTH;
    let remainder = n % SIMD_WIDTH;

    for i in 0..chunks {
        let idx = i * SIMD_WIDTH;
        let va = f32x4::from(&a[idx..idx + SIMD_WIDTH]);
        let vb = f32x4::from(&b[idx..idx + SIMD_WIDTH]);
        let result = va - vb;
        out[idx..idx + SIMD_WIDTH].copy_from_slice(result.as_array_ref());
    }

    let start = chunks * SIMD_WIDTH;
    for i in 0..remainder {
        out[start + i] = a[start + i] - b[start + i];
    }
}

#[cfg(not(feature = "simd"))]
#[inline]
pub fn sub_f32(out: &mut [f32], a: &[f32], b: &[f32]) {
    debug_assert!(out.len() == a.len() && a.len() == b.len());
    for i in 0..out.len() {
        out[i] = a[i] - b[i];
    }
}

// ============================================================================
// Tests
// ============================================================================
