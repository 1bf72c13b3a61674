//! Padding, cropping and circular shifts for multi-dimensional arrays
//!
//! All arrays are column-major over the extents of a [`Shape`].

use num_complex::Complex32;

use crate::shape::{for_each_position, offset, Shape};

/// Find next size that is efficient for FFT
///
/// FFT is most efficient when the size factors into small primes (2, 3, 5).
/// This finds the smallest n >= size that satisfies this.
pub fn next_fast_fft_size(size: usize) -> usize {
    let mut n = size.max(1);
    loop {
        let mut m = n;
        // Factor out 2, 3, 5
        while m % 2 == 0 { m /= 2; }
        while m % 3 == 0 { m /= 3; }
        while m % 5 == 0 { m /= 5; }
        if m == 1 {
            return n;
        }
        n += 1;
    }
}

/// Copy `src` into the leading corner of a zero-filled array of shape `dst_shape`
///
/// Every extent of `dst_shape` must be at least the matching extent of `src_shape`.
pub fn zero_pad(src: &[Complex32], src_shape: &Shape, dst: &mut [Complex32], dst_shape: &Shape) {
    debug_assert_eq!(src.len(), src_shape.size());
    debug_assert_eq!(dst.len(), dst_shape.size());

    dst.fill(Complex32::new(0.0, 0.0));

    let src_strides = src_shape.strides();
    let dst_strides = dst_shape.strides();
    for_each_position(src_shape.dims(), |pos| {
        dst[offset(pos, &dst_strides)] = src[offset(pos, &src_strides)];
    });
}

/// Extract the leading corner of shape `dst_shape` from a larger array
pub fn crop(src: &[Complex32], src_shape: &Shape, dst: &mut [Complex32], dst_shape: &Shape) {
    debug_assert_eq!(src.len(), src_shape.size());
    debug_assert_eq!(dst.len(), dst_shape.size());

    let src_strides = src_shape.strides();
    let dst_strides = dst_shape.strides();
    for_each_position(dst_shape.dims(), |pos| {
        dst[offset(pos, &dst_strides)] = src[offset(pos, &src_strides)];
    });
}

/// Circular shift: `dst[(p + shift) mod n] = src[p]` along every dimension
///
/// `shift` may be shorter than the shape; missing entries are zero.
pub fn circshift(shape: &Shape, shift: &[usize], dst: &mut [Complex32], src: &[Complex32]) {
    debug_assert_eq!(src.len(), shape.size());
    debug_assert_eq!(dst.len(), shape.size());

    let dims = shape.dims();
    let strides = shape.strides();
    let shift: Vec<usize> = (0..dims.len())
        .map(|d| shift.get(d).copied().unwrap_or(0) % dims[d])
        .collect();

    if shift.iter().all(|&s| s == 0) {
        dst.copy_from_slice(src);
        return;
    }

    let mut shifted = vec![0usize; dims.len()];
    for_each_position(dims, |pos| {
        for d in 0..dims.len() {
            shifted[d] = (pos[d] + shift[d]) % dims[d];
        }
        dst[offset(&shifted, &strides)] = src[offset(pos, &strides)];
    });
}

/// Inverse of [`circshift`] with the same shift vector
pub fn circshift_back(shape: &Shape, shift: &[usize], dst: &mut [Complex32], src: &[Complex32]) {
    let back: Vec<usize> = shape.dims().iter().enumerate()
        .map(|(d, &n)| (n - shift.get(d).copied().unwrap_or(0) % n) % n)
        .collect();
    circshift(shape, &back, dst, src);
}
