//! Shape descriptors for multi-dimensional complex arrays
//!
//! Arrays are stored in column-major (Fortran) order over a fixed number of
//! dimension slots, so `index = i0 + i1*n0 + i2*n0*n1 + ...`. A `u32`
//! bitmask selects which slots take part in a transform.

use crate::error::{Error, Result};

/// Number of dimension slots in the MRI array convention
pub const DIMS: usize = 16;

pub const READ_DIM: usize = 0;
pub const PHS1_DIM: usize = 1;
pub const PHS2_DIM: usize = 2;
pub const COIL_DIM: usize = 3;
pub const MAPS_DIM: usize = 4;

/// The three spatial dimensions
pub const FFT_FLAGS: u32 = (1 << READ_DIM) | (1 << PHS1_DIM) | (1 << PHS2_DIM);
pub const COIL_FLAG: u32 = 1 << COIL_DIM;
pub const MAPS_FLAG: u32 = 1 << MAPS_DIM;

/// Check whether dimension `i` is selected by `flags`
#[inline(always)]
pub fn is_set(flags: u32, i: usize) -> bool {
    i < 32 && flags & (1 << i) != 0
}

/// Immutable N-dimensional extent vector
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a shape from explicit extents
    ///
    /// Every extent must be positive; a zero extent is a programming error.
    pub fn new(dims: &[usize]) -> Self {
        assert!(
            dims.iter().all(|&d| d > 0),
            "shape extents must be positive: {:?}", dims
        );
        Self { dims: dims.to_vec() }
    }

    /// Create a `DIMS`-slot shape from leading extents, padding with 1
    pub fn from_prefix(prefix: &[usize]) -> Self {
        assert!(prefix.len() <= DIMS, "too many dimensions: {}", prefix.len());
        let mut dims = [1usize; DIMS];
        dims[..prefix.len()].copy_from_slice(prefix);
        Self::new(&dims)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Extent of dimension `i` (1 past the last stored slot)
    #[inline]
    pub fn dim(&self, i: usize) -> usize {
        self.dims.get(i).copied().unwrap_or(1)
    }

    /// Total number of elements
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Column-major strides in elements
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.dims.len());
        let mut acc = 1;
        for &d in &self.dims {
            strides.push(acc);
            acc *= d;
        }
        strides
    }

    /// Strides with 0 for singleton dimensions, for broadcasting against a
    /// larger shape
    pub fn broadcast_strides(&self) -> Vec<usize> {
        self.strides().into_iter().zip(self.dims.iter())
            .map(|(s, &d)| if d == 1 { 0 } else { s })
            .collect()
    }

    /// Keep the extents selected by `flags`, collapse the others to 1
    pub fn select(&self, flags: u32) -> Shape {
        let dims = self.dims.iter().enumerate()
            .map(|(i, &d)| if is_set(flags, i) { d } else { 1 })
            .collect();
        Shape { dims }
    }

    /// Return a copy with dimension `i` set to `extent`
    pub fn with_dim(&self, i: usize, extent: usize) -> Shape {
        let mut dims = self.dims.clone();
        dims[i] = extent;
        Shape::new(&dims)
    }

    /// Error unless `other` has identical extents
    pub fn check(&self, other: &Shape) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.dims.clone(),
                got: other.dims.clone(),
            })
        }
    }

    /// Error unless a flat buffer of `len` elements fits this shape exactly
    pub fn check_buffer(&self, what: &'static str, len: usize) -> Result<()> {
        Error::check_len(what, self.size(), len)
    }
}

/// Linear offset of a multi-index
#[inline(always)]
pub fn offset(pos: &[usize], strides: &[usize]) -> usize {
    pos.iter().zip(strides.iter()).map(|(&p, &s)| p * s).sum()
}

/// Visit every multi-index of `dims` in column-major order
pub fn for_each_position<F>(dims: &[usize], mut f: F)
where
    F: FnMut(&[usize]),
{
    if dims.iter().any(|&d| d == 0) {
        return;
    }

    let mut pos = vec![0usize; dims.len()];
    loop {
        f(&pos);

        // Odometer increment, fastest dimension first
        let mut d = 0;
        loop {
            if d == dims.len() {
                return;
            }
            pos[d] += 1;
            if pos[d] < dims[d] {
                break;
            }
            pos[d] = 0;
            d += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_strides() {
        let s = Shape::new(&[4, 3, 2]);
        assert_eq!(s.size(), 24);
        assert_eq!(s.strides(), vec![1, 4, 12]);
    }

    #[test]
    fn test_select_drops_coil() {
        let s = Shape::from_prefix(&[8, 8, 1, 4, 2]);
        let img = s.select(!COIL_FLAG);
        assert_eq!(img.dim(COIL_DIM), 1);
        assert_eq!(img.dim(MAPS_DIM), 2);
        assert_eq!(img.dim(READ_DIM), 8);
        assert_eq!(img.ndim(), DIMS);
    }

    #[test]
    fn test_check_mismatch() {
        let a = Shape::new(&[4, 4]);
        let b = Shape::new(&[4, 2]);
        assert!(a.check(&a.clone()).is_ok());
        assert!(matches!(a.check(&b), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_for_each_position_order() {
        let mut seen = Vec::new();
        let strides = Shape::new(&[2, 3]).strides();
        for_each_position(&[2, 3], |p| seen.push(offset(p, &strides)));
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_is_set() {
        assert!(is_set(FFT_FLAGS, PHS2_DIM));
        assert!(!is_set(FFT_FLAGS, COIL_DIM));
    }
}
