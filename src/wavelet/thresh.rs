//! l1-wavelet proximal operator with random cycle spinning
//!
//! prox(mu, x) = Sᵀ Wᴴ shrink(W S x, lambda·mu)
//!
//! where W is the orthogonal wavelet transform over the dimensions in
//! `flags` and S a circular shift. With `randshift` the shift is redrawn on
//! every call from a generator owned by the instance, seeded once at
//! construction, so a sequence of calls is reproducible and two instances
//! never influence each other.

use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use super::transform::{num_levels, WaveletTransform, DAU2_LEN};
use crate::error::{Error, Result};
use crate::prox::{soft_thresh, ProximalOperator};
use crate::shape::{is_set, Shape};
use crate::utils::padding::{circshift, circshift_back};

/// Seed of every instance's shift generator
pub const RAND_SEED: u64 = 1;

/// Largest value the shift generator produces
pub const RANGE_MAX: u32 = u32::MAX;

/// Draw an integer uniformly from `[0, limit]`
///
/// The generator range is split into `limit + 1` equal buckets; a draw that
/// lands in the incomplete bucket at the top is rejected and redrawn, so no
/// value is favoured.
pub fn rand_lim<R: RngCore + ?Sized>(rng: &mut R, limit: u32) -> u32 {
    let divisor = (RANGE_MAX as u64 / (limit as u64 + 1)).max(1);
    loop {
        let retval = rng.next_u32() as u64 / divisor;
        if retval <= limit as u64 {
            return retval as u32;
        }
    }
}

/// Soft-thresholding in a wavelet basis
pub struct WaveletThresh {
    dims: Vec<usize>,
    minsize: Vec<usize>,
    flags: u32,
    lambda: f32,
    randshift: bool,
    rng: StdRng,
    shape: Shape,
    transform: WaveletTransform,
}

impl WaveletThresh {
    /// Build the operator for arrays of extents `dims`
    ///
    /// # Arguments
    /// * `dims` - Array extents (copied)
    /// * `flags` - Bitmask of dimensions to transform
    /// * `minsize` - Minimum extent of the coarsest scale per dimension (copied)
    /// * `lambda` - Threshold weight, must be non-negative
    /// * `randshift` - Draw a random circular shift on every call
    pub fn new(
        dims: &[usize],
        flags: u32,
        minsize: &[usize],
        lambda: f32,
        randshift: bool,
    ) -> Result<Self> {
        if minsize.len() != dims.len() {
            return Err(Error::ShapeMismatch {
                expected: dims.to_vec(),
                got: minsize.to_vec(),
            });
        }
        if !(lambda >= 0.0) {
            return Err(Error::InvalidArgument {
                arg: "lambda",
                reason: format!("must be non-negative, got {}", lambda),
            });
        }

        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(Error::InvalidArgument {
                arg: "dims",
                reason: format!("extents must be positive, got {:?}", dims),
            });
        }

        let shape = Shape::new(dims);
        let transform = WaveletTransform::new(&shape, flags, minsize);
        debug!("Wavelet threshold: {:?}, {} levels, lambda {}", dims, transform.levels(), lambda);

        Ok(Self {
            dims: dims.to_vec(),
            minsize: minsize.to_vec(),
            flags,
            lambda,
            randshift,
            rng: StdRng::seed_from_u64(RAND_SEED),
            shape,
            transform,
        })
    }

    pub fn levels(&self) -> usize {
        self.transform.levels()
    }

    /// Shift for the next application; advances the generator when randomized
    fn next_shift(&mut self) -> Vec<usize> {
        let mut shift = vec![0usize; self.dims.len()];

        if self.randshift {
            let levels = num_levels(self.flags, &self.dims, &self.minsize, DAU2_LEN);
            let limit = (1u32 << levels) - 1;

            for (i, s) in shift.iter_mut().enumerate() {
                if is_set(self.flags, i) {
                    *s = rand_lim(&mut self.rng, limit) as usize;
                }
            }
        }

        shift
    }

    /// Release the operator and its owned copies of the extents
    pub fn release(self) {}
}

impl ProximalOperator for WaveletThresh {
    fn size(&self) -> usize {
        self.shape.size()
    }

    fn apply_inplace(&mut self, mu: f32, buf: &mut [Complex32]) {
        debug_assert_eq!(buf.len(), self.shape.size());

        let shift = self.next_shift();

        let threshold = self.lambda * mu;
        if threshold == 0.0 {
            return;
        }

        let mut coeffs = vec![Complex32::new(0.0, 0.0); buf.len()];
        circshift(&self.shape, &shift, &mut coeffs, buf);

        self.transform.forward(&mut coeffs);
        for c in coeffs.iter_mut() {
            *c = soft_thresh(*c, threshold);
        }
        self.transform.inverse(&mut coeffs);

        circshift_back(&self.shape, &shift, buf, &coeffs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linops::testing::random_vector;

    fn op(lambda: f32, randshift: bool) -> WaveletThresh {
        WaveletThresh::new(&[16, 16, 1], 0b111, &[4, 4, 1], lambda, randshift).unwrap()
    }

    #[test]
    fn test_zero_lambda_is_identity() {
        let input = random_vector(256, 1);
        for randshift in [false, true] {
            let mut thresh = op(0.0, randshift);
            let mut out = vec![Complex32::new(0.0, 0.0); 256];
            for _ in 0..3 {
                thresh.apply(0.7, &mut out, &input);
                assert_eq!(out, input);
            }
        }
    }

    #[test]
    fn test_deterministic_without_randshift() {
        let input = random_vector(256, 2);
        let mut thresh = op(0.1, false);

        let mut first = vec![Complex32::new(0.0, 0.0); 256];
        let mut second = vec![Complex32::new(0.0, 0.0); 256];
        thresh.apply(1.0, &mut first, &input);
        thresh.apply(1.0, &mut second, &input);

        assert_eq!(first, second);
        assert_ne!(first, input);
    }

    #[test]
    fn test_inplace_matches_separate_buffers() {
        let input = random_vector(256, 3);

        // Identical instances draw identical shifts
        let mut a = op(0.2, true);
        let mut b = op(0.2, true);

        for _ in 0..4 {
            let mut out = vec![Complex32::new(0.0, 0.0); 256];
            a.apply(0.5, &mut out, &input);

            let mut buf = input.clone();
            b.apply_inplace(0.5, &mut buf);

            assert_eq!(out, buf);
        }
    }

    #[test]
    fn test_instances_are_independent() {
        let input = random_vector(256, 4);
        let mut a = op(0.2, true);
        let mut b = op(0.2, true);
        let mut other = op(0.2, true);

        // Advancing `other` must not change what `b` produces
        let mut scratch = vec![Complex32::new(0.0, 0.0); 256];
        for _ in 0..5 {
            other.apply(1.0, &mut scratch, &input);
        }

        let mut out_a = vec![Complex32::new(0.0, 0.0); 256];
        let mut out_b = vec![Complex32::new(0.0, 0.0); 256];
        a.apply(1.0, &mut out_a, &input);
        b.apply(1.0, &mut out_b, &input);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_threshold_shrinks_energy() {
        let input = random_vector(256, 5);
        let mut thresh = op(0.3, true);
        let mut out = vec![Complex32::new(0.0, 0.0); 256];
        thresh.apply(1.0, &mut out, &input);

        let e_in: f32 = input.iter().map(|v| v.norm_sqr()).sum();
        let e_out: f32 = out.iter().map(|v| v.norm_sqr()).sum();
        assert!(e_out < e_in);

        // A huge threshold removes everything
        let mut wipe = op(1e6, true);
        wipe.apply(1.0, &mut out, &input);
        assert!(out.iter().all(|v| v.norm() < 1e-6));
    }

    #[test]
    fn test_shift_draws_within_levels() {
        // Dimension 3 is not transformed and must never move
        let mut thresh = WaveletThresh::new(&[16, 16, 1, 4], 0b111, &[4, 4, 1, 1], 0.1, true).unwrap();
        assert_eq!(thresh.levels(), 2);

        let mut moved = false;
        for _ in 0..100 {
            let shift = thresh.next_shift();
            assert_eq!(shift.len(), 4);
            assert!(shift[0] < 4 && shift[1] < 4);
            assert_eq!(shift[3], 0);
            moved |= shift[0] != 0 || shift[1] != 0;
        }
        assert!(moved);

        let mut fixed = WaveletThresh::new(&[16, 16, 1, 4], 0b111, &[4, 4, 1, 1], 0.1, false).unwrap();
        assert!(fixed.next_shift().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_rand_lim_bounded_and_uniform() {
        let mut rng = StdRng::seed_from_u64(99);
        let limit = 6u32;
        let draws = 70_000;
        let mut counts = vec![0usize; limit as usize + 1];

        for _ in 0..draws {
            let v = rand_lim(&mut rng, limit);
            assert!(v <= limit);
            counts[v as usize] += 1;
        }

        // Chi-square with 6 degrees of freedom; 22.46 is the 0.001 tail
        let expected = draws as f64 / (limit as f64 + 1.0);
        let chi2: f64 = counts.iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        assert!(chi2 < 22.46, "chi2 = {}, counts = {:?}", chi2, counts);
    }

    #[test]
    fn test_rand_lim_rejects_top_bucket() {
        // Generator that first returns values in the incomplete top bucket
        struct Scripted(Vec<u32>);
        impl RngCore for Scripted {
            fn next_u32(&mut self) -> u32 {
                self.0.remove(0)
            }
            fn next_u64(&mut self) -> u64 {
                self.next_u32() as u64
            }
            fn fill_bytes(&mut self, _dest: &mut [u8]) {}
            fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
                Ok(())
            }
        }

        // limit 2: divisor = (2^32 - 1) / 3, so u32::MAX / divisor = 3 > limit
        let mut rng = Scripted(vec![u32::MAX, u32::MAX, 5]);
        assert_eq!(rand_lim(&mut rng, 2), 0);
        assert!(rng.0.is_empty());
    }

    #[test]
    fn test_rejects_mismatched_minsize() {
        assert!(WaveletThresh::new(&[8, 8], 0b11, &[1], 0.1, true).is_err());
        assert!(WaveletThresh::new(&[8, 8], 0b11, &[1, 1], -0.1, true).is_err());
    }

    #[test]
    fn test_rejects_zero_extent() {
        assert!(matches!(
            WaveletThresh::new(&[8, 0], 0b11, &[1, 1], 0.1, true),
            Err(Error::InvalidArgument { arg: "dims", .. })
        ));
        assert!(WaveletThresh::new(&[], 0b11, &[], 0.1, true).is_err());
    }
}
