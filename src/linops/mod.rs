//! Linear operators over flat complex buffers
//!
//! Every operator maps between two shaped spaces and exposes:
//! - `forward`: y = A x
//! - `adjoint`: x = Aᴴ y
//! - `normal`: x = Aᴴ A x
//!
//! Operators are composed with [`chain`]. Concrete operators:
//! - `Identity`, `Diagonal`: elementwise maps, used for weighting and tests
//! - `Chain`: composition of two operators with the exact adjoint rule
//! - `sense::Maps` and `noncart::Nufft` live in their own modules

pub mod chain;
pub mod diag;

pub use chain::*;
pub use diag::*;

use num_complex::Complex32;

use crate::shape::Shape;

/// Forward/adjoint/normal contract shared by all measurement operators
///
/// `forward` reads a buffer of `domain().size()` elements and writes one of
/// `codomain().size()` elements; `adjoint` goes the other way. Implementations
/// must satisfy `<A x, y> = <x, Aᴴ y>` up to rounding.
pub trait LinearOperator: Send + Sync {
    /// Shape of the input space
    fn domain(&self) -> &Shape;

    /// Shape of the output space
    fn codomain(&self) -> &Shape;

    /// dst = A src
    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]);

    /// dst = Aᴴ src
    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]);

    /// dst = Aᴴ A src
    ///
    /// Operators with a cheaper normal form (e.g. Toeplitz embedding)
    /// override this.
    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        let mut tmp = vec![Complex32::new(0.0, 0.0); self.codomain().size()];
        self.forward(&mut tmp, src);
        self.adjoint(dst, &tmp);
    }
}

impl<T: LinearOperator + ?Sized> LinearOperator for Box<T> {
    fn domain(&self) -> &Shape {
        (**self).domain()
    }

    fn codomain(&self) -> &Shape {
        (**self).codomain()
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        (**self).forward(dst, src)
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        (**self).adjoint(dst, src)
    }

    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        (**self).normal(dst, src)
    }
}

/// Inner product <x, y> = Σ conj(x[i]) y[i], accumulated in double precision
pub fn inner_product(x: &[Complex32], y: &[Complex32]) -> num_complex::Complex64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter())
        .map(|(a, b)| {
            let a = num_complex::Complex64::new(a.re as f64, a.im as f64);
            let b = num_complex::Complex64::new(b.re as f64, b.im as f64);
            a.conj() * b
        })
        .sum()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by operator tests

    use num_complex::Complex32;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::{inner_product, LinearOperator};

    pub fn random_vector(n: usize, seed: u64) -> Vec<Complex32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Complex32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    /// Relative error of the adjoint identity <A x, y> = <x, Aᴴ y>
    pub fn adjoint_error(op: &dyn LinearOperator, seed: u64) -> f64 {
        let x = random_vector(op.domain().size(), seed);
        let y = random_vector(op.codomain().size(), seed + 1);

        let mut ax = vec![Complex32::new(0.0, 0.0); op.codomain().size()];
        op.forward(&mut ax, &x);
        let mut aty = vec![Complex32::new(0.0, 0.0); op.domain().size()];
        op.adjoint(&mut aty, &y);

        let lhs = inner_product(&ax, &y);
        let rhs = inner_product(&x, &aty);
        (lhs - rhs).norm() / lhs.norm().max(rhs.norm()).max(1e-30)
    }

    /// Relative error between the `normal` method and `adjoint(forward(x))`
    pub fn normal_error(op: &dyn LinearOperator, seed: u64) -> f64 {
        let x = random_vector(op.domain().size(), seed);

        let mut ax = vec![Complex32::new(0.0, 0.0); op.codomain().size()];
        op.forward(&mut ax, &x);
        let mut expected = vec![Complex32::new(0.0, 0.0); op.domain().size()];
        op.adjoint(&mut expected, &ax);

        let mut got = vec![Complex32::new(0.0, 0.0); op.domain().size()];
        op.normal(&mut got, &x);

        let diff: f64 = expected.iter().zip(got.iter())
            .map(|(a, b)| (*a - *b).norm_sqr() as f64)
            .sum();
        let scale: f64 = expected.iter().map(|a| a.norm_sqr() as f64).sum();
        (diff / scale.max(1e-30)).sqrt()
    }
}
