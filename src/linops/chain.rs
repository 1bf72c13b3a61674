//! Operator composition
//!
//! `chain(inner, outer)` is the operator `outer ∘ inner`. Its adjoint applies
//! the child adjoints in reverse order, `innerᴴ ∘ outerᴴ`, which is exact.

use num_complex::Complex32;

use super::LinearOperator;
use crate::error::Result;
use crate::shape::Shape;

/// Composition of two operators; owns both children
pub struct Chain {
    inner: Box<dyn LinearOperator>,
    outer: Box<dyn LinearOperator>,
}

/// Compose `inner` followed by `outer`
///
/// The output shape of `inner` must equal the input shape of `outer`;
/// otherwise a `ShapeMismatch` error is returned and nothing is built.
pub fn chain(
    inner: Box<dyn LinearOperator>,
    outer: Box<dyn LinearOperator>,
) -> Result<Chain> {
    outer.domain().check(inner.codomain())?;
    Ok(Chain { inner, outer })
}

impl Chain {
    fn scratch(&self) -> Vec<Complex32> {
        vec![Complex32::new(0.0, 0.0); self.inner.codomain().size()]
    }
}

impl LinearOperator for Chain {
    fn domain(&self) -> &Shape {
        self.inner.domain()
    }

    fn codomain(&self) -> &Shape {
        self.outer.codomain()
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        let mut tmp = self.scratch();
        self.inner.forward(&mut tmp, src);
        self.outer.forward(dst, &tmp);
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        let mut tmp = self.scratch();
        self.outer.adjoint(&mut tmp, src);
        self.inner.adjoint(dst, &tmp);
    }

    /// innerᴴ (outerᴴ outer) inner, so the outer operator's normal form is used
    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        let mut tmp = self.scratch();
        let mut tmp2 = self.scratch();
        self.inner.forward(&mut tmp, src);
        self.outer.normal(&mut tmp2, &tmp);
        self.inner.adjoint(dst, &tmp2);
    }
}
