//! Iterative algorithms for the regularized normal equations
//!
//! Every algorithm works on the problem `AᴴA x = Aᴴb` given the normal
//! operator `x -> AᴴA x` and the right-hand side `Aᴴb`:
//! - CG: conjugate gradient on `(AᴴA + λI) x = Aᴴb`
//! - IST: gradient step followed by the proximal operator
//! - FISTA: IST with Nesterov momentum
//!
//! plus the power iteration used to calibrate step sizes.
//!
//! The set of algorithms is closed, so selection is a tagged variant
//! ([`AlgorithmConfig`]) with one dispatch function.

pub mod cg;
pub mod fista;
pub mod hogwild;
pub mod ist;
pub mod power;

pub use cg::*;
pub use fista::*;
pub use hogwild::*;
pub use ist::*;
pub use power::*;

use num_complex::Complex32;

use crate::prox::ProximalOperator;

/// Algorithm and its parameters for one solve
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlgorithmConfig {
    ConjGrad(CgConfig),
    Ist(IstConfig),
    Fista(FistaConfig),
}

impl AlgorithmConfig {
    pub fn max_iterations(&self) -> usize {
        match self {
            AlgorithmConfig::ConjGrad(c) => c.max_iterations,
            AlgorithmConfig::Ist(c) => c.max_iterations,
            AlgorithmConfig::Fista(c) => c.max_iterations,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmConfig::ConjGrad(_) => "conjugate gradient",
            AlgorithmConfig::Ist(_) => "IST",
            AlgorithmConfig::Fista(_) => "FISTA",
        }
    }

    /// Run the selected algorithm
    ///
    /// # Arguments
    /// * `normal` - Closure computing dst = AᴴA src
    /// * `prox` - Proximal operator; ignored by CG
    /// * `x` - Initial guess, overwritten with the result
    /// * `rhs` - Aᴴb
    pub fn run<N>(
        &self,
        normal: N,
        prox: Option<&mut dyn ProximalOperator>,
        x: &mut [Complex32],
        rhs: &[Complex32],
    )
    where
        N: Fn(&mut [Complex32], &[Complex32]),
    {
        self.run_with_progress(normal, prox, x, rhs, |_, _| {})
    }

    /// Same as `run` but calls `progress(iteration, x)` after every update
    pub fn run_with_progress<N, F>(
        &self,
        normal: N,
        prox: Option<&mut dyn ProximalOperator>,
        x: &mut [Complex32],
        rhs: &[Complex32],
        progress: F,
    )
    where
        N: Fn(&mut [Complex32], &[Complex32]),
        F: FnMut(usize, &[Complex32]),
    {
        match self {
            AlgorithmConfig::ConjGrad(conf) => conjgrad(conf, normal, x, rhs, progress),
            AlgorithmConfig::Ist(conf) => ist(conf, normal, prox, x, rhs, progress),
            AlgorithmConfig::Fista(conf) => fista(conf, normal, prox, x, rhs, progress),
        }
    }
}

/// grad = AᴴA x - Aᴴb
#[inline]
pub(crate) fn gradient<N>(normal: &N, grad: &mut [Complex32], x: &[Complex32], rhs: &[Complex32])
where
    N: Fn(&mut [Complex32], &[Complex32]),
{
    use crate::utils::simd_ops::{as_real, as_real_mut, axpy_f32};

    normal(grad, x);
    axpy_f32(as_real_mut(grad), -1.0, as_real(rhs));
}
