//! Regularized least-squares driver
//!
//! Solves min_x ||A x - b||² + R(x) by handing the normal equations
//! AᴴA x = Aᴴb to one of the iterative algorithms. The driver only ever uses
//! the operator's forward/adjoint/normal methods; where the operator runs and
//! how its normal form is evaluated are decided when it is built.

use num_complex::Complex32;
use tracing::debug;

use crate::error::{Error, Result};
use crate::iter::AlgorithmConfig;
use crate::linops::LinearOperator;
use crate::prox::ProximalOperator;
use crate::utils::simd_ops::{as_real, as_real_mut, axpy_f32, scale_f32};

/// Driver parameters
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LsqrConfig {
    /// Tikhonov weight added to the normal operator
    pub lambda: f32,
    /// Data scale; k-space is divided by it unless it is 0
    pub scaling: f32,
}

/// Reconstruct `image` from `kspace`
///
/// # Arguments
/// * `conf` - Tikhonov weight and data scale
/// * `algo` - Algorithm and its parameters
/// * `forward` - Measurement operator A
/// * `prox` - Proximal operator of the regularizer, if any
/// * `image` - Initial guess (usually zero), overwritten with the result
/// * `kspace` - Measured data b; not modified
pub fn lsqr(
    conf: &LsqrConfig,
    algo: &AlgorithmConfig,
    forward: &dyn LinearOperator,
    prox: Option<&mut dyn ProximalOperator>,
    image: &mut [Complex32],
    kspace: &[Complex32],
) -> Result<()> {
    lsqr_with_progress(conf, algo, forward, prox, image, kspace, |_, _| {})
}

/// Same as [`lsqr`] but calls `progress(iteration, total)` after every update
pub fn lsqr_with_progress<F>(
    conf: &LsqrConfig,
    algo: &AlgorithmConfig,
    forward: &dyn LinearOperator,
    prox: Option<&mut dyn ProximalOperator>,
    image: &mut [Complex32],
    kspace: &[Complex32],
    mut progress: F,
) -> Result<()>
where
    F: FnMut(usize, usize),
{
    forward.domain().check_buffer("image", image.len())?;
    forward.codomain().check_buffer("kspace", kspace.len())?;
    if let Some(p) = prox.as_deref() {
        Error::check_len("proximal operator", image.len(), p.size())?;
    }

    // Aᴴ (b / scaling)
    let mut rhs = vec![Complex32::new(0.0, 0.0); image.len()];
    if conf.scaling != 0.0 {
        let mut scaled = kspace.to_vec();
        scale_f32(as_real_mut(&mut scaled), 1.0 / conf.scaling);
        forward.adjoint(&mut rhs, &scaled);
    } else {
        forward.adjoint(&mut rhs, kspace);
    }

    let lambda = conf.lambda;
    let normal = |dst: &mut [Complex32], src: &[Complex32]| {
        forward.normal(dst, src);
        if lambda != 0.0 {
            axpy_f32(as_real_mut(dst), lambda, as_real(src));
        }
    };

    let total = algo.max_iterations();
    debug!("{}: {} iterations", algo.name(), total);

    algo.run_with_progress(normal, prox, image, &rhs, |iter, _| progress(iter + 1, total));

    Ok(())
}
