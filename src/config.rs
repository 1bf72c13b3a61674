//! Reconstruction options
//!
//! `ReconConfig` carries every caller-level knob of a reconstruction. It
//! deserializes from JSON with defaults for anything left out, so callers
//! only spell out what they change.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::iter::{AlgorithmConfig, CgConfig, FistaConfig, IstConfig};

/// Regularization applied to the image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regularization {
    /// lambda ||x||² (Tikhonov), solved with conjugate gradient
    L2,
    /// lambda ||W x||₁ with W an orthogonal wavelet transform
    L1,
}

/// Execution target consumed by operator construction
///
/// The iteration logic never branches on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl Device {
    /// Error unless this build can place buffers on the device
    pub fn ensure_available(self) -> Result<()> {
        match self {
            Device::Cpu => Ok(()),
            Device::Gpu => Err(Error::UnsupportedDevice("gpu")),
        }
    }
}

/// All caller-level options of a non-Cartesian SENSE reconstruction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub regularization: Regularization,
    /// Regularization weight
    pub lambda: f32,
    pub max_iterations: usize,
    /// Base step size for IST/FISTA
    pub step: f32,
    /// Random wavelet cycle spinning
    pub randshift: bool,
    /// Use plain IST instead of FISTA for l1
    pub ist: bool,
    pub hogwild: bool,
    /// Divide the step by the largest eigenvalue of AᴴA
    pub eigen: bool,
    /// Toeplitz-embedded normal operator
    pub toeplitz: bool,
    /// Circulant preconditioning option of the Fourier operator
    pub precond: bool,
    /// Stochastic sampling option of the Fourier operator
    pub stochastic: bool,
    pub device: Device,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            regularization: Regularization::L2,
            lambda: 0.0,
            max_iterations: 50,
            step: 0.95,
            randshift: true,
            ist: false,
            hogwild: false,
            eigen: false,
            toeplitz: true,
            precond: false,
            stochastic: false,
            device: Device::Cpu,
        }
    }
}

impl ReconConfig {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReconConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lambda >= 0.0) {
            return Err(Error::InvalidArgument {
                arg: "lambda",
                reason: format!("must be non-negative, got {}", self.lambda),
            });
        }
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(Error::InvalidArgument {
                arg: "step",
                reason: format!("must be positive and finite, got {}", self.step),
            });
        }
        Ok(())
    }

    /// Pick the algorithm for these options
    ///
    /// - no l1 regularization: conjugate gradient with `l2_lambda = lambda`
    /// - l1 with `ist`: iterative soft-thresholding
    /// - l1 otherwise: FISTA
    ///
    /// `step` is the (possibly eigenvalue-calibrated) step size.
    pub fn algorithm(&self, step: f32) -> AlgorithmConfig {
        match self.regularization {
            Regularization::L2 => AlgorithmConfig::ConjGrad(CgConfig {
                max_iterations: self.max_iterations,
                l2_lambda: self.lambda,
            }),
            Regularization::L1 if self.ist => AlgorithmConfig::Ist(IstConfig {
                max_iterations: self.max_iterations,
                step,
                hogwild: self.hogwild,
            }),
            Regularization::L1 => AlgorithmConfig::Fista(FistaConfig {
                max_iterations: self.max_iterations,
                step,
                hogwild: self.hogwild,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ReconConfig::from_json("{}").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.max_iterations, 50);
        assert!(config.randshift);
        assert!(config.toeplitz);
    }

    #[test]
    fn test_partial_json() {
        let config = ReconConfig::from_json(
            r#"{"regularization": "l1", "lambda": 0.01, "ist": true, "device": "cpu"}"#
        ).unwrap();
        assert_eq!(config.regularization, Regularization::L1);
        assert!((config.lambda - 0.01).abs() < 1e-9);
        assert!(config.ist);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn test_rejects_negative_lambda() {
        assert!(matches!(
            ReconConfig::from_json(r#"{"lambda": -1.0}"#),
            Err(Error::InvalidArgument { arg: "lambda", .. })
        ));
        assert!(matches!(ReconConfig::from_json("{not json"), Err(Error::Config(_))));
    }

    #[test]
    fn test_selection_policy() {
        let mut config = ReconConfig { lambda: 0.5, max_iterations: 7, ..Default::default() };
        match config.algorithm(0.9) {
            AlgorithmConfig::ConjGrad(cg) => {
                assert_eq!(cg.max_iterations, 7);
                assert_eq!(cg.l2_lambda, 0.5);
            }
            other => panic!("expected CG, got {:?}", other),
        }

        config.regularization = Regularization::L1;
        assert!(matches!(config.algorithm(0.9), AlgorithmConfig::Fista(f) if f.step == 0.9));

        config.ist = true;
        config.hogwild = true;
        assert!(matches!(config.algorithm(0.9), AlgorithmConfig::Ist(i) if i.hogwild));
    }

    #[test]
    fn test_gpu_unavailable() {
        assert!(Device::Cpu.ensure_available().is_ok());
        assert!(matches!(Device::Gpu.ensure_available(), Err(Error::UnsupportedDevice(_))));
    }
}
