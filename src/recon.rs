//! Non-Cartesian iterative SENSE/ESPIRiT reconstruction
//!
//! Pipeline:
//! 1. Derive image, coil image and pattern shapes from k-space and maps
//! 2. Estimate the sampling pattern unless one is given
//! 3. Build A = NUFFT ∘ Maps and, for l1, the wavelet threshold
//! 4. Estimate the data scale from the adjoint
//! 5. Optionally divide the step by the largest eigenvalue of AᴴA
//! 6. Solve with the algorithm the options select

use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::{ReconConfig, Regularization};
use crate::error::{Error, Result};
use crate::fft::fftuc;
use crate::iter::{power_iteration, POWER_ITERATIONS};
use crate::linops::{chain, LinearOperator};
use crate::lsqr::{lsqr_with_progress, LsqrConfig};
use crate::noncart::{Nufft, NufftConfig};
use crate::prox::ProximalOperator;
use crate::sense::{estimate_pattern, estimate_scaling, sampling_stats, Maps};
use crate::shape::{Shape, COIL_FLAG, FFT_FLAGS, MAPS_DIM, MAPS_FLAG};
use crate::utils::simd_ops::{as_complex, as_complex_mut, as_real_mut};
use crate::wavelet::WaveletThresh;

/// Seed of the start vector of the eigenvalue estimate
const EIGEN_SEED: u64 = 1;

/// Largest coarse-scale extent of the wavelet regularizer
const WAVELET_MINSIZE: usize = 16;

/// Measured data of one reconstruction
pub struct ReconInput<'a> {
    /// Trajectory, 3 coordinates per sample in cycles/FOV
    pub traj: &'a [f32],
    pub ksp_shape: Shape,
    pub kspace: &'a [Complex32],
    pub map_shape: Shape,
    pub maps: &'a [Complex32],
    /// Sampling pattern over `ksp_shape` without coils; estimated when `None`
    pub pattern: Option<&'a [Complex32]>,
}

/// Reconstructed image and the scale the data was divided by
pub struct ReconOutput {
    pub img_shape: Shape,
    pub image: Vec<Complex32>,
    pub scaling: f32,
}

/// Reconstruction with fixed options
pub struct Reconstruction {
    config: ReconConfig,
}

impl Reconstruction {
    pub fn new(config: ReconConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, input: &ReconInput) -> Result<ReconOutput> {
        self.run_with_progress(input, |_, _| {})
    }

    /// Same as `run` but calls `progress(iteration, total)` during the solve
    pub fn run_with_progress<F>(&self, input: &ReconInput, progress: F) -> Result<ReconOutput>
    where
        F: FnMut(usize, usize),
    {
        let conf = &self.config;
        let ksp_shape = &input.ksp_shape;
        let map_shape = &input.map_shape;

        ksp_shape.check_buffer("kspace", input.kspace.len())?;
        map_shape.check_buffer("maps", input.maps.len())?;

        let img_shape = map_shape.select(!COIL_FLAG);
        let coilim_shape = map_shape.select(!MAPS_FLAG);

        if ksp_shape.dim(MAPS_DIM) != 1 {
            return Err(Error::UnsupportedMaps { maps: ksp_shape.dim(MAPS_DIM) });
        }

        self.log_options(map_shape);

        let (pat_shape, pattern) = match input.pattern {
            Some(p) => {
                let pat_shape = ksp_shape.select(!COIL_FLAG);
                pat_shape.check_buffer("pattern", p.len())?;
                (pat_shape, p.to_vec())
            }
            None => estimate_pattern(ksp_shape, input.kspace)?,
        };
        sampling_stats(&pat_shape, &pattern);

        let nufft_conf = NufftConfig {
            toeplitz: conf.toeplitz,
            precond: conf.precond,
            stochastic: conf.stochastic,
        };
        let fft_op = Nufft::new(ksp_shape, &coilim_shape, input.traj, Some(pattern.as_slice()), nufft_conf, conf.device)?;
        let maps_op = Maps::new(map_shape, input.maps.to_vec(), conf.device)?;

        let mut thresh = match conf.regularization {
            Regularization::L1 => Some(self.wavelet_thresh(&img_shape)?),
            Regularization::L2 => None,
        };

        // Scale from the centered coil images of the adjoint
        let mut adj = vec![Complex32::new(0.0, 0.0); coilim_shape.size()];
        fft_op.adjoint(&mut adj, input.kspace);
        fftuc(&coilim_shape, FFT_FLAGS, &mut adj);
        let scaling = estimate_scaling(&coilim_shape, &adj)?;

        let forward = chain(Box::new(maps_op), Box::new(fft_op))?;

        let mut step = conf.step;
        if conf.eigen {
            let maxeigen = max_eigenvalue(&forward);
            step /= maxeigen as f32;
            info!("Maximum eigenvalue: {:.2}", maxeigen);
        }

        let algo = conf.algorithm(step);
        info!("Algorithm: {}, {} iterations", algo.name(), algo.max_iterations());

        let lsqr_conf = LsqrConfig { lambda: 0.0, scaling };
        let mut image = vec![Complex32::new(0.0, 0.0); img_shape.size()];
        lsqr_with_progress(
            &lsqr_conf,
            &algo,
            &forward,
            thresh.as_mut().map(|t| t as &mut dyn ProximalOperator),
            &mut image,
            input.kspace,
            progress,
        )?;

        if let Some(t) = thresh {
            t.release();
        }

        info!("Done.");
        Ok(ReconOutput { img_shape, image, scaling })
    }

    fn log_options(&self, map_shape: &Shape) {
        let conf = &self.config;
        if map_shape.dim(MAPS_DIM) > 1 {
            info!("{} maps. ESPIRiT reconstruction.", map_shape.dim(MAPS_DIM));
        }
        if conf.regularization == Regularization::L1 {
            info!("l1-wavelet regularization");
        }
        if conf.hogwild {
            info!("Hogwild stepsize");
        }
        if conf.precond {
            info!("Circular Preconditioned");
        }
    }

    /// Wavelet threshold over the spatial dimensions with coarse scale
    /// min(extent, 16)
    fn wavelet_thresh(&self, img_shape: &Shape) -> Result<WaveletThresh> {
        let mut minsize = vec![1usize; img_shape.ndim()];
        for (d, m) in minsize.iter_mut().enumerate().take(3) {
            *m = img_shape.dim(d).min(WAVELET_MINSIZE);
        }
        WaveletThresh::new(
            img_shape.dims(),
            FFT_FLAGS,
            &minsize,
            self.config.lambda,
            self.config.randshift,
        )
    }
}

/// Largest eigenvalue of AᴴA from a seeded random start vector
pub fn max_eigenvalue(op: &dyn LinearOperator) -> f64 {
    let mut rng = StdRng::seed_from_u64(EIGEN_SEED);
    let mut u: Vec<Complex32> = (0..op.domain().size())
        .map(|_| Complex32::new(rng.gen::<f32>(), 0.0))
        .collect();

    power_iteration(
        POWER_ITERATIONS,
        |dst: &mut [f32], src: &[f32]| op.normal(as_complex_mut(dst), as_complex(src)),
        as_real_mut(&mut u),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linops::testing::{adjoint_error, normal_error, random_vector};
    use crate::shape::COIL_DIM;

    const N: usize = 32;

    /// Full Cartesian trajectory of an N×N grid
    fn cartesian_traj() -> Vec<f32> {
        let half = (N / 2) as f32;
        let mut traj = Vec::with_capacity(3 * N * N);
        for y in 0..N {
            for x in 0..N {
                traj.extend_from_slice(&[x as f32 - half, y as f32 - half, 0.0]);
            }
        }
        traj
    }

    /// Two coils: constant and a linear phase; Σ|S|² = 1.25 everywhere
    fn smooth_maps() -> (Shape, Vec<Complex32>) {
        let shape = Shape::from_prefix(&[N, N, 1, 2]);
        let mut maps = vec![Complex32::new(1.0, 0.0); N * N];
        maps.extend((0..N * N).map(|i| Complex32::from_polar(0.5, (i % N) as f32 * 0.2)));
        (shape, maps)
    }

    fn simulate(map_shape: &Shape, maps: &[Complex32], traj: &[f32], truth: &[Complex32]) -> (Shape, Vec<Complex32>) {
        let ksp_shape = Shape::from_prefix(&[1, N * N, 1, 2]);
        let coilim_shape = map_shape.select(!MAPS_FLAG);
        let nufft = Nufft::new(&ksp_shape, &coilim_shape, traj, None, NufftConfig::default(), Default::default()).unwrap();
        let maps_op = Maps::new(map_shape, maps.to_vec(), Default::default()).unwrap();
        let op = chain(Box::new(maps_op), Box::new(nufft)).unwrap();

        let mut kspace = vec![Complex32::new(0.0, 0.0); ksp_shape.size()];
        op.forward(&mut kspace, truth);
        (ksp_shape, kspace)
    }

    fn relative_error(image: &[Complex32], scaling: f32, truth: &[Complex32]) -> f32 {
        let diff: f32 = image.iter().zip(truth.iter())
            .map(|(x, t)| (*x * scaling - *t).norm_sqr())
            .sum();
        let norm: f32 = truth.iter().map(|t| t.norm_sqr()).sum();
        (diff / norm).sqrt()
    }

    #[test]
    fn test_l2_recon_recovers_image() {
        let traj = cartesian_traj();
        let (map_shape, maps) = smooth_maps();
        let truth = random_vector(N * N, 1);
        let (ksp_shape, kspace) = simulate(&map_shape, &maps, &traj, &truth);

        let recon = Reconstruction::new(ReconConfig { max_iterations: 5, ..Default::default() }).unwrap();
        let out = recon.run(&ReconInput {
            traj: &traj,
            ksp_shape,
            kspace: &kspace,
            map_shape,
            maps: &maps,
            pattern: None,
        }).unwrap();

        assert!(out.scaling > 0.0);
        assert_eq!(out.img_shape.dim(COIL_DIM), 1);
        let err = relative_error(&out.image, out.scaling, &truth);
        assert!(err < 1e-3, "relative error {}", err);
    }

    #[test]
    fn test_l1_fista_with_eigen_step() {
        let traj = cartesian_traj();
        let (map_shape, maps) = smooth_maps();
        let truth = random_vector(N * N, 2);
        let (ksp_shape, kspace) = simulate(&map_shape, &maps, &traj, &truth);

        let config = ReconConfig {
            regularization: Regularization::L1,
            lambda: 1e-5,
            max_iterations: 30,
            eigen: true,
            ..Default::default()
        };
        let out = Reconstruction::new(config).unwrap().run(&ReconInput {
            traj: &traj,
            ksp_shape,
            kspace: &kspace,
            map_shape,
            maps: &maps,
            pattern: None,
        }).unwrap();

        assert!(out.image.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
        let err = relative_error(&out.image, out.scaling, &truth);
        assert!(err < 0.05, "relative error {}", err);
    }

    #[test]
    fn test_maps_nufft_chain_consistency() {
        // Two ESPIRiT map sets, three coils, weighted random trajectory
        let map_shape = Shape::from_prefix(&[8, 6, 1, 3, 2]);
        let coilim_shape = map_shape.select(!MAPS_FLAG);
        let ksp_shape = Shape::from_prefix(&[1, 40, 1, 3]);

        let mut rng = StdRng::seed_from_u64(21);
        let traj: Vec<f32> = (0..40)
            .flat_map(|_| [rng.gen_range(-4.0..4.0), rng.gen_range(-3.0..3.0), 0.0])
            .collect();
        let pattern = random_vector(40, 22);
        let maps = random_vector(map_shape.size(), 23);

        for toeplitz in [false, true] {
            let config = NufftConfig { toeplitz, ..Default::default() };
            let nufft = Nufft::new(&ksp_shape, &coilim_shape, &traj, Some(pattern.as_slice()), config, Default::default())
                .unwrap();
            let maps_op = Maps::new(&map_shape, maps.clone(), Default::default()).unwrap();
            let op = chain(Box::new(maps_op), Box::new(nufft)).unwrap();

            assert_eq!(op.domain(), &map_shape.select(!COIL_FLAG));
            assert_eq!(op.codomain(), &ksp_shape);
            let adj = adjoint_error(&op, 24);
            let nrm = normal_error(&op, 25);
            assert!(adj < 1e-4, "toeplitz {}: adjoint error {}", toeplitz, adj);
            assert!(nrm < 1e-4, "toeplitz {}: normal error {}", toeplitz, nrm);
        }
    }

    #[test]
    fn test_max_eigenvalue_of_maps_chain() {
        let traj = cartesian_traj();
        let (map_shape, maps) = smooth_maps();
        let ksp_shape = Shape::from_prefix(&[1, N * N, 1, 2]);
        let nufft = Nufft::new(&ksp_shape, &map_shape, &traj, None, NufftConfig::default(), Default::default()).unwrap();
        let maps_op = Maps::new(&map_shape, maps, Default::default()).unwrap();
        let op = chain(Box::new(maps_op), Box::new(nufft)).unwrap();

        let eig = max_eigenvalue(&op);
        assert!((eig - 1.25).abs() < 1e-2, "eigenvalue {}", eig);
    }

    #[test]
    fn test_rejects_multi_map_kspace() {
        let traj = cartesian_traj();
        let (map_shape, maps) = smooth_maps();
        let ksp_shape = Shape::from_prefix(&[1, N * N, 1, 2, 2]);
        let kspace = vec![Complex32::new(0.0, 0.0); ksp_shape.size()];

        let recon = Reconstruction::new(ReconConfig::default()).unwrap();
        let result = recon.run(&ReconInput {
            traj: &traj,
            ksp_shape,
            kspace: &kspace,
            map_shape,
            maps: &maps,
            pattern: None,
        });
        assert!(matches!(result, Err(Error::UnsupportedMaps { maps: 2 })));
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let traj = cartesian_traj();
        let (map_shape, maps) = smooth_maps();
        let ksp_shape = Shape::from_prefix(&[1, N * N, 1, 2]);
        let kspace = vec![Complex32::new(1.0, 0.0); ksp_shape.size()];
        let pattern = vec![Complex32::new(1.0, 0.0); 10];

        let recon = Reconstruction::new(ReconConfig::default()).unwrap();
        let result = recon.run(&ReconInput {
            traj: &traj,
            ksp_shape,
            kspace: &kspace,
            map_shape,
            maps: &maps,
            pattern: Some(pattern.as_slice()),
        });
        assert!(matches!(result, Err(Error::BufferSize { what: "pattern", .. })));
    }
}
