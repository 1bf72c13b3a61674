//! Non-uniform Fourier operator
//!
//! Maps coil images on a Cartesian grid to k-space samples at arbitrary
//! trajectory positions. The transform is evaluated exactly (NDFT):
//!
//! y[j] = w[j] / sqrt(N) · Σ_n x[n] · exp(-i 2π k_j · (n - N/2) / N)
//!
//! with trajectory coordinates `k_j` in cycles per field of view and `w` the
//! sampling pattern weights. The normal operator optionally uses the
//! Toeplitz embedding: AᴴA is a convolution with the point spread function,
//! evaluated with FFTs on a grid of at least twice the image size.

use num_complex::{Complex32, Complex64};
use std::f64::consts::PI;
use tracing::debug;

use crate::config::Device;
use crate::error::{Error, Result};
use crate::fft::FftNd;
use crate::linops::LinearOperator;
use crate::shape::{
    for_each_position, offset, Shape, COIL_DIM, COIL_FLAG, FFT_FLAGS, PHS1_DIM, PHS2_DIM, READ_DIM,
};
use crate::utils::padding::{crop, next_fast_fft_size, zero_pad};

/// Number of spatial dimensions covered by the trajectory
const SPATIAL: usize = 3;

/// Construction options of the non-uniform Fourier operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NufftConfig {
    /// Evaluate the normal operator by Toeplitz embedding
    pub toeplitz: bool,
    /// Circulant preconditioning
    pub precond: bool,
    /// Stochastic sampling
    pub stochastic: bool,
}

impl Default for NufftConfig {
    fn default() -> Self {
        Self { toeplitz: true, precond: false, stochastic: false }
    }
}

/// Point spread functions of the Toeplitz-embedded normal operator
struct Toeplitz {
    grid: Shape,
    fft: FftNd,
    // One transformed kernel per distinct weight block, already divided by
    // the grid size
    kernels: Vec<Vec<Complex32>>,
}

/// Exact non-uniform DFT from coil images to k-space samples
pub struct Nufft {
    ksp_shape: Shape,
    coilim_shape: Shape,
    /// Per-image spatial shape (first three dimensions)
    img_shape: Shape,
    samples: usize,
    /// Phase table per spatial dimension, `samples × n_d`
    phase: [Vec<Complex64>; SPATIAL],
    /// Pattern weights, `samples` per weight block
    weights: Vec<Complex32>,
    scale: f64,
    toeplitz: Option<Toeplitz>,
}

impl Nufft {
    /// Build the operator
    ///
    /// # Arguments
    /// * `ksp_shape` - k-space extents: dims[0] = 1, dims[1]·dims[2] = samples,
    ///   other dimensions as in `coilim_shape`
    /// * `coilim_shape` - Coil image extents
    /// * `traj` - Trajectory, 3 coordinates per sample in cycles/FOV
    /// * `pattern` - Sampling weights over `ksp_shape` without the coil
    ///   dimension; `None` weights every sample by 1
    /// * `config` - Toeplitz/preconditioning/stochastic options
    /// * `device` - Where the operator runs
    pub fn new(
        ksp_shape: &Shape,
        coilim_shape: &Shape,
        traj: &[f32],
        pattern: Option<&[Complex32]>,
        config: NufftConfig,
        device: Device,
    ) -> Result<Self> {
        device.ensure_available()?;

        for (arg, shape) in [("ksp_shape", ksp_shape), ("coilim_shape", coilim_shape)] {
            if shape.ndim() < SPATIAL {
                return Err(Error::InvalidArgument {
                    arg,
                    reason: format!("{:?} has fewer than {} dimensions", shape.dims(), SPATIAL),
                });
            }
        }

        if traj.len() % SPATIAL != 0 {
            return Err(Error::InvalidArgument {
                arg: "traj",
                reason: format!("{} values is not a multiple of {}", traj.len(), SPATIAL),
            });
        }
        let samples = traj.len() / SPATIAL;

        if ksp_shape.dim(READ_DIM) != 1 || ksp_shape.dim(PHS1_DIM) * ksp_shape.dim(PHS2_DIM) != samples {
            return Err(Error::InvalidArgument {
                arg: "ksp_shape",
                reason: format!(
                    "{:?} does not hold {} non-Cartesian samples",
                    ksp_shape.dims(), samples
                ),
            });
        }
        coilim_shape.select(!FFT_FLAGS).check(&ksp_shape.select(!FFT_FLAGS))?;

        let pat_shape = ksp_shape.select(!COIL_FLAG);
        let weights = match pattern {
            Some(p) => {
                pat_shape.check_buffer("pattern", p.len())?;
                p.to_vec()
            }
            None => vec![Complex32::new(1.0, 0.0); pat_shape.size()],
        };

        let img_shape = Shape::new(&[
            coilim_shape.dim(0),
            coilim_shape.dim(1),
            coilim_shape.dim(2),
        ]);
        let scale = 1.0 / (img_shape.size() as f64).sqrt();

        let phase = [0, 1, 2].map(|d| {
            let n = img_shape.dim(d);
            let center = (n / 2) as f64;
            let mut table = Vec::with_capacity(samples * n);
            for j in 0..samples {
                let k = traj[SPATIAL * j + d] as f64;
                for i in 0..n {
                    table.push(Complex64::from_polar(1.0, -2.0 * PI * k * (i as f64 - center) / n as f64));
                }
            }
            table
        });

        debug!(
            "NUFFT: image {:?}, {} samples, toeplitz {}, precond {}, stochastic {}",
            img_shape.dims(), samples, config.toeplitz, config.precond, config.stochastic
        );

        let mut op = Self {
            ksp_shape: ksp_shape.clone(),
            coilim_shape: coilim_shape.clone(),
            img_shape,
            samples,
            phase,
            weights,
            scale,
            toeplitz: None,
        };

        if config.toeplitz {
            op.toeplitz = Some(op.toeplitz_kernels(traj));
        }

        Ok(op)
    }

    /// Point spread function of every weight block on the embedding grid
    fn toeplitz_kernels(&self, traj: &[f32]) -> Toeplitz {
        let n: [usize; SPATIAL] = [0, 1, 2].map(|d| self.img_shape.dim(d));
        let g: [usize; SPATIAL] = n.map(|n| if n > 1 { next_fast_fft_size(2 * n) } else { 1 });
        let grid = Shape::new(&g);
        let fft = FftNd::new(&grid, FFT_FLAGS);

        // exp(+i 2π k_j d / N) for signed offsets d; zero outside |d| < N
        let tables = [0, 1, 2].map(|d| {
            let mut table = vec![Complex64::new(0.0, 0.0); self.samples * g[d]];
            for j in 0..self.samples {
                let k = traj[SPATIAL * j + d] as f64;
                for gi in 0..g[d] {
                    let dist = if gi < n[d] {
                        gi as f64
                    } else if g[d] - gi < n[d] {
                        -((g[d] - gi) as f64)
                    } else {
                        continue;
                    };
                    table[j * g[d] + gi] = Complex64::from_polar(1.0, 2.0 * PI * k * dist / n[d] as f64);
                }
            }
            table
        });

        let norm = self.scale * self.scale / grid.size() as f64;
        let kernels = self.weights.chunks(self.samples)
            .map(|w| {
                let mut psf = vec![Complex32::new(0.0, 0.0); grid.size()];
                let strides = grid.strides();
                for_each_position(grid.dims(), |pos| {
                    let mut acc = Complex64::new(0.0, 0.0);
                    for (j, wj) in w.iter().enumerate() {
                        acc += tables[0][j * g[0] + pos[0]]
                            * tables[1][j * g[1] + pos[1]]
                            * tables[2][j * g[2] + pos[2]]
                            * wj.norm_sqr() as f64;
                    }
                    acc *= norm;
                    psf[offset(pos, &strides)] = Complex32::new(acc.re as f32, acc.im as f32);
                });
                fft.fft(&mut psf);
                psf
            })
            .collect();

        Toeplitz { grid, fft, kernels }
    }

    /// Visit every image batch: (batch index, weight block index)
    ///
    /// Batches run over the non-spatial dimensions; all coils of one batch
    /// share a weight block.
    fn batches<F: FnMut(usize, usize)>(&self, mut f: F) {
        let batch_dims = &self.coilim_shape.dims()[SPATIAL..];
        let pat_dims: Vec<usize> = batch_dims.iter().enumerate()
            .map(|(i, &d)| if i + SPATIAL == COIL_DIM { 1 } else { d })
            .collect();
        let pat_strides = Shape::new(&pat_dims).broadcast_strides();

        let mut b = 0;
        for_each_position(batch_dims, |pos| {
            f(b, offset(pos, &pat_strides));
            b += 1;
        });
    }

    fn forward_one(&self, y: &mut [Complex32], x: &[Complex32], w: &[Complex32]) {
        let [nx, ny, nz] = [0, 1, 2].map(|d| self.img_shape.dim(d));
        let [tx, ty, tz] = &self.phase;

        for (j, (yj, wj)) in y.iter_mut().zip(w.iter()).enumerate() {
            let tx = &tx[j * nx..(j + 1) * nx];
            let ty = &ty[j * ny..(j + 1) * ny];
            let tz = &tz[j * nz..(j + 1) * nz];

            let mut acc = Complex64::new(0.0, 0.0);
            for (k, pz) in tz.iter().enumerate() {
                for (l, py) in ty.iter().enumerate() {
                    let line = &x[(k * ny + l) * nx..(k * ny + l + 1) * nx];
                    let mut row = Complex64::new(0.0, 0.0);
                    for (v, px) in line.iter().zip(tx.iter()) {
                        row += Complex64::new(v.re as f64, v.im as f64) * px;
                    }
                    acc += row * py * pz;
                }
            }
            acc *= self.scale;
            *yj = *wj * Complex32::new(acc.re as f32, acc.im as f32);
        }
    }

    fn adjoint_one(&self, x: &mut [Complex32], y: &[Complex32], w: &[Complex32]) {
        let [nx, ny, nz] = [0, 1, 2].map(|d| self.img_shape.dim(d));
        let [tx, ty, tz] = &self.phase;

        let mut acc = vec![Complex64::new(0.0, 0.0); x.len()];
        for (j, (yj, wj)) in y.iter().zip(w.iter()).enumerate() {
            let c = wj.conj() * *yj;
            let c = Complex64::new(c.re as f64, c.im as f64) * self.scale;
            let tx = &tx[j * nx..(j + 1) * nx];
            let ty = &ty[j * ny..(j + 1) * ny];
            let tz = &tz[j * nz..(j + 1) * nz];

            for (k, pz) in tz.iter().enumerate() {
                for (l, py) in ty.iter().enumerate() {
                    let cyz = c * (py * pz).conj();
                    let line = &mut acc[(k * ny + l) * nx..(k * ny + l + 1) * nx];
                    for (a, px) in line.iter_mut().zip(tx.iter()) {
                        *a += cyz * px.conj();
                    }
                }
            }
        }

        for (v, a) in x.iter_mut().zip(acc.iter()) {
            *v = Complex32::new(a.re as f32, a.im as f32);
        }
    }
}

impl LinearOperator for Nufft {
    fn domain(&self) -> &Shape {
        &self.coilim_shape
    }

    fn codomain(&self) -> &Shape {
        &self.ksp_shape
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        debug_assert_eq!(src.len(), self.coilim_shape.size());
        debug_assert_eq!(dst.len(), self.ksp_shape.size());

        let n = self.img_shape.size();
        let m = self.samples;
        self.batches(|b, wb| {
            let w = &self.weights[wb * m..(wb + 1) * m];
            self.forward_one(&mut dst[b * m..(b + 1) * m], &src[b * n..(b + 1) * n], w);
        });
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        debug_assert_eq!(src.len(), self.ksp_shape.size());
        debug_assert_eq!(dst.len(), self.coilim_shape.size());

        let n = self.img_shape.size();
        let m = self.samples;
        self.batches(|b, wb| {
            let w = &self.weights[wb * m..(wb + 1) * m];
            self.adjoint_one(&mut dst[b * n..(b + 1) * n], &src[b * m..(b + 1) * m], w);
        });
    }

    fn normal(&self, dst: &mut [Complex32], src: &[Complex32]) {
        let n = self.img_shape.size();
        let m = self.samples;

        match &self.toeplitz {
            Some(t) => {
                let mut padded = vec![Complex32::new(0.0, 0.0); t.grid.size()];
                self.batches(|b, wb| {
                    zero_pad(&src[b * n..(b + 1) * n], &self.img_shape, &mut padded, &t.grid);
                    t.fft.fft(&mut padded);
                    for (p, k) in padded.iter_mut().zip(t.kernels[wb].iter()) {
                        *p *= *k;
                    }
                    t.fft.ifft(&mut padded);
                    crop(&padded, &t.grid, &mut dst[b * n..(b + 1) * n], &self.img_shape);
                });
            }
            None => {
                let mut tmp = vec![Complex32::new(0.0, 0.0); m];
                self.batches(|b, wb| {
                    let w = &self.weights[wb * m..(wb + 1) * m];
                    self.forward_one(&mut tmp, &src[b * n..(b + 1) * n], w);
                    self.adjoint_one(&mut dst[b * n..(b + 1) * n], &tmp, w);
                });
            }
        }
    }
}
