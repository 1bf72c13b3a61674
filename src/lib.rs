//! nusense: non-Cartesian iterative SENSE/ESPIRiT reconstruction
//!
//! Reconstructs an image from undersampled multi-coil k-space by solving
//! min_x ||A x - b||² + R(x), with A = NUFFT ∘ coil sensitivities and R
//! either a Tikhonov or an l1-wavelet penalty. Compiles to WebAssembly for
//! in-browser reconstruction.
//!
//! # Modules
//! - `shape`: array extents and dimension flags
//! - `linops`: linear operator trait and composition
//! - `sense`, `noncart`: coil sensitivity and non-uniform Fourier operators
//! - `wavelet`, `prox`: proximal operators
//! - `iter`: CG, IST, FISTA and power iteration
//! - `lsqr`: least-squares driver
//! - `recon`: the complete reconstruction pipeline
//! - `fft`, `utils`: FFTs, padding and vector kernels

// Core modules
pub mod error;
pub mod fft;
pub mod shape;
pub mod utils;

// Operators
pub mod linops;
pub mod noncart;
pub mod prox;
pub mod sense;
pub mod wavelet;

// Algorithms
pub mod config;
pub mod iter;
pub mod lsqr;
pub mod recon;

pub use error::{Error, Result};

use num_complex::Complex32;
use wasm_bindgen::prelude::*;

use config::ReconConfig;
use recon::{ReconInput, ReconOutput, Reconstruction};
use shape::{Shape, DIMS};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[allow(unused_macros)]
macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// ============================================================================
// Buffer conversion
// ============================================================================

/// Shape from leading extents passed from JavaScript
fn shape_from_dims(arg: &'static str, dims: &[u32]) -> Result<Shape> {
    if dims.is_empty() || dims.len() > DIMS || dims.iter().any(|&d| d == 0) {
        return Err(Error::InvalidArgument {
            arg,
            reason: format!("expected 1 to {} positive extents, got {:?}", DIMS, dims),
        });
    }
    let dims: Vec<usize> = dims.iter().map(|&d| d as usize).collect();
    Ok(Shape::from_prefix(&dims))
}

/// Complex buffer from interleaved real/imaginary pairs
fn complex_from_interleaved(arg: &'static str, data: &[f32]) -> Result<Vec<Complex32>> {
    if data.len() % 2 != 0 {
        return Err(Error::InvalidArgument {
            arg,
            reason: format!("interleaved complex data has odd length {}", data.len()),
        });
    }
    Ok(data.chunks_exact(2).map(|c| Complex32::new(c[0], c[1])).collect())
}

fn to_js(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn reconstruct<F>(
    traj: &[f32],
    kspace: &[f32],
    ksp_dims: &[u32],
    maps: &[f32],
    map_dims: &[u32],
    pattern: &[f32],
    options: &str,
    progress: F,
) -> Result<ReconOutput>
where
    F: FnMut(usize, usize),
{
    let config = if options.trim().is_empty() {
        ReconConfig::default()
    } else {
        ReconConfig::from_json(options)?
    };

    let kspace = complex_from_interleaved("kspace", kspace)?;
    let maps = complex_from_interleaved("maps", maps)?;
    let pattern = if pattern.is_empty() {
        None
    } else {
        Some(complex_from_interleaved("pattern", pattern)?)
    };

    let input = ReconInput {
        traj,
        ksp_shape: shape_from_dims("ksp_dims", ksp_dims)?,
        kspace: &kspace,
        map_shape: shape_from_dims("map_dims", map_dims)?,
        maps: &maps,
        pattern: pattern.as_deref(),
    };

    Reconstruction::new(config)?.run_with_progress(&input, progress)
}

fn output_to_js(out: &ReconOutput) -> std::result::Result<js_sys::Object, JsValue> {
    let result = js_sys::Object::new();

    // Image as interleaved Float32Array
    let image = js_sys::Float32Array::from(utils::simd_ops::as_real(&out.image));
    js_sys::Reflect::set(&result, &"image".into(), &image)?;

    let dims = js_sys::Array::new();
    for &d in out.img_shape.dims() {
        dims.push(&JsValue::from(d as u32));
    }
    js_sys::Reflect::set(&result, &"dims".into(), &dims)?;

    js_sys::Reflect::set(&result, &"scaling".into(), &JsValue::from(out.scaling))?;

    Ok(result)
}

// ============================================================================
// WASM Exports: Reconstruction
// ============================================================================

/// Non-Cartesian SENSE/ESPIRiT reconstruction
///
/// # Arguments
/// * `traj` - Float32Array trajectory, 3 coordinates per sample (cycles/FOV)
/// * `kspace` - Float32Array k-space, interleaved real/imaginary
/// * `ksp_dims` - Uint32Array k-space extents: [1, samples, 1, coils, ...]
/// * `maps` - Float32Array sensitivities, interleaved real/imaginary
/// * `map_dims` - Uint32Array map extents: [nx, ny, nz, coils, maps, ...]
/// * `pattern` - Float32Array sampling weights (interleaved), empty to estimate
/// * `options` - JSON reconstruction options, empty for defaults
///
/// # Returns
/// Object with `image` (interleaved Float32Array), `dims` and `scaling`
#[wasm_bindgen]
pub fn nusense_wasm(
    traj: &[f32],
    kspace: &[f32],
    ksp_dims: &[u32],
    maps: &[f32],
    map_dims: &[u32],
    pattern: &[f32],
    options: &str,
) -> std::result::Result<js_sys::Object, JsValue> {
    console_log!("WASM nusense: {} samples, ksp {:?}, maps {:?}", traj.len() / 3, ksp_dims, map_dims);

    let out = reconstruct(traj, kspace, ksp_dims, maps, map_dims, pattern, options, |_, _| {})
        .map_err(to_js)?;

    console_log!("WASM nusense complete, scaling {:.4e}", out.scaling);
    output_to_js(&out)
}

/// Reconstruction with progress callback
#[wasm_bindgen]
pub fn nusense_wasm_with_progress(
    traj: &[f32],
    kspace: &[f32],
    ksp_dims: &[u32],
    maps: &[f32],
    map_dims: &[u32],
    pattern: &[f32],
    options: &str,
    progress_callback: &js_sys::Function,
) -> std::result::Result<js_sys::Object, JsValue> {
    console_log!("WASM nusense with progress: {} samples, ksp {:?}, maps {:?}", traj.len() / 3, ksp_dims, map_dims);

    let callback = progress_callback.clone();
    let out = reconstruct(traj, kspace, ksp_dims, maps, map_dims, pattern, options,
        |current, total| {
            let this = JsValue::null();
            let _ = callback.call2(&this,
                &JsValue::from(current as u32),
                &JsValue::from(total as u32));
        }
    ).map_err(to_js)?;

    console_log!("WASM nusense complete, scaling {:.4e}", out.scaling);
    output_to_js(&out)
}

/// Default reconstruction options as JSON
#[wasm_bindgen]
pub fn nusense_default_options() -> String {
    serde_json::to_string(&ReconConfig::default()).unwrap_or_default()
}
