//! Coil sensitivity encoding
//!
//! Maps an image with one or more sets of sensitivity maps (ESPIRiT) to coil
//! images:
//!
//! coil[x, c] = Σ_m S[x, c, m] · img[x, m]
//!
//! and back with the adjoint img[x, m] = Σ_c conj(S[x, c, m]) · coil[x, c].

use num_complex::Complex32;

use crate::config::Device;
use crate::error::Result;
use crate::linops::LinearOperator;
use crate::shape::{for_each_position, offset, Shape, COIL_FLAG, MAPS_FLAG};

/// Sensitivity-map operator: image → coil images
pub struct Maps {
    maps: Vec<Complex32>,
    map_shape: Shape,
    img_shape: Shape,
    coilim_shape: Shape,
}

impl Maps {
    /// # Arguments
    /// * `map_shape` - Extents of the maps, including coil and maps dimensions
    /// * `maps` - Sensitivities (map_shape.size() values)
    /// * `device` - Where the maps are kept
    pub fn new(map_shape: &Shape, maps: Vec<Complex32>, device: Device) -> Result<Self> {
        device.ensure_available()?;
        map_shape.check_buffer("maps", maps.len())?;

        Ok(Self {
            maps,
            map_shape: map_shape.clone(),
            img_shape: map_shape.select(!COIL_FLAG),
            coilim_shape: map_shape.select(!MAPS_FLAG),
        })
    }
}

impl LinearOperator for Maps {
    fn domain(&self) -> &Shape {
        &self.img_shape
    }

    fn codomain(&self) -> &Shape {
        &self.coilim_shape
    }

    fn forward(&self, dst: &mut [Complex32], src: &[Complex32]) {
        debug_assert_eq!(src.len(), self.img_shape.size());
        debug_assert_eq!(dst.len(), self.coilim_shape.size());

        let map_strides = self.map_shape.strides();
        let img_strides = self.img_shape.broadcast_strides();
        let coil_strides = self.coilim_shape.broadcast_strides();

        dst.fill(Complex32::new(0.0, 0.0));
        for_each_position(self.map_shape.dims(), |pos| {
            let s = self.maps[offset(pos, &map_strides)];
            dst[offset(pos, &coil_strides)] += s * src[offset(pos, &img_strides)];
        });
    }

    fn adjoint(&self, dst: &mut [Complex32], src: &[Complex32]) {
        debug_assert_eq!(src.len(), self.coilim_shape.size());
        debug_assert_eq!(dst.len(), self.img_shape.size());

        let map_strides = self.map_shape.strides();
        let img_strides = self.img_shape.broadcast_strides();
        let coil_strides = self.coilim_shape.broadcast_strides();

        dst.fill(Complex32::new(0.0, 0.0));
        for_each_position(self.map_shape.dims(), |pos| {
            let s = self.maps[offset(pos, &map_strides)];
            dst[offset(pos, &img_strides)] += s.conj() * src[offset(pos, &coil_strides)];
        });
    }
}
