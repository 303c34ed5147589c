//! Reference wavefronts reconstructed from their three stored arrays.

use crate::domain::{AfError, AfResult, WavefrontArrays};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Sampled wavefront: complex field on an equidistant grid bounded by
/// `[x_start, x_end] x [y_start, y_end]`, with the energy samples the
/// field was propagated for.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefront {
    field: Array2<Complex64>,
    x_start: f64,
    x_end: f64,
    y_start: f64,
    y_end: f64,
    energies: Array1<f64>,
}

impl Wavefront {
    /// Reconstruct from the stored triple: field samples, coordinate
    /// range `[x_start, x_end, y_start, y_end]`, energies.
    pub fn from_arrays(arrays: &WavefrontArrays) -> AfResult<Self> {
        if arrays.range.len() != 4 {
            return Err(AfError::shape_mismatch(
                "SHAPE.WAVEFRONT_RANGE",
                format!(
                    "wavefront range entry has {} values; expected [x_start, x_end, y_start, y_end]",
                    arrays.range.len()
                ),
            ));
        }

        Ok(Self {
            field: arrays.field.clone(),
            x_start: arrays.range[0],
            x_end: arrays.range[1],
            y_start: arrays.range[2],
            y_end: arrays.range[3],
            energies: arrays.energies.clone(),
        })
    }

    pub fn to_arrays(&self) -> WavefrontArrays {
        WavefrontArrays {
            field: self.field.clone(),
            range: ndarray::arr1(&[self.x_start, self.x_end, self.y_start, self.y_end]),
            energies: self.energies.clone(),
        }
    }

    pub fn field(&self) -> &Array2<Complex64> {
        &self.field
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.field.dim()
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.x_start, self.x_end)
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.y_start, self.y_end)
    }

    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    /// |E|^2 on the sampling grid.
    pub fn intensity(&self) -> Array2<f64> {
        self.field.mapv(|value| value.norm_sqr())
    }

    pub fn total_intensity(&self) -> f64 {
        self.field.iter().map(|value| value.norm_sqr()).sum()
    }
}
