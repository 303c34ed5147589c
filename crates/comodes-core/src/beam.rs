//! Statistical beam descriptor and undulator descriptor, reconstructed
//! from their flattened storage layout.

use crate::domain::{AfError, AfResult};
use ndarray::{Array1, Array2};

/// Second-moment (sigma) matrix of the electron beam, stored flattened
/// row-major as a square block.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaMatrix {
    elements: Array2<f64>,
}

impl SigmaMatrix {
    pub fn from_flat_array(values: &Array1<f64>) -> AfResult<Self> {
        let length = values.len();
        let dimension = (length as f64).sqrt().round() as usize;
        if dimension == 0 || dimension * dimension != length {
            return Err(AfError::shape_mismatch(
                "SHAPE.SIGMA_MATRIX",
                format!(
                    "sigma matrix entry has {} elements, which is not a square block",
                    length
                ),
            ));
        }

        let elements = Array2::from_shape_vec((dimension, dimension), values.to_vec())
            .map_err(|source| {
                AfError::internal(
                    "SYS.SIGMA_MATRIX_RESHAPE",
                    format!("failed to reshape sigma matrix: {}", source),
                )
            })?;
        Ok(Self { elements })
    }

    pub fn dimension(&self) -> usize {
        self.elements.nrows()
    }

    pub fn element(&self, row: usize, column: usize) -> Option<f64> {
        self.elements.get([row, column]).copied()
    }

    pub fn elements(&self) -> &Array2<f64> {
        &self.elements
    }

    /// Flattened row-major copy, matching the storage layout.
    pub fn to_flat_array(&self) -> Array1<f64> {
        Array1::from_iter(self.elements.iter().copied())
    }
}

/// Undulator parameters as persisted: deflection parameter K, magnetic
/// period length in meters, and the number of periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Undulator {
    pub k_value: f64,
    pub period_length: f64,
    pub number_of_periods: f64,
}

impl Undulator {
    pub fn from_array(values: &Array1<f64>) -> AfResult<Self> {
        if values.len() != 3 {
            return Err(AfError::shape_mismatch(
                "SHAPE.UNDULATOR",
                format!(
                    "undulator entry has {} values; expected [K, period_length, number_of_periods]",
                    values.len()
                ),
            ));
        }

        Ok(Self {
            k_value: values[0],
            period_length: values[1],
            number_of_periods: values[2],
        })
    }

    pub fn to_array(&self) -> Array1<f64> {
        ndarray::arr1(&[self.k_value, self.period_length, self.number_of_periods])
    }

    /// Total magnetic length of the device in meters.
    pub fn length(&self) -> f64 {
        self.period_length * self.number_of_periods
    }

    /// On-axis fundamental wavelength for a beam with Lorentz factor
    /// `gamma`, in meters.
    pub fn resonance_wavelength(&self, gamma: f64) -> f64 {
        self.period_length / (2.0 * gamma * gamma) * (1.0 + self.k_value * self.k_value / 2.0)
    }
}
