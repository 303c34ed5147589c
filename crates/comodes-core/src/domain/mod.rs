pub mod errors;

pub use errors::{AfError, AfErrorCategory, AfResult};

use crate::twoform::ModeStorage;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Stored keys of the dataset containers. Both formats use the same
/// logical key set.
pub mod keys {
    pub const SIGMA_MATRIX: &str = "sigma_matrix";
    pub const UNDULATOR: &str = "undulator";
    pub const DETUNING_PARAMETER: &str = "detuning_parameter";
    pub const ENERGY: &str = "energy";
    pub const ELECTRON_BEAM_ENERGY: &str = "electron_beam_energy";
    pub const WAVEFRONT_0: &str = "wavefront_0";
    pub const WAVEFRONT_1: &str = "wavefront_1";
    pub const WAVEFRONT_2: &str = "wavefront_2";
    pub const EXIT_SLIT_WAVEFRONT_0: &str = "exit_slit_wavefront_0";
    pub const EXIT_SLIT_WAVEFRONT_1: &str = "exit_slit_wavefront_1";
    pub const EXIT_SLIT_WAVEFRONT_2: &str = "exit_slit_wavefront_2";
    pub const WEIGHTED_FIELDS: &str = "weighted_fields";
    pub const SRW_WAVEFRONT_RX: &str = "srw_wavefront_rx";
    pub const SRW_WAVEFRONT_DRX: &str = "srw_wavefront_drx";
    pub const SRW_WAVEFRONT_RY: &str = "srw_wavefront_ry";
    pub const SRW_WAVEFRONT_DRY: &str = "srw_wavefront_dry";
    pub const SAMPLING_FACTOR: &str = "sampling_factor";
    pub const MINIMAL_SIZE: &str = "minimal_size";
    pub const BEAM_ENERGIES: &str = "beam_energies";
    pub const STATIC_ELECTRON_DENSITY: &str = "static_electron_density";
    pub const INFO: &str = "info";
    pub const TWOFORM_X: &str = "twoform_0";
    pub const TWOFORM_Y: &str = "twoform_1";
    pub const TWOFORM_DIAGONAL: &str = "twoform_2";
    pub const TWOFORM_EIGENVALUES: &str = "twoform_3";
    pub const TWOFORM_MODES: &str = "twoform_4";
    pub const TWOFORM_ERRORS: &str = "twoform_5";
}

/// Container format, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetFormat {
    Hdf5,
    Npz,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> AfResult<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "h5" => Ok(Self::Hdf5),
            "npz" => Ok(Self::Npz),
            other => Err(AfError::unsupported_format(
                "INPUT.DATASET_EXTENSION",
                format!(
                    "unsupported dataset extension '{}' for '{}'; expected 'h5' or 'npz'",
                    other,
                    path.display()
                ),
            )),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hdf5 => "h5",
            Self::Npz => "npz",
        }
    }
}

impl Display for DatasetFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One wavefront as persisted: complex field samples, coordinate range
/// `[x_start, x_end, y_start, y_end]`, and the energy samples the field
/// was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct WavefrontArrays {
    pub field: Array2<Complex64>,
    pub range: Array1<f64>,
    pub energies: Array1<f64>,
}

/// Flat record of stored entries, loaded verbatim from one container.
///
/// Scalars keep their stored 1-element-array representation; extraction
/// to `f64` happens during reconstruction. Optional entries are already
/// resolved to `Option` here, at load time.
#[derive(Debug)]
pub struct RawRecord {
    /// Keys present in the container, in storage order.
    pub keys: Vec<String>,
    pub sigma_matrix: Array1<f64>,
    pub undulator: Array1<f64>,
    pub detuning_parameter: Array1<f64>,
    pub energy: Array1<f64>,
    pub electron_beam_energy: Array1<f64>,
    pub wavefront: WavefrontArrays,
    /// Default when absent: clone of `wavefront`.
    pub exit_slit_wavefront: Option<WavefrontArrays>,
    /// Default when absent: none.
    pub weighted_fields: Option<ndarray::Array3<Complex64>>,
    pub srw_wavefront_rx: Array1<f64>,
    pub srw_wavefront_drx: Array1<f64>,
    pub srw_wavefront_ry: Array1<f64>,
    pub srw_wavefront_dry: Array1<f64>,
    pub sampling_factor: Array1<f64>,
    pub minimal_size: Array1<f64>,
    pub beam_energies: Array1<f64>,
    pub static_electron_density: Array1<f64>,
    pub info: String,
    pub coordinates_x: Array1<f64>,
    pub coordinates_y: Array1<f64>,
    pub diagonal: Array1<Complex64>,
    pub eigenvalues: Array1<Complex64>,
    pub modes: ModeStorage,
    pub eigenvector_errors: Array1<f64>,
}

/// Extract the scalar stored as a 1-element array under `key`.
pub(crate) fn stored_scalar(values: &Array1<f64>, key: &'static str) -> AfResult<f64> {
    values.first().copied().ok_or_else(|| {
        AfError::shape_mismatch(
            "SHAPE.SCALAR_ENTRY",
            format!("entry '{}' is empty; expected a 1-element array", key),
        )
    })
}
