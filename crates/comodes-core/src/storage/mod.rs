//! Container I/O: format dispatch plus the HDF5 and npz codecs.

mod h5;
mod npz;

pub use h5::{load_h5, write_h5};
pub use npz::{load_npz, write_npz};

use crate::domain::{AfResult, DatasetFormat, RawRecord, WavefrontArrays};
use ndarray::{Array1, Array3};
use num_complex::Complex64;
use std::path::Path;

/// Fully materialized dataset, used when persisting and when staging
/// test fixtures. Scalars are written as 1-element arrays in both
/// container formats.
#[derive(Debug, Clone)]
pub struct DatasetPayload {
    pub sigma_matrix: Array1<f64>,
    pub undulator: Array1<f64>,
    pub detuning_parameter: f64,
    pub energy: f64,
    pub electron_beam_energy: f64,
    pub wavefront: WavefrontArrays,
    pub exit_slit_wavefront: Option<WavefrontArrays>,
    pub weighted_fields: Option<Array3<Complex64>>,
    pub srw_wavefront_rx: f64,
    pub srw_wavefront_drx: f64,
    pub srw_wavefront_ry: f64,
    pub srw_wavefront_dry: f64,
    pub sampling_factor: f64,
    pub minimal_size: f64,
    pub beam_energies: Array1<f64>,
    pub static_electron_density: Array1<f64>,
    pub info: String,
    pub coordinates_x: Array1<f64>,
    pub coordinates_y: Array1<f64>,
    pub diagonal: Array1<Complex64>,
    pub eigenvalues: Array1<Complex64>,
    pub modes: Array3<Complex64>,
    pub eigenvector_errors: Array1<f64>,
}

/// Raw record plus whatever backing handle the format requires.
#[derive(Debug)]
pub enum LoadedDataset {
    /// The file handle must outlive the record: mode fields are still
    /// read lazily from the open container.
    Hdf5 {
        record: RawRecord,
        file: hdf5::File,
    },
    /// Everything, modes included, lives in memory.
    Npz { record: RawRecord },
}

/// Load a dataset, dispatching on the file extension.
pub fn load(path: &Path) -> AfResult<LoadedDataset> {
    match DatasetFormat::from_path(path)? {
        DatasetFormat::Hdf5 => {
            let (record, file) = load_h5(path)?;
            Ok(LoadedDataset::Hdf5 { record, file })
        }
        DatasetFormat::Npz => {
            let record = load_npz(path)?;
            Ok(LoadedDataset::Npz { record })
        }
    }
}

/// Persist a payload, dispatching on the file extension.
pub fn write(path: &Path, payload: &DatasetPayload) -> AfResult<()> {
    match DatasetFormat::from_path(path)? {
        DatasetFormat::Hdf5 => write_h5(path, payload),
        DatasetFormat::Npz => write_npz(path, payload),
    }
}
