//! Read-only accessor over one persisted autocorrelation dataset.

use crate::beam::{SigmaMatrix, Undulator};
use crate::domain::{AfError, AfResult, DatasetFormat, RawRecord, stored_scalar};
use crate::info::InfoBlock;
use crate::storage::{self, LoadedDataset};
use crate::twoform::Twoform;
use crate::wavefront::Wavefront;
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Sentinel returned by [`AfReader::mode_up_to_percent`] when the scan
/// never reaches the requested occupancy.
pub const MODE_SCAN_EXHAUSTED: i64 = -1;

/// Wavefront sampling parameters carried alongside the decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingInfo {
    pub rx: f64,
    pub drx: f64,
    pub ry: f64,
    pub dry: f64,
    pub factor: f64,
    pub minimal_size: f64,
}

/// Compact serializable digest of one dataset, used by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub source: String,
    pub format: String,
    pub number_modes: usize,
    pub grid: (usize, usize),
    pub photon_energy: f64,
    pub total_intensity: f64,
    pub total_intensity_from_spectral_density: f64,
    pub occupation_all_modes: f64,
    pub mode_to_90_percent: i64,
    pub mode_to_95_percent: i64,
    pub mode_to_99_percent: i64,
}

/// Reader over one persisted autocorrelation dataset.
///
/// Immutable after construction except for the open/closed state of the
/// backing handle: when the source is HDF5 the container stays open so
/// mode fields can be fetched lazily, and [`AfReader::close`] (or drop)
/// releases it. Not safe for concurrent use from multiple threads.
#[derive(Debug)]
pub struct AfReader {
    source_path: PathBuf,
    format: DatasetFormat,
    keys: Vec<String>,
    sigma_matrix: SigmaMatrix,
    undulator: Undulator,
    detuning_parameter: f64,
    photon_energy: f64,
    electron_beam_energy: f64,
    wavefront: Wavefront,
    exit_slit_wavefront: Wavefront,
    sampling: SamplingInfo,
    beam_energies: Array1<f64>,
    weighted_fields: Option<Array3<Complex64>>,
    static_electron_density: Array1<f64>,
    info_block: InfoBlock,
    twoform: Twoform,
    spectral_density: Array2<Complex64>,
    file: Option<hdf5::File>,
}

impl AfReader {
    /// Load a dataset from `path`, dispatching on the extension.
    pub fn open(path: impl AsRef<Path>) -> AfResult<Self> {
        let path = path.as_ref();
        let format = DatasetFormat::from_path(path)?;
        match storage::load(path)? {
            LoadedDataset::Hdf5 { record, file } => {
                Self::from_record(record, Some(file), path, format)
            }
            LoadedDataset::Npz { record } => Self::from_record(record, None, path, format),
        }
    }

    /// Reconstruct the descriptor from a raw record. Optional entries
    /// were already resolved at load time; their defaults apply here.
    pub fn from_record(
        record: RawRecord,
        file: Option<hdf5::File>,
        path: &Path,
        format: DatasetFormat,
    ) -> AfResult<Self> {
        let sigma_matrix = SigmaMatrix::from_flat_array(&record.sigma_matrix)?;
        let undulator = Undulator::from_array(&record.undulator)?;
        let wavefront = Wavefront::from_arrays(&record.wavefront)?;
        // Default for a missing exit-slit wavefront: the reference one.
        let exit_slit_wavefront = match &record.exit_slit_wavefront {
            Some(arrays) => Wavefront::from_arrays(arrays)?,
            None => wavefront.clone(),
        };

        let sampling = SamplingInfo {
            rx: stored_scalar(&record.srw_wavefront_rx, "srw_wavefront_rx")?,
            drx: stored_scalar(&record.srw_wavefront_drx, "srw_wavefront_drx")?,
            ry: stored_scalar(&record.srw_wavefront_ry, "srw_wavefront_ry")?,
            dry: stored_scalar(&record.srw_wavefront_dry, "srw_wavefront_dry")?,
            factor: stored_scalar(&record.sampling_factor, "sampling_factor")?,
            minimal_size: stored_scalar(&record.minimal_size, "minimal_size")?,
        };

        let mut twoform = Twoform::new(
            record.coordinates_x,
            record.coordinates_y,
            record.diagonal,
            record.eigenvalues,
            record.modes,
        )?;
        twoform.set_eigenvector_errors(record.eigenvector_errors);

        let (nx, ny) = twoform.grid_shape();
        let spectral_density = twoform
            .diagonal()
            .clone()
            .into_shape((nx, ny))
            .map_err(|source| {
                AfError::internal(
                    "SHAPE.SPECTRAL_DENSITY",
                    format!("diagonal does not fold onto the ({nx}, {ny}) grid: {source}"),
                )
            })?;

        Ok(Self {
            source_path: path.to_path_buf(),
            format,
            keys: record.keys,
            sigma_matrix,
            undulator,
            detuning_parameter: stored_scalar(&record.detuning_parameter, "detuning_parameter")?,
            photon_energy: stored_scalar(&record.energy, "energy")?,
            electron_beam_energy: stored_scalar(
                &record.electron_beam_energy,
                "electron_beam_energy",
            )?,
            wavefront,
            exit_slit_wavefront,
            sampling,
            beam_energies: record.beam_energies,
            weighted_fields: record.weighted_fields,
            static_electron_density: record.static_electron_density,
            info_block: InfoBlock::from_text(record.info),
            twoform,
            spectral_density,
            file,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// Keys found in the container, in storage order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn sigma_matrix(&self) -> &SigmaMatrix {
        &self.sigma_matrix
    }

    pub fn undulator(&self) -> &Undulator {
        &self.undulator
    }

    pub fn detuning_parameter(&self) -> f64 {
        self.detuning_parameter
    }

    pub fn photon_energy(&self) -> f64 {
        self.photon_energy
    }

    pub fn electron_beam_energy(&self) -> f64 {
        self.electron_beam_energy
    }

    pub fn reference_wavefront(&self) -> &Wavefront {
        &self.wavefront
    }

    pub fn exit_slit_wavefront(&self) -> &Wavefront {
        &self.exit_slit_wavefront
    }

    pub fn sampling(&self) -> SamplingInfo {
        self.sampling
    }

    pub fn beam_energies(&self) -> &Array1<f64> {
        &self.beam_energies
    }

    pub fn weighted_fields(&self) -> Option<&Array3<Complex64>> {
        self.weighted_fields.as_ref()
    }

    pub fn info_block(&self) -> &InfoBlock {
        &self.info_block
    }

    pub fn twoform(&self) -> &Twoform {
        &self.twoform
    }

    pub fn eigenvalues(&self) -> &Array1<Complex64> {
        self.twoform.eigenvalues()
    }

    pub fn eigenvalue(&self, mode: usize) -> Option<Complex64> {
        self.twoform.eigenvalue(mode)
    }

    pub fn x_coordinates(&self) -> &Array1<f64> {
        self.twoform.x_coordinates()
    }

    pub fn y_coordinates(&self) -> &Array1<f64> {
        self.twoform.y_coordinates()
    }

    pub fn number_modes(&self) -> usize {
        self.twoform.number_modes()
    }

    /// `(number of modes, x grid size, y grid size)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        let (nx, ny) = self.twoform.grid_shape();
        (self.number_modes(), nx, ny)
    }

    /// Diagonal of the correlation function on the `(nx, ny)` grid.
    pub fn spectral_density(&self) -> &Array2<Complex64> {
        &self.spectral_density
    }

    pub fn reference_electron_density(&self) -> &Array1<f64> {
        &self.static_electron_density
    }

    /// Intensity grid of the reference wavefront.
    pub fn reference_undulator_radiation(&self) -> Array2<f64> {
        self.wavefront.intensity()
    }

    /// Real part of the integrated spectral density.
    pub fn total_intensity_from_spectral_density(&self) -> f64 {
        self.twoform.diagonal().iter().map(|value| value.re).sum()
    }

    /// Sum of the absolute intensity grid.
    pub fn total_intensity(&self) -> f64 {
        self.twoform.diagonal().iter().map(|value| value.norm()).sum()
    }

    /// Occupation fraction per mode: eigenvalue over the eigenvalue sum.
    /// All-zero eigenvalues yield all-zero occupations.
    pub fn occupation_array(&self) -> Array1<Complex64> {
        let trace: Complex64 = self.twoform.eigenvalues().iter().sum();
        if trace.norm() == 0.0 {
            return Array1::zeros(self.number_modes());
        }
        self.twoform.eigenvalues().mapv(|eigenvalue| eigenvalue / trace)
    }

    pub fn occupation(&self, mode: usize) -> Option<Complex64> {
        self.occupation_array().get(mode).copied()
    }

    pub fn occupation_all_modes(&self) -> f64 {
        self.occupation_array().iter().map(|value| value.re).sum()
    }

    /// Fetch one mode field from the backing storage.
    pub fn mode(&self, index: usize) -> AfResult<Array2<Complex64>> {
        self.twoform.vector(index)
    }

    /// First mode index at which the cumulative absolute occupation
    /// reaches `up_to_percent` percent, scanning in stored order.
    /// Returns [`MODE_SCAN_EXHAUSTED`] when the full scan falls short.
    pub fn mode_up_to_percent(&self, up_to_percent: f64) -> i64 {
        let mut perunit = 0.0_f64;
        for (index, occupation) in self.occupation_array().iter().enumerate() {
            perunit += occupation.norm();
            if 100.0 * perunit >= up_to_percent {
                return index as i64;
            }
        }
        MODE_SCAN_EXHAUSTED
    }

    /// Total intensity rebuilt from the decomposition: accumulate
    /// eigenvalue-weighted |mode|^2 over every mode, then integrate.
    /// O(modes x grid size); slow on large datasets.
    pub fn total_intensity_from_modes(&self) -> AfResult<f64> {
        let (nx, ny) = self.twoform.grid_shape();
        let mut accumulated = Array2::<Complex64>::zeros((nx, ny));

        for (index, eigenvalue) in self.twoform.eigenvalues().iter().enumerate() {
            let mode = self.twoform.vector(index)?;
            accumulated.zip_mut_with(&mode, |entry, value| {
                *entry += *eigenvalue * value.norm_sqr();
            });
        }

        Ok(accumulated.iter().map(|value| value.norm()).sum())
    }

    /// Serializable digest for tooling.
    pub fn summary(&self) -> DatasetSummary {
        let (_, nx, ny) = self.shape();
        DatasetSummary {
            source: self.source_path.display().to_string(),
            format: self.format.to_string(),
            number_modes: self.number_modes(),
            grid: (nx, ny),
            photon_energy: self.photon_energy,
            total_intensity: self.total_intensity(),
            total_intensity_from_spectral_density: self.total_intensity_from_spectral_density(),
            occupation_all_modes: self.occupation_all_modes(),
            mode_to_90_percent: self.mode_up_to_percent(90.0),
            mode_to_95_percent: self.mode_up_to_percent(95.0),
            mode_to_99_percent: self.mode_up_to_percent(99.0),
        }
    }

    /// Multi-line human-readable summary; `list_modes` adds one line
    /// per mode with its occupation and the running percentage.
    pub fn info(&self, list_modes: bool) -> AfResult<String> {
        let mut text = String::from("contains\n");
        let occupations = self.occupation_array();

        if list_modes {
            text.push_str("Occupation per mode\n");
            let mut percent = 0.0_f64;
            for (index, occupation) in occupations.iter().enumerate() {
                let occupation = occupation.norm();
                percent += occupation;
                text.push_str(&format!(
                    "{} occupation: {:e}, accumulated percent: {:12.10}\n",
                    index,
                    occupation,
                    100.0 * percent
                ));
            }
        }

        let (n_modes, nx, ny) = self.shape();
        text.push_str(&format!("{} modes\n", n_modes));
        text.push_str("on the grid\n");
        text.push_str(&format!(
            "x: from {:e} to {:e}\n",
            fold_min(self.x_coordinates()),
            fold_max(self.x_coordinates())
        ));
        text.push_str(&format!(
            "y: from {:e} to {:e}\n",
            fold_min(self.y_coordinates()),
            fold_max(self.y_coordinates())
        ));
        text.push_str(&format!("calculated at {} eV\n", self.photon_energy));
        text.push_str(&format!(
            "total intensity from spectral density: {:e}\n",
            self.total_intensity_from_spectral_density()
        ));
        text.push_str(&format!("total intensity: {:e}\n", self.total_intensity()));
        text.push_str(&format!(
            "total intensity from modes: {:e}\n",
            self.total_intensity_from_modes()?
        ));
        text.push_str(&format!(
            "Occupation of all modes: {:e}\n",
            self.occupation_all_modes()
        ));
        text.push_str(&format!(">> Shape x,y: ({}, {})\n", nx, ny));
        text.push_str(&format!(">> Shape spectral density: ({}, {})\n", nx, ny));
        for threshold in [90.0, 95.0, 99.0] {
            let index = self.mode_up_to_percent(threshold);
            if index == MODE_SCAN_EXHAUSTED {
                text.push_str(&format!(
                    "Modes index to {} percent occupancy: not reached (stored modes cover {:4.2} percent)\n",
                    threshold,
                    100.0 * occupations.iter().map(|value| value.norm()).sum::<f64>()
                ));
            } else {
                text.push_str(&format!(
                    "Modes index to {} percent occupancy: {}\n",
                    threshold, index
                ));
            }
        }

        Ok(text)
    }

    /// Release the backing handle. Idempotent; mode access on on-disk
    /// storage fails afterwards.
    pub fn close(&mut self) {
        self.twoform.release_modes();
        self.file.take();
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none() && self.format == DatasetFormat::Hdf5
    }
}

impl Drop for AfReader {
    fn drop(&mut self) {
        self.close();
    }
}

fn fold_min(values: &Array1<f64>) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &Array1<f64>) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
