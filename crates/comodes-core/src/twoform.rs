//! Correlation-function decomposition: coordinate grids, diagonal,
//! eigenvalues, and lazily fetched mode fields.

use crate::domain::{AfError, AfResult};
use hdf5::Dataset;
use ndarray::{Array1, Array2, Array3, s};
use num_complex::Complex64;

/// Backing storage for the per-mode eigenvector fields.
///
/// Modes are the bulk of a dataset and are never materialized eagerly
/// from HDF5; the variant records where a single mode can be fetched
/// from by index.
#[derive(Debug)]
pub enum ModeStorage {
    /// Still-open HDF5 dataset, read one mode slice at a time. The
    /// handle is `None` once the reader has been closed.
    OnDisk {
        dataset: Option<Dataset>,
        shape: (usize, usize, usize),
    },
    /// Fully materialized stack `(n_modes, nx, ny)`.
    InMemory { vectors: Array3<Complex64> },
}

impl ModeStorage {
    pub fn on_disk(dataset: Dataset) -> AfResult<Self> {
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(AfError::shape_mismatch(
                "SHAPE.MODE_DATASET",
                format!(
                    "mode dataset must be 3-dimensional (modes, nx, ny); found {} dimensions",
                    shape.len()
                ),
            ));
        }
        Ok(Self::OnDisk {
            dataset: Some(dataset),
            shape: (shape[0], shape[1], shape[2]),
        })
    }

    pub fn in_memory(vectors: Array3<Complex64>) -> Self {
        Self::InMemory { vectors }
    }

    /// Leading dimension of the stored mode stack.
    pub fn mode_count(&self) -> usize {
        match self {
            Self::OnDisk { shape, .. } => shape.0,
            Self::InMemory { vectors } => vectors.shape()[0],
        }
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        match self {
            Self::OnDisk { shape, .. } => (shape.1, shape.2),
            Self::InMemory { vectors } => (vectors.shape()[1], vectors.shape()[2]),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OnDisk { .. } => "h5 dataset",
            Self::InMemory { .. } => "in-memory stack",
        }
    }

    /// Fetch one mode field as a `(nx, ny)` complex grid.
    pub fn fetch(&self, index: usize) -> AfResult<Array2<Complex64>> {
        let count = self.mode_count();
        if index >= count {
            return Err(AfError::mode_access(
                "MODE.INDEX_RANGE",
                format!(
                    "mode index {} out of range for {} with {} modes",
                    index,
                    self.kind(),
                    count
                ),
            ));
        }

        match self {
            Self::OnDisk { dataset, .. } => {
                let dataset = dataset.as_ref().ok_or_else(|| {
                    AfError::mode_access(
                        "MODE.H5_CLOSED",
                        format!("mode {} requested after the h5 backing handle was closed", index),
                    )
                })?;
                dataset
                    .read_slice_2d::<Complex64, _>(s![index, .., ..])
                    .map_err(|source| {
                        AfError::mode_access(
                            "MODE.H5_FETCH",
                            format!("failed to read mode {} from h5 dataset: {}", index, source),
                        )
                    })
            }
            Self::InMemory { vectors } => Ok(vectors.slice(s![index, .., ..]).to_owned()),
        }
    }

    /// Drop the on-disk dataset handle. In-memory storage is unaffected.
    pub fn release(&mut self) {
        if let Self::OnDisk { dataset, .. } = self {
            dataset.take();
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self, Self::OnDisk { dataset: None, .. })
    }
}

/// Decomposition of the spatial correlation function: eigenvalues paired
/// with the x/y coordinate grid and the diagonal (intensity) elements.
#[derive(Debug)]
pub struct Twoform {
    x_coordinates: Array1<f64>,
    y_coordinates: Array1<f64>,
    diagonal: Array1<Complex64>,
    eigenvalues: Array1<Complex64>,
    modes: ModeStorage,
    eigenvector_errors: Option<Array1<f64>>,
}

impl Twoform {
    /// Build the decomposition, checking the structural invariants:
    /// the grid flattens onto the diagonal and every eigenvalue has a
    /// stored mode field.
    pub fn new(
        x_coordinates: Array1<f64>,
        y_coordinates: Array1<f64>,
        diagonal: Array1<Complex64>,
        eigenvalues: Array1<Complex64>,
        modes: ModeStorage,
    ) -> AfResult<Self> {
        let grid_points = x_coordinates.len() * y_coordinates.len();
        if grid_points != diagonal.len() {
            return Err(AfError::shape_mismatch(
                "SHAPE.TWOFORM_GRID",
                format!(
                    "coordinate grid {}x{} does not flatten onto diagonal of length {}",
                    x_coordinates.len(),
                    y_coordinates.len(),
                    diagonal.len()
                ),
            ));
        }
        if eigenvalues.len() != modes.mode_count() {
            return Err(AfError::shape_mismatch(
                "SHAPE.TWOFORM_MODES",
                format!(
                    "{} eigenvalues but {} stored mode fields",
                    eigenvalues.len(),
                    modes.mode_count()
                ),
            ));
        }

        Ok(Self {
            x_coordinates,
            y_coordinates,
            diagonal,
            eigenvalues,
            modes,
            eigenvector_errors: None,
        })
    }

    pub fn x_coordinates(&self) -> &Array1<f64> {
        &self.x_coordinates
    }

    pub fn y_coordinates(&self) -> &Array1<f64> {
        &self.y_coordinates
    }

    pub fn diagonal(&self) -> &Array1<Complex64> {
        &self.diagonal
    }

    pub fn eigenvalues(&self) -> &Array1<Complex64> {
        &self.eigenvalues
    }

    pub fn eigenvalue(&self, mode: usize) -> Option<Complex64> {
        self.eigenvalues.get(mode).copied()
    }

    pub fn number_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        (self.x_coordinates.len(), self.y_coordinates.len())
    }

    pub fn set_eigenvector_errors(&mut self, errors: Array1<f64>) {
        self.eigenvector_errors = Some(errors);
    }

    pub fn eigenvector_errors(&self) -> Option<&Array1<f64>> {
        self.eigenvector_errors.as_ref()
    }

    pub fn mode_storage(&self) -> &ModeStorage {
        &self.modes
    }

    /// Fetch the mode field at `index` from the backing storage.
    pub fn vector(&self, index: usize) -> AfResult<Array2<Complex64>> {
        self.modes.fetch(index)
    }

    pub fn release_modes(&mut self) {
        self.modes.release();
    }
}

#[cfg(test)]
mod tests {
    use super::{ModeStorage, Twoform};
    use crate::domain::AfErrorCategory;
    use ndarray::{Array1, Array3, arr1};
    use num_complex::Complex64;

    fn memory_modes(n_modes: usize, nx: usize, ny: usize) -> ModeStorage {
        let vectors = Array3::from_shape_fn((n_modes, nx, ny), |(m, i, j)| {
            Complex64::new((m * 100 + i * 10 + j) as f64, -(m as f64))
        });
        ModeStorage::in_memory(vectors)
    }

    fn eigenvalues(n: usize) -> Array1<Complex64> {
        Array1::from_shape_fn(n, |m| Complex64::new(1.0 / (m + 1) as f64, 0.0))
    }

    #[test]
    fn construction_checks_grid_flattening_invariant() {
        let error = Twoform::new(
            arr1(&[0.0, 1.0, 2.0]),
            arr1(&[0.0, 1.0]),
            Array1::zeros(5),
            eigenvalues(4),
            memory_modes(4, 3, 2),
        )
        .expect_err("5 diagonal elements cannot cover a 3x2 grid");
        assert_eq!(error.category(), AfErrorCategory::ShapeMismatch);
        assert_eq!(error.placeholder(), "SHAPE.TWOFORM_GRID");
    }

    #[test]
    fn construction_checks_eigenvalue_mode_pairing() {
        let error = Twoform::new(
            arr1(&[0.0, 1.0, 2.0]),
            arr1(&[0.0, 1.0]),
            Array1::zeros(6),
            eigenvalues(5),
            memory_modes(4, 3, 2),
        )
        .expect_err("5 eigenvalues cannot pair with 4 mode fields");
        assert_eq!(error.placeholder(), "SHAPE.TWOFORM_MODES");
    }

    #[test]
    fn in_memory_fetch_returns_grid_shaped_mode() {
        let twoform = Twoform::new(
            arr1(&[0.0, 1.0, 2.0]),
            arr1(&[0.0, 1.0]),
            Array1::zeros(6),
            eigenvalues(4),
            memory_modes(4, 3, 2),
        )
        .unwrap();

        let mode = twoform.vector(2).expect("mode 2 should exist");
        assert_eq!(mode.dim(), (3, 2));
        assert_eq!(mode[[1, 1]], Complex64::new(211.0, -2.0));
    }

    #[test]
    fn out_of_range_fetch_names_the_storage_kind() {
        let storage = memory_modes(4, 3, 2);
        let error = storage.fetch(4).expect_err("index 4 of 4 should fail");
        assert_eq!(error.category(), AfErrorCategory::ModeAccess);
        assert!(error.message().contains("in-memory stack"));
    }

    #[test]
    fn release_is_a_no_op_for_in_memory_storage() {
        let mut storage = memory_modes(2, 2, 2);
        storage.release();
        assert!(!storage.is_released());
        assert!(storage.fetch(1).is_ok());
    }
}
