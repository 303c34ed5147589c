//! HDF5 codec. Loading keeps the container open so mode fields can be
//! fetched lazily; every other entry is materialized up front.

use crate::domain::{AfError, AfResult, RawRecord, WavefrontArrays, keys};
use crate::storage::DatasetPayload;
use crate::twoform::ModeStorage;
use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use ndarray::{Array1, Array2, Array3, Ix3, arr1};
use num_complex::Complex64;
use std::path::Path;
use std::str::FromStr;

/// Open an HDF5 container and load the raw record. The returned file
/// handle backs the lazy mode dataset and must stay alive for as long
/// as modes are fetched.
pub fn load_h5(path: &Path) -> AfResult<(RawRecord, File)> {
    let file = File::open(path).map_err(|source| {
        AfError::dataset_read(
            "IO.H5_OPEN",
            format!("failed to open h5 container '{}': {}", path.display(), source),
        )
    })?;

    let keys_present = file.member_names().map_err(|source| {
        AfError::dataset_read(
            "IO.H5_KEYS",
            format!("failed to list entries of '{}': {}", path.display(), source),
        )
    })?;

    let wavefront = WavefrontArrays {
        field: read_c128_2d(&file, keys::WAVEFRONT_0)?,
        range: read_f64_1d(&file, keys::WAVEFRONT_1)?,
        energies: read_f64_1d(&file, keys::WAVEFRONT_2)?,
    };

    // Optional entries resolve here, never during later queries.
    let exit_slit_wavefront = if file.link_exists(keys::EXIT_SLIT_WAVEFRONT_0) {
        Some(WavefrontArrays {
            field: read_c128_2d(&file, keys::EXIT_SLIT_WAVEFRONT_0)?,
            range: read_f64_1d(&file, keys::EXIT_SLIT_WAVEFRONT_1)?,
            energies: read_f64_1d(&file, keys::EXIT_SLIT_WAVEFRONT_2)?,
        })
    } else {
        None
    };
    let weighted_fields = if file.link_exists(keys::WEIGHTED_FIELDS) {
        Some(read_c128_3d(&file, keys::WEIGHTED_FIELDS)?)
    } else {
        None
    };

    // The bulk mode array is referenced, not read.
    let modes_dataset = file.dataset(keys::TWOFORM_MODES).map_err(|source| {
        missing_entry(keys::TWOFORM_MODES, &source)
    })?;
    let modes = ModeStorage::on_disk(modes_dataset)?;

    let record = RawRecord {
        keys: keys_present,
        sigma_matrix: read_f64_1d(&file, keys::SIGMA_MATRIX)?,
        undulator: read_f64_1d(&file, keys::UNDULATOR)?,
        detuning_parameter: read_f64_1d(&file, keys::DETUNING_PARAMETER)?,
        energy: read_f64_1d(&file, keys::ENERGY)?,
        electron_beam_energy: read_f64_1d(&file, keys::ELECTRON_BEAM_ENERGY)?,
        wavefront,
        exit_slit_wavefront,
        weighted_fields,
        srw_wavefront_rx: read_f64_1d(&file, keys::SRW_WAVEFRONT_RX)?,
        srw_wavefront_drx: read_f64_1d(&file, keys::SRW_WAVEFRONT_DRX)?,
        srw_wavefront_ry: read_f64_1d(&file, keys::SRW_WAVEFRONT_RY)?,
        srw_wavefront_dry: read_f64_1d(&file, keys::SRW_WAVEFRONT_DRY)?,
        sampling_factor: read_f64_1d(&file, keys::SAMPLING_FACTOR)?,
        minimal_size: read_f64_1d(&file, keys::MINIMAL_SIZE)?,
        beam_energies: read_f64_1d(&file, keys::BEAM_ENERGIES)?,
        static_electron_density: read_f64_1d(&file, keys::STATIC_ELECTRON_DENSITY)?,
        info: read_text(&file, keys::INFO)?,
        coordinates_x: read_f64_1d(&file, keys::TWOFORM_X)?,
        coordinates_y: read_f64_1d(&file, keys::TWOFORM_Y)?,
        diagonal: read_c128_1d(&file, keys::TWOFORM_DIAGONAL)?,
        eigenvalues: read_c128_1d(&file, keys::TWOFORM_EIGENVALUES)?,
        modes,
        eigenvector_errors: read_f64_1d(&file, keys::TWOFORM_ERRORS)?,
    };

    Ok((record, file))
}

/// Persist a payload as an HDF5 container with the fixed key set.
pub fn write_h5(path: &Path, payload: &DatasetPayload) -> AfResult<()> {
    let file = File::create(path).map_err(|source| {
        AfError::dataset_read(
            "IO.H5_CREATE",
            format!("failed to create h5 container '{}': {}", path.display(), source),
        )
    })?;

    write_f64_1d(&file, keys::SIGMA_MATRIX, &payload.sigma_matrix)?;
    write_f64_1d(&file, keys::UNDULATOR, &payload.undulator)?;
    write_f64_1d(&file, keys::DETUNING_PARAMETER, &arr1(&[payload.detuning_parameter]))?;
    write_f64_1d(&file, keys::ENERGY, &arr1(&[payload.energy]))?;
    write_f64_1d(
        &file,
        keys::ELECTRON_BEAM_ENERGY,
        &arr1(&[payload.electron_beam_energy]),
    )?;

    write_wavefront(
        &file,
        &payload.wavefront,
        keys::WAVEFRONT_0,
        keys::WAVEFRONT_1,
        keys::WAVEFRONT_2,
    )?;
    if let Some(exit_slit) = &payload.exit_slit_wavefront {
        write_wavefront(
            &file,
            exit_slit,
            keys::EXIT_SLIT_WAVEFRONT_0,
            keys::EXIT_SLIT_WAVEFRONT_1,
            keys::EXIT_SLIT_WAVEFRONT_2,
        )?;
    }
    if let Some(weighted_fields) = &payload.weighted_fields {
        write_array(&file, keys::WEIGHTED_FIELDS, weighted_fields.view())?;
    }

    write_f64_1d(&file, keys::SRW_WAVEFRONT_RX, &arr1(&[payload.srw_wavefront_rx]))?;
    write_f64_1d(&file, keys::SRW_WAVEFRONT_DRX, &arr1(&[payload.srw_wavefront_drx]))?;
    write_f64_1d(&file, keys::SRW_WAVEFRONT_RY, &arr1(&[payload.srw_wavefront_ry]))?;
    write_f64_1d(&file, keys::SRW_WAVEFRONT_DRY, &arr1(&[payload.srw_wavefront_dry]))?;
    write_f64_1d(&file, keys::SAMPLING_FACTOR, &arr1(&[payload.sampling_factor]))?;
    write_f64_1d(&file, keys::MINIMAL_SIZE, &arr1(&[payload.minimal_size]))?;
    write_f64_1d(&file, keys::BEAM_ENERGIES, &payload.beam_energies)?;
    write_f64_1d(
        &file,
        keys::STATIC_ELECTRON_DENSITY,
        &payload.static_electron_density,
    )?;
    write_text(&file, keys::INFO, &payload.info)?;

    write_f64_1d(&file, keys::TWOFORM_X, &payload.coordinates_x)?;
    write_f64_1d(&file, keys::TWOFORM_Y, &payload.coordinates_y)?;
    write_array(&file, keys::TWOFORM_DIAGONAL, payload.diagonal.view())?;
    write_array(&file, keys::TWOFORM_EIGENVALUES, payload.eigenvalues.view())?;
    write_array(&file, keys::TWOFORM_MODES, payload.modes.view())?;
    write_f64_1d(&file, keys::TWOFORM_ERRORS, &payload.eigenvector_errors)?;

    Ok(())
}

fn missing_entry(key: &str, source: &hdf5::Error) -> AfError {
    AfError::missing_key(
        "KEY.H5_ENTRY",
        format!("h5 container has no readable entry '{}': {}", key, source),
    )
}

fn read_f64_1d(group: &Group, key: &'static str) -> AfResult<Array1<f64>> {
    group
        .dataset(key)
        .and_then(|dataset| dataset.read_1d::<f64>())
        .map_err(|source| missing_entry(key, &source))
}

fn read_c128_1d(group: &Group, key: &'static str) -> AfResult<Array1<Complex64>> {
    group
        .dataset(key)
        .and_then(|dataset| dataset.read_1d::<Complex64>())
        .map_err(|source| missing_entry(key, &source))
}

fn read_c128_2d(group: &Group, key: &'static str) -> AfResult<Array2<Complex64>> {
    group
        .dataset(key)
        .and_then(|dataset| dataset.read_2d::<Complex64>())
        .map_err(|source| missing_entry(key, &source))
}

fn read_c128_3d(group: &Group, key: &'static str) -> AfResult<Array3<Complex64>> {
    let dynamic = group
        .dataset(key)
        .and_then(|dataset| dataset.read_dyn::<Complex64>())
        .map_err(|source| missing_entry(key, &source))?;
    dynamic.into_dimensionality::<Ix3>().map_err(|source| {
        AfError::shape_mismatch(
            "SHAPE.H5_ENTRY",
            format!("entry '{}' is not a 3-dimensional stack: {}", key, source),
        )
    })
}

fn read_text(group: &Group, key: &'static str) -> AfResult<String> {
    group
        .dataset(key)
        .and_then(|dataset| dataset.read_scalar::<VarLenUnicode>())
        .map(|value| value.to_string())
        .map_err(|source| missing_entry(key, &source))
}

fn write_f64_1d(group: &Group, key: &'static str, values: &Array1<f64>) -> AfResult<()> {
    write_array(group, key, values.view())
}

fn write_array<'a, T, D>(
    group: &Group,
    key: &'static str,
    values: ndarray::ArrayView<'a, T, D>,
) -> AfResult<()>
where
    T: hdf5::H5Type,
    D: ndarray::Dimension,
{
    group
        .new_dataset_builder()
        .with_data(values)
        .create(key)
        .map(|_| ())
        .map_err(|source| {
            AfError::dataset_read(
                "IO.H5_WRITE",
                format!("failed to write entry '{}': {}", key, source),
            )
        })
}

fn write_wavefront(
    group: &Group,
    wavefront: &WavefrontArrays,
    field_key: &'static str,
    range_key: &'static str,
    energies_key: &'static str,
) -> AfResult<()> {
    write_array(group, field_key, wavefront.field.view())?;
    write_f64_1d(group, range_key, &wavefront.range)?;
    write_f64_1d(group, energies_key, &wavefront.energies)
}

fn write_text(group: &Group, key: &'static str, text: &str) -> AfResult<()> {
    let value = VarLenUnicode::from_str(text).map_err(|source| {
        AfError::dataset_read(
            "IO.H5_WRITE",
            format!("info text is not storable as variable-length unicode: {}", source),
        )
    })?;
    group
        .new_dataset::<VarLenUnicode>()
        .create(key)
        .and_then(|dataset| dataset.write_scalar(&value))
        .map_err(|source| {
            AfError::dataset_read(
                "IO.H5_WRITE",
                format!("failed to write entry '{}': {}", key, source),
            )
        })
}
