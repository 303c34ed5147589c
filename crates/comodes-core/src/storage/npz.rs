//! Legacy archive-of-arrays codec. Everything, mode fields included,
//! is materialized in memory at load time.

use crate::domain::{AfError, AfResult, RawRecord, WavefrontArrays, keys};
use crate::storage::DatasetPayload;
use crate::twoform::ModeStorage;
use ndarray::{Array, Array1, Dimension, Ix1, Ix2, Ix3, OwnedRepr, arr1};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement, WritableElement};
use num_complex::Complex64;
use std::fs;
use std::path::Path;

/// Load an npz archive into a fully in-memory raw record.
pub fn load_npz(path: &Path) -> AfResult<RawRecord> {
    let file = fs::File::open(path).map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_OPEN",
            format!("failed to open npz archive '{}': {}", path.display(), source),
        )
    })?;
    let mut npz = NpzReader::new(file).map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_OPEN",
            format!("failed to parse npz archive '{}': {}", path.display(), source),
        )
    })?;

    let names = npz.names().map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_KEYS",
            format!("failed to list entries of '{}': {}", path.display(), source),
        )
    })?;
    let keys_present: Vec<String> = names
        .iter()
        .map(|name| name.strip_suffix(".npy").unwrap_or(name).to_string())
        .collect();

    let wavefront = WavefrontArrays {
        field: read_entry::<Complex64, Ix2>(&mut npz, keys::WAVEFRONT_0)?,
        range: read_entry::<f64, Ix1>(&mut npz, keys::WAVEFRONT_1)?,
        energies: read_entry::<f64, Ix1>(&mut npz, keys::WAVEFRONT_2)?,
    };

    let exit_slit_wavefront = if contains(&keys_present, keys::EXIT_SLIT_WAVEFRONT_0) {
        Some(WavefrontArrays {
            field: read_entry::<Complex64, Ix2>(&mut npz, keys::EXIT_SLIT_WAVEFRONT_0)?,
            range: read_entry::<f64, Ix1>(&mut npz, keys::EXIT_SLIT_WAVEFRONT_1)?,
            energies: read_entry::<f64, Ix1>(&mut npz, keys::EXIT_SLIT_WAVEFRONT_2)?,
        })
    } else {
        None
    };
    let weighted_fields = if contains(&keys_present, keys::WEIGHTED_FIELDS) {
        Some(read_entry::<Complex64, Ix3>(&mut npz, keys::WEIGHTED_FIELDS)?)
    } else {
        None
    };

    let modes = ModeStorage::in_memory(read_entry::<Complex64, Ix3>(
        &mut npz,
        keys::TWOFORM_MODES,
    )?);

    let info_bytes = read_entry::<u8, Ix1>(&mut npz, keys::INFO)?;
    let info = String::from_utf8_lossy(info_bytes.as_slice().unwrap_or(&[])).into_owned();

    Ok(RawRecord {
        keys: keys_present,
        sigma_matrix: read_entry::<f64, Ix1>(&mut npz, keys::SIGMA_MATRIX)?,
        undulator: read_entry::<f64, Ix1>(&mut npz, keys::UNDULATOR)?,
        detuning_parameter: read_entry::<f64, Ix1>(&mut npz, keys::DETUNING_PARAMETER)?,
        energy: read_entry::<f64, Ix1>(&mut npz, keys::ENERGY)?,
        electron_beam_energy: read_entry::<f64, Ix1>(&mut npz, keys::ELECTRON_BEAM_ENERGY)?,
        wavefront,
        exit_slit_wavefront,
        weighted_fields,
        srw_wavefront_rx: read_entry::<f64, Ix1>(&mut npz, keys::SRW_WAVEFRONT_RX)?,
        srw_wavefront_drx: read_entry::<f64, Ix1>(&mut npz, keys::SRW_WAVEFRONT_DRX)?,
        srw_wavefront_ry: read_entry::<f64, Ix1>(&mut npz, keys::SRW_WAVEFRONT_RY)?,
        srw_wavefront_dry: read_entry::<f64, Ix1>(&mut npz, keys::SRW_WAVEFRONT_DRY)?,
        sampling_factor: read_entry::<f64, Ix1>(&mut npz, keys::SAMPLING_FACTOR)?,
        minimal_size: read_entry::<f64, Ix1>(&mut npz, keys::MINIMAL_SIZE)?,
        beam_energies: read_entry::<f64, Ix1>(&mut npz, keys::BEAM_ENERGIES)?,
        static_electron_density: read_entry::<f64, Ix1>(&mut npz, keys::STATIC_ELECTRON_DENSITY)?,
        info,
        coordinates_x: read_entry::<f64, Ix1>(&mut npz, keys::TWOFORM_X)?,
        coordinates_y: read_entry::<f64, Ix1>(&mut npz, keys::TWOFORM_Y)?,
        diagonal: read_entry::<Complex64, Ix1>(&mut npz, keys::TWOFORM_DIAGONAL)?,
        eigenvalues: read_entry::<Complex64, Ix1>(&mut npz, keys::TWOFORM_EIGENVALUES)?,
        modes,
        eigenvector_errors: read_entry::<f64, Ix1>(&mut npz, keys::TWOFORM_ERRORS)?,
    })
}

/// Persist a payload as a compressed npz archive with the fixed key set.
pub fn write_npz(path: &Path, payload: &DatasetPayload) -> AfResult<()> {
    let file = fs::File::create(path).map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_CREATE",
            format!("failed to create npz archive '{}': {}", path.display(), source),
        )
    })?;
    let mut npz = NpzWriter::new_compressed(file);

    write_entry(&mut npz, keys::SIGMA_MATRIX, &payload.sigma_matrix)?;
    write_entry(&mut npz, keys::UNDULATOR, &payload.undulator)?;
    write_entry(&mut npz, keys::DETUNING_PARAMETER, &arr1(&[payload.detuning_parameter]))?;
    write_entry(&mut npz, keys::ENERGY, &arr1(&[payload.energy]))?;
    write_entry(
        &mut npz,
        keys::ELECTRON_BEAM_ENERGY,
        &arr1(&[payload.electron_beam_energy]),
    )?;

    write_entry(&mut npz, keys::WAVEFRONT_0, &payload.wavefront.field)?;
    write_entry(&mut npz, keys::WAVEFRONT_1, &payload.wavefront.range)?;
    write_entry(&mut npz, keys::WAVEFRONT_2, &payload.wavefront.energies)?;
    if let Some(exit_slit) = &payload.exit_slit_wavefront {
        write_entry(&mut npz, keys::EXIT_SLIT_WAVEFRONT_0, &exit_slit.field)?;
        write_entry(&mut npz, keys::EXIT_SLIT_WAVEFRONT_1, &exit_slit.range)?;
        write_entry(&mut npz, keys::EXIT_SLIT_WAVEFRONT_2, &exit_slit.energies)?;
    }
    if let Some(weighted_fields) = &payload.weighted_fields {
        write_entry(&mut npz, keys::WEIGHTED_FIELDS, weighted_fields)?;
    }

    write_entry(&mut npz, keys::SRW_WAVEFRONT_RX, &arr1(&[payload.srw_wavefront_rx]))?;
    write_entry(&mut npz, keys::SRW_WAVEFRONT_DRX, &arr1(&[payload.srw_wavefront_drx]))?;
    write_entry(&mut npz, keys::SRW_WAVEFRONT_RY, &arr1(&[payload.srw_wavefront_ry]))?;
    write_entry(&mut npz, keys::SRW_WAVEFRONT_DRY, &arr1(&[payload.srw_wavefront_dry]))?;
    write_entry(&mut npz, keys::SAMPLING_FACTOR, &arr1(&[payload.sampling_factor]))?;
    write_entry(&mut npz, keys::MINIMAL_SIZE, &arr1(&[payload.minimal_size]))?;
    write_entry(&mut npz, keys::BEAM_ENERGIES, &payload.beam_energies)?;
    write_entry(
        &mut npz,
        keys::STATIC_ELECTRON_DENSITY,
        &payload.static_electron_density,
    )?;

    // npz carries the info block as raw UTF-8 bytes.
    let info_bytes = Array1::from_iter(payload.info.bytes());
    write_entry(&mut npz, keys::INFO, &info_bytes)?;

    write_entry(&mut npz, keys::TWOFORM_X, &payload.coordinates_x)?;
    write_entry(&mut npz, keys::TWOFORM_Y, &payload.coordinates_y)?;
    write_entry(&mut npz, keys::TWOFORM_DIAGONAL, &payload.diagonal)?;
    write_entry(&mut npz, keys::TWOFORM_EIGENVALUES, &payload.eigenvalues)?;
    write_entry(&mut npz, keys::TWOFORM_MODES, &payload.modes)?;
    write_entry(&mut npz, keys::TWOFORM_ERRORS, &payload.eigenvector_errors)?;

    npz.finish().map(|_| ()).map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_WRITE",
            format!("failed to finish npz archive '{}': {}", path.display(), source),
        )
    })
}

fn contains(keys_present: &[String], key: &str) -> bool {
    keys_present.iter().any(|present| present == key)
}

/// Entry names may or may not carry the `.npy` suffix depending on the
/// tool that produced the archive; accept both.
fn read_entry<T, D>(npz: &mut NpzReader<fs::File>, key: &'static str) -> AfResult<Array<T, D>>
where
    T: ReadableElement,
    D: Dimension,
{
    if let Ok(array) = npz.by_name::<OwnedRepr<T>, D>(key) {
        return Ok(array);
    }
    npz.by_name::<OwnedRepr<T>, D>(&format!("{key}.npy"))
        .map_err(|source| {
            AfError::missing_key(
                "KEY.NPZ_ENTRY",
                format!("npz archive has no readable entry '{}': {}", key, source),
            )
        })
}

fn write_entry<T, D>(
    npz: &mut NpzWriter<fs::File>,
    key: &'static str,
    values: &Array<T, D>,
) -> AfResult<()>
where
    T: WritableElement,
    D: Dimension,
{
    npz.add_array(key, values).map_err(|source| {
        AfError::dataset_read(
            "IO.NPZ_WRITE",
            format!("failed to write entry '{}': {}", key, source),
        )
    })
}
