use comodes_core::reader::{AfReader, MODE_SCAN_EXHAUSTED};
use comodes_core::storage::{self, DatasetPayload};
use comodes_core::{DatasetFormat, WavefrontArrays};
use ndarray::{Array1, Array2, Array3, arr1};
use num_complex::Complex64;
use std::path::PathBuf;
use tempfile::TempDir;

const N_MODES: usize = 30;
const NX: usize = 12;
const NY: usize = 10;

/// Synthetic 30-mode decomposition with geometrically decaying
/// eigenvalues, sized like a small production run.
fn fixture_payload() -> DatasetPayload {
    let eigenvalues = Array1::from_shape_fn(N_MODES, |mode| {
        Complex64::new(0.5_f64.powi(mode as i32), 0.0)
    });
    let modes = Array3::from_shape_fn((N_MODES, NX, NY), |(mode, i, j)| {
        Complex64::new(
            ((mode + 1) * (i + 1)) as f64 * 1.0e-3,
            (j as f64 - 4.5) * 1.0e-4,
        )
    });
    let diagonal = Array1::from_shape_fn(NX * NY, |index| {
        Complex64::new(1.0 + (index % 7) as f64, 0.01 * index as f64)
    });

    DatasetPayload {
        sigma_matrix: arr1(&[2.0e-9, 0.0, 0.0, 1.0e-11]),
        undulator: arr1(&[1.68, 0.018, 111.0]),
        detuning_parameter: 0.0,
        energy: 8200.0,
        electron_beam_energy: 6.04,
        wavefront: WavefrontArrays {
            field: Array2::from_shape_fn((NX, NY), |(i, j)| {
                Complex64::new(i as f64 + 1.0, j as f64 * 0.5)
            }),
            range: arr1(&[-1.0e-4, 1.0e-4, -5.0e-5, 5.0e-5]),
            energies: arr1(&[8200.0]),
        },
        exit_slit_wavefront: None,
        weighted_fields: None,
        srw_wavefront_rx: 9.1,
        srw_wavefront_drx: 0.05,
        srw_wavefront_ry: 15.3,
        srw_wavefront_dry: 0.08,
        sampling_factor: 1.0,
        minimal_size: 2.5e-7,
        beam_energies: arr1(&[6.03, 6.04, 6.05]),
        static_electron_density: Array1::from_elem(NX * NY, 0.125),
        info: "calculation: u18_2m\nphoton energy: 8200 eV\n".to_string(),
        coordinates_x: Array1::linspace(-1.0e-4, 1.0e-4, NX),
        coordinates_y: Array1::linspace(-5.0e-5, 5.0e-5, NY),
        diagonal,
        eigenvalues,
        modes,
        eigenvector_errors: Array1::from_elem(N_MODES, 3.0e-10),
    }
}

fn staged_dataset(temp: &TempDir, file_name: &str) -> PathBuf {
    let path = temp.path().join(file_name);
    storage::write(&path, &fixture_payload()).expect("fixture dataset should be written");
    path
}

fn assert_readers_agree(h5: &AfReader, npz: &AfReader) {
    assert_eq!(h5.shape(), npz.shape(), "shapes should match across formats");
    assert_eq!(
        h5.eigenvalues(),
        npz.eigenvalues(),
        "eigenvalues should match across formats"
    );
    assert_eq!(h5.x_coordinates(), npz.x_coordinates());
    assert_eq!(h5.y_coordinates(), npz.y_coordinates());
    assert_eq!(h5.spectral_density(), npz.spectral_density());
    assert_eq!(
        h5.reference_electron_density(),
        npz.reference_electron_density(),
        "reference electron density should match across formats"
    );
    assert_eq!(
        h5.reference_undulator_radiation(),
        npz.reference_undulator_radiation(),
        "reference wavefront intensity should match across formats"
    );
    assert_eq!(h5.photon_energy(), npz.photon_energy());
    assert_eq!(h5.electron_beam_energy(), npz.electron_beam_energy());
    assert_eq!(h5.sampling(), npz.sampling());
    assert_eq!(h5.sigma_matrix(), npz.sigma_matrix());
    assert_eq!(h5.undulator(), npz.undulator());
    assert_eq!(h5.info_block(), npz.info_block());

    let tolerance = 1.0e-12;
    assert!((h5.total_intensity() - npz.total_intensity()).abs() < tolerance);
    assert!(
        (h5.total_intensity_from_spectral_density()
            - npz.total_intensity_from_spectral_density())
        .abs()
            < tolerance
    );

    let probe_mode = 25;
    let from_h5 = h5.mode(probe_mode).expect("h5 mode fetch should succeed");
    let from_npz = npz.mode(probe_mode).expect("npz mode fetch should succeed");
    assert_eq!(from_h5.dim(), (NX, NY));
    assert_eq!(from_h5, from_npz, "mode {probe_mode} should match across formats");
}

#[test]
fn h5_and_npz_renditions_of_one_dataset_read_identically() {
    let temp = TempDir::new().expect("tempdir should be created");
    let h5 = AfReader::open(staged_dataset(&temp, "fixture.h5"))
        .expect("h5 fixture should load");
    let npz = AfReader::open(staged_dataset(&temp, "fixture.npz"))
        .expect("npz fixture should load");

    assert_readers_agree(&h5, &npz);
}

#[test]
fn reader_reconstructs_the_full_descriptor() {
    let temp = TempDir::new().expect("tempdir should be created");
    let reader = AfReader::open(staged_dataset(&temp, "fixture.h5"))
        .expect("h5 fixture should load");

    assert_eq!(reader.format(), DatasetFormat::Hdf5);
    assert_eq!(reader.shape(), (N_MODES, NX, NY));
    assert_eq!(reader.number_modes(), N_MODES);
    assert_eq!(reader.sigma_matrix().dimension(), 2);
    assert_eq!(reader.undulator().number_of_periods, 111.0);
    assert_eq!(reader.photon_energy(), 8200.0);
    assert_eq!(reader.beam_energies().len(), 3);
    assert_eq!(reader.reference_electron_density().len(), NX * NY);
    assert_eq!(reader.reference_undulator_radiation().dim(), (NX, NY));
    assert_eq!(reader.info_block().get("calculation"), Some("u18_2m"));
    assert!(reader.keys().iter().any(|key| key == "twoform_4"));

    // Optional entries were absent: exit slit falls back, fields stay empty.
    assert_eq!(reader.exit_slit_wavefront(), reader.reference_wavefront());
    assert!(reader.weighted_fields().is_none());
}

#[test]
fn occupation_scan_behaves_like_the_stored_decomposition() {
    let temp = TempDir::new().expect("tempdir should be created");
    let reader = AfReader::open(staged_dataset(&temp, "fixture.npz"))
        .expect("npz fixture should load");

    let occupations = reader.occupation_array();
    assert_eq!(occupations.len(), N_MODES);
    assert!((reader.occupation_all_modes() - 1.0).abs() < 1.0e-12);

    // Geometric eigenvalues: mode 0 already holds half the trace.
    assert_eq!(reader.mode_up_to_percent(50.0), 0);
    assert_eq!(reader.mode_up_to_percent(75.0), 1);
    assert_eq!(reader.mode_up_to_percent(99.0), 6);
    assert_eq!(reader.mode_up_to_percent(100.1), MODE_SCAN_EXHAUSTED);

    let mut previous = i64::MIN;
    for threshold in [10.0, 50.0, 75.0, 90.0, 99.0, 99.9] {
        let index = reader.mode_up_to_percent(threshold);
        assert!(index >= previous, "scan index must grow with the threshold");
        previous = index;
    }
}

#[test]
fn intensity_totals_agree_between_diagonal_and_modes() {
    let temp = TempDir::new().expect("tempdir should be created");
    let reader = AfReader::open(staged_dataset(&temp, "fixture.h5"))
        .expect("h5 fixture should load");

    assert!(reader.total_intensity() >= 0.0);
    assert!(reader.total_intensity_from_spectral_density() >= 0.0);

    let from_modes = reader
        .total_intensity_from_modes()
        .expect("every stored mode should be fetchable");
    assert!(from_modes >= 0.0);
}

#[test]
fn info_rendering_covers_the_dataset_digest() {
    let temp = TempDir::new().expect("tempdir should be created");
    let reader = AfReader::open(staged_dataset(&temp, "fixture.h5"))
        .expect("h5 fixture should load");

    let text = reader.info(true).expect("info should render");
    assert!(text.contains(&format!("{} modes", N_MODES)));
    assert!(text.contains("calculated at 8200 eV"));
    assert!(text.contains(&format!(">> Shape x,y: ({}, {})", NX, NY)));
    assert!(text.contains("accumulated percent"));
}

#[test]
fn closing_an_h5_reader_makes_mode_access_fail_deterministically() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut reader = AfReader::open(staged_dataset(&temp, "fixture.h5"))
        .expect("h5 fixture should load");

    assert!(reader.mode(0).is_ok(), "open reader should serve modes");
    reader.close();
    reader.close();

    assert!(reader.is_closed());
    let error = reader.mode(0).expect_err("closed reader must refuse mode access");
    assert_eq!(error.exit_code(), 6, "mode access failures use their own exit code");

    // Scalar queries keep working from the materialized record.
    assert_eq!(reader.shape(), (N_MODES, NX, NY));
    assert!((reader.occupation_all_modes() - 1.0).abs() < 1.0e-12);
}

#[test]
fn optional_entries_round_trip_when_present() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut payload = fixture_payload();
    payload.exit_slit_wavefront = Some(WavefrontArrays {
        field: Array2::from_elem((NX, NY), Complex64::new(0.5, 0.0)),
        range: arr1(&[-2.0e-4, 2.0e-4, -1.0e-4, 1.0e-4]),
        energies: arr1(&[8200.0]),
    });
    payload.weighted_fields = Some(Array3::from_elem(
        (2, NX, NY),
        Complex64::new(1.0, -1.0),
    ));

    for file_name in ["optional.h5", "optional.npz"] {
        let path = temp.path().join(file_name);
        storage::write(&path, &payload).expect("dataset with optionals should be written");
        let reader = AfReader::open(&path).expect("dataset with optionals should load");

        assert_ne!(
            reader.exit_slit_wavefront(),
            reader.reference_wavefront(),
            "stored exit-slit wavefront must not fall back ({file_name})"
        );
        let weighted = reader
            .weighted_fields()
            .expect("stored weighted fields must survive the round trip");
        assert_eq!(weighted.dim(), (2, NX, NY));
    }
}

#[test]
fn unknown_extensions_are_rejected_up_front() {
    let error = AfReader::open("dataset.json").expect_err("json is not a dataset format");
    assert_eq!(error.exit_code(), 2);

    let missing = AfReader::open("no_such_dataset.h5").expect_err("missing files must not load");
    assert_eq!(missing.exit_code(), 3);
}
