use super::CliError;
use comodes_core::reader::{AfReader, MODE_SCAN_EXHAUSTED};
use std::path::Path;
use tracing::{debug, warn};

pub(super) fn run_info_command(dataset: &Path, list_modes: bool) -> Result<i32, CliError> {
    let reader = open_reader(dataset)?;
    print!("File {} ", dataset.display());
    print!("{}", reader.info(list_modes)?);
    Ok(0)
}

pub(super) fn run_summary_command(dataset: &Path) -> Result<i32, CliError> {
    let reader = open_reader(dataset)?;
    let rendered =
        serde_json::to_string_pretty(&reader.summary()).map_err(anyhow::Error::from)?;
    println!("{}", rendered);
    Ok(0)
}

pub(super) fn run_occupation_command(
    dataset: &Path,
    up_to_percent: Option<f64>,
) -> Result<i32, CliError> {
    let reader = open_reader(dataset)?;

    if let Some(threshold) = up_to_percent {
        let index = reader.mode_up_to_percent(threshold);
        if index == MODE_SCAN_EXHAUSTED {
            warn!(
                threshold,
                "stored modes do not reach the requested occupancy"
            );
        }
        println!("{}", index);
        return Ok(0);
    }

    let mut cumulative = 0.0_f64;
    for (index, occupation) in reader.occupation_array().iter().enumerate() {
        let occupation = occupation.norm();
        cumulative += occupation;
        println!("{} {:e} {:12.10}", index, occupation, 100.0 * cumulative);
    }
    Ok(0)
}

pub(super) fn run_mode_command(dataset: &Path, index: usize) -> Result<i32, CliError> {
    let reader = open_reader(dataset)?;
    let mode = reader.mode(index)?;

    let (nx, ny) = mode.dim();
    let max_modulus = mode
        .iter()
        .map(|value| value.norm())
        .fold(0.0_f64, f64::max);
    let integrated_intensity: f64 = mode.iter().map(|value| value.norm_sqr()).sum();

    println!("mode {}", index);
    println!("shape: ({}, {})", nx, ny);
    if let Some(eigenvalue) = reader.eigenvalue(index) {
        println!("eigenvalue: {:e} + {:e}i", eigenvalue.re, eigenvalue.im);
    }
    if let Some(occupation) = reader.occupation(index) {
        println!("occupation: {:e}", occupation.norm());
    }
    println!("max modulus: {:e}", max_modulus);
    println!("integrated intensity: {:e}", integrated_intensity);
    Ok(0)
}

fn open_reader(dataset: &Path) -> Result<AfReader, CliError> {
    debug!(path = %dataset.display(), "loading dataset");
    let reader = AfReader::open(dataset)?;
    debug!(
        modes = reader.number_modes(),
        format = %reader.format(),
        "dataset loaded"
    );
    Ok(reader)
}
