use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::config::Config;
use super::error::{DatasetError, HDF5WriterError, ProcessorError};
use super::hdf_writer::HDFWriter;
use super::raw_data::RawFlyScan;
use super::reduction::{reduce, ReducedDataset};
use super::worker_status::{BarColor, WorkerStatus};

/// Tally of a worker's datasets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSummary {
    pub reduced: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl ProcessSummary {
    pub fn merge(&mut self, other: ProcessSummary) {
        self.reduced.extend(other.reduced);
        self.failed.extend(other.failed);
    }
}

/// Read and reduce a single raw fly scan file
pub fn reduce_file(
    config: &Config,
    raw_file: &Path,
) -> Result<(RawFlyScan, ReducedDataset), DatasetError> {
    let raw = RawFlyScan::read(raw_file)?;
    let reduced = reduce(&raw.channels, &raw.calibration, &config.reduction_parameters())?;
    Ok((raw, reduced))
}

/// Reduce a single raw fly scan file and write the reduced file.
///
/// The raw file is closed once it has been read; the output file is closed when the
/// writer is consumed. If writing fails the partial output file is removed. Returns the
/// reduced data and the path of the written file.
pub fn process_dataset(
    config: &Config,
    raw_file: &Path,
) -> Result<(ReducedDataset, PathBuf), DatasetError> {
    let (raw, reduced) = reduce_file(config, raw_file)?;

    let output_path = config.get_output_file_name(raw_file)?;
    if let Err(e) = write_reduced_file(&output_path, &config.entry_name, &raw, &reduced) {
        if output_path.exists() {
            if let Err(remove_err) = std::fs::remove_file(&output_path) {
                spdlog::warn!(
                    "Could not remove partial output {}: {}",
                    output_path.to_string_lossy(),
                    remove_err
                );
            }
        }
        return Err(e.into());
    }
    Ok((reduced, output_path))
}

fn write_reduced_file(
    path: &Path,
    entry_name: &str,
    raw: &RawFlyScan,
    reduced: &ReducedDataset,
) -> Result<(), HDF5WriterError> {
    let mut writer = HDFWriter::new(path, entry_name)?;
    writer.write_reduction(raw, reduced)?;
    writer.close()
}

/// Run a worker's datasets in order, reporting progress before and after each one.
///
/// A dataset that fails is logged and skipped; the remaining datasets are still reduced.
/// Only a failure to report progress stops the worker.
fn run_datasets<F>(
    tx: &Sender<WorkerStatus>,
    worker_id: usize,
    subset: &[PathBuf],
    mut handle_dataset: F,
) -> Result<ProcessSummary, ProcessorError>
where
    F: FnMut(&Path) -> Result<(usize, String), DatasetError>,
{
    let mut summary = ProcessSummary::default();
    let n_files = subset.len();
    for (idx, raw_file) in subset.iter().enumerate() {
        let name = raw_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let size = raw_file.metadata().map(|meta| meta.len()).unwrap_or(0);
        spdlog::info!(
            "Reducing {} ({})...",
            name,
            human_bytes::human_bytes(size as f64)
        );
        tx.send(WorkerStatus::new(
            idx as f32 / n_files as f32,
            &name,
            worker_id,
            BarColor::CYAN,
        ))?;

        let color = match handle_dataset(raw_file) {
            Ok((n_bins, destination)) => {
                spdlog::info!("Finished {}: {} bins written to {}", name, n_bins, destination);
                summary.reduced.push(raw_file.clone());
                BarColor::GREEN
            }
            Err(e) => {
                spdlog::error!("Failed to reduce {}: {}", name, e);
                spdlog::warn!("Skipping {} and continuing with the remaining datasets.", name);
                summary.failed.push(raw_file.clone());
                BarColor::RED
            }
        };
        tx.send(WorkerStatus::new(
            (idx + 1) as f32 / n_files as f32,
            &name,
            worker_id,
            color,
        ))?;
    }
    Ok(summary)
}

/// Reduce a list of raw files in order, writing one reduced file per raw file.
///
/// A dataset that fails is logged and skipped; the remaining datasets are still reduced.
/// Only a failure to report progress stops the worker.
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<PathBuf>,
) -> Result<ProcessSummary, ProcessorError> {
    run_datasets(&tx, worker_id, &subset, |raw_file| {
        let (reduced, output_path) = process_dataset(&config, raw_file)?;
        Ok((reduced.binned.len(), output_path.to_string_lossy().to_string()))
    })
}

/// Reduce a list of raw files in order, writing every scan as its own NXdata group in a
/// single output file.
///
/// Failed scans leave no group behind. The output file itself must be creatable,
/// otherwise the worker stops.
pub fn process_combined(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<PathBuf>,
) -> Result<ProcessSummary, ProcessorError> {
    let output_path = match config.get_combined_output_file_name()? {
        Some(path) => path,
        None => return process_subset(config, tx, worker_id, subset),
    };
    let mut writer = HDFWriter::new(&output_path, &config.entry_name)?;
    let destination = output_path.to_string_lossy().to_string();
    let summary = run_datasets(&tx, worker_id, &subset, |raw_file| {
        let (raw, reduced) = reduce_file(&config, raw_file)?;
        writer.write_reduction(&raw, &reduced)?;
        Ok((reduced.binned.len(), destination.clone()))
    })?;
    writer.close()?;
    Ok(summary)
}

/// The function to be called by a separate thread.
/// Reduces every configured raw file with a single worker, into one combined file if the
/// config asks for one.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<ProcessSummary, ProcessorError> {
    config.validate()?;
    let files = config.get_raw_files()?;
    spdlog::info!("Found {} raw fly scans.", files.len());
    if config.combined_output.is_some() {
        process_combined(config, tx, 0, files)
    } else {
        process_subset(config, tx, 0, files)
    }
}

/// Divide the raw files in to a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config, files: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let n_subsets = config.n_threads.max(1) as usize;
    let mut subsets: Vec<Vec<PathBuf>> = vec![Vec::new(); n_subsets];

    for (idx, file) in files.iter().enumerate() {
        subsets[idx % n_subsets].push(file.clone())
    }

    subsets
}
