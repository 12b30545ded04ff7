use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum RawDataError {
    #[error("Raw data is missing required item {0}")]
    MissingData(String),
    #[error("Raw data item {name} has {ndim} dimensions; expected 1")]
    Shape { name: String, ndim: usize },
    #[error("Raw data item {name} has length {found}; expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Could not open raw data because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Raw data failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
}

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("Scan has an invalid number of channels {0}; must be at least 1")]
    InvalidChannelCount(i64),
    #[error("Scan has an invalid wavelength {0}; must be finite and positive")]
    InvalidWavelength(f64),
}

#[derive(Debug, Clone, Error)]
pub enum CentroidError {
    #[error("Beam centroid is undefined; {0} channels contributed a usable intensity")]
    Undefined(usize),
    #[error("Supplied beam centroid {0} is not a finite angle")]
    BadOverride(f64),
}

#[derive(Debug, Error)]
pub enum ReductionError {
    #[error("Reduction failed due to scan error: {0}")]
    ScanError(#[from] ScanError),
    #[error("Reduction failed due to centroid error: {0}")]
    CentroidError(#[from] CentroidError),
}

#[derive(Debug, Error)]
pub enum HDF5WriterError {
    #[error("HDF5Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("HDF5Writer failed to build a string attribute: {0}")]
    StringError(#[from] hdf5::types::StringError),
    #[error("HDF5Writer failed to format a timestamp: {0}")]
    TimeFormatError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Config did not find any raw fly scan files in {0:?}")]
    NoMatchingFiles(PathBuf),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset failed due to raw data error: {0}")]
    RawDataError(#[from] RawDataError),
    #[error("Dataset failed due to reduction error: {0}")]
    ReductionError(#[from] ReductionError),
    #[error("Dataset failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Dataset failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
