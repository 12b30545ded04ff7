use hdf5::File;
use ndarray::Array1;
use std::path::{Path, PathBuf};

use super::constants::*;
use super::error::RawDataError;

/// Scalar scan information recorded alongside the channel arrays
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMetadata {
    /// Number of channels as declared by the acquisition program
    pub num_channels: i64,
    /// Motor angle of the first channel (degrees)
    pub angle_start: f64,
    /// Angle decrement per channel (degrees)
    pub angle_step: f64,
    /// Photon wavelength (Angstroms)
    pub wavelength: f64,
    /// Photon energy (keV)
    pub energy: f64,
    /// Sample to detector distance (mm)
    pub detector_distance: f64,
}

/// Per-range amplifier gains (V/A) and background count rates (counts/s)
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    pub gain: [f64; NUMBER_OF_RANGES],
    pub background_rate: [f64; NUMBER_OF_RANGES],
}

/// The four time-binned scaler channels of a fly scan. Immutable once built.
///
/// All four arrays are guaranteed to have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChannelSet {
    clock_pulses: Array1<f64>,
    monitor_counts: Array1<f64>,
    signal_counts: Array1<f64>,
    range_counts: Array1<f64>,
    metadata: ScanMetadata,
}

impl RawChannelSet {
    /// Build a channel set, checking that the arrays agree with each other and with the
    /// declared channel count. A non-positive declared count is left for the angle axis to
    /// reject.
    pub fn new(
        clock_pulses: Array1<f64>,
        monitor_counts: Array1<f64>,
        signal_counts: Array1<f64>,
        range_counts: Array1<f64>,
        metadata: ScanMetadata,
    ) -> Result<Self, RawDataError> {
        let expected = clock_pulses.len();
        for (name, array) in [
            (MONITOR_COUNTS_NAME, &monitor_counts),
            (SIGNAL_COUNTS_NAME, &signal_counts),
            (RANGE_COUNTS_NAME, &range_counts),
        ] {
            if array.len() != expected {
                return Err(RawDataError::LengthMismatch {
                    name: name.to_string(),
                    expected,
                    found: array.len(),
                });
            }
        }
        if metadata.num_channels > 0 && metadata.num_channels as usize != expected {
            return Err(RawDataError::LengthMismatch {
                name: NUM_CHANNELS_NAME.to_string(),
                expected: metadata.num_channels as usize,
                found: expected,
            });
        }
        Ok(Self {
            clock_pulses,
            monitor_counts,
            signal_counts,
            range_counts,
            metadata,
        })
    }

    pub fn len(&self) -> usize {
        self.clock_pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clock_pulses.is_empty()
    }

    pub fn clock_pulses(&self) -> &Array1<f64> {
        &self.clock_pulses
    }

    pub fn monitor_counts(&self) -> &Array1<f64> {
        &self.monitor_counts
    }

    pub fn signal_counts(&self) -> &Array1<f64> {
        &self.signal_counts
    }

    pub fn range_counts(&self) -> &Array1<f64> {
        &self.range_counts
    }

    pub fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }
}

/// Everything the reduction needs from one raw fly scan file
#[derive(Debug, Clone)]
pub struct RawFlyScan {
    pub name: String,
    pub path: PathBuf,
    pub channels: RawChannelSet,
    pub calibration: CalibrationTable,
}

impl RawFlyScan {
    /// Read a raw fly scan HDF5 file. The file is closed before returning.
    pub fn read(path: &Path) -> Result<Self, RawDataError> {
        if !path.exists() {
            return Err(RawDataError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();

        let scan_item = |item: &str| format!("{FLY_SCAN_GROUP}/{item}");
        let meta_item = |item: &str| format!("{METADATA_GROUP}/{item}");
        let mono_item = |item: &str| format!("{MONOCHROMATOR_GROUP}/{item}");

        let metadata = ScanMetadata {
            num_channels: read_scalar::<i64>(&file, &scan_item(NUM_CHANNELS_NAME))?,
            angle_start: read_scalar::<f64>(&file, &scan_item(ANGLE_START_NAME))?,
            angle_step: read_scalar::<f64>(&file, &scan_item(ANGLE_STEP_NAME))?,
            wavelength: read_scalar::<f64>(&file, &mono_item(WAVELENGTH_NAME))?,
            energy: read_scalar::<f64>(&file, &mono_item(ENERGY_NAME))?,
            detector_distance: read_scalar::<f64>(&file, &meta_item(DETECTOR_DISTANCE_NAME))?,
        };

        let channels = RawChannelSet::new(
            read_array(&file, &scan_item(CLOCK_PULSES_NAME))?,
            read_array(&file, &scan_item(MONITOR_COUNTS_NAME))?,
            read_array(&file, &scan_item(SIGNAL_COUNTS_NAME))?,
            read_array(&file, &scan_item(RANGE_COUNTS_NAME))?,
            metadata,
        )?;

        let mut calibration = CalibrationTable {
            gain: [0.0; NUMBER_OF_RANGES],
            background_rate: [0.0; NUMBER_OF_RANGES],
        };
        for range in 0..NUMBER_OF_RANGES {
            calibration.gain[range] =
                read_scalar::<f64>(&file, &meta_item(&format!("{GAIN_PREFIX}{range}")))?;
            calibration.background_rate[range] =
                read_scalar::<f64>(&file, &meta_item(&format!("{BACKGROUND_PREFIX}{range}")))?;
        }

        spdlog::info!(
            "Loaded {} channels from {}",
            channels.len(),
            path.to_string_lossy()
        );

        Ok(Self {
            name,
            path: path.to_path_buf(),
            channels,
            calibration,
        })
    }
}

/// Open a dataset, insisting that it exists and has at most one dimension
fn open_dataset(file: &File, item: &str) -> Result<hdf5::Dataset, RawDataError> {
    if !file.link_exists(item) {
        return Err(RawDataError::MissingData(item.to_string()));
    }
    let dataset = file.dataset(item)?;
    if dataset.ndim() > 1 {
        return Err(RawDataError::Shape {
            name: item.to_string(),
            ndim: dataset.ndim(),
        });
    }
    Ok(dataset)
}

/// Read a channel array. Rank-0 datasets are not channel arrays.
fn read_array(file: &File, item: &str) -> Result<Array1<f64>, RawDataError> {
    let dataset = open_dataset(file, item)?;
    if dataset.ndim() != 1 {
        return Err(RawDataError::Shape {
            name: item.to_string(),
            ndim: dataset.ndim(),
        });
    }
    Ok(Array1::from_vec(dataset.read_raw::<f64>()?))
}

/// Read a scalar, which the acquisition program may store either as a true scalar or
/// as a one element array
fn read_scalar<T: hdf5::H5Type + Copy>(file: &File, item: &str) -> Result<T, RawDataError> {
    let dataset = open_dataset(file, item)?;
    dataset
        .read_raw::<T>()?
        .first()
        .copied()
        .ok_or_else(|| RawDataError::MissingData(item.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::array;

    pub(crate) fn test_metadata(num_channels: i64) -> ScanMetadata {
        ScanMetadata {
            num_channels,
            angle_start: 10.0,
            angle_step: 0.001,
            wavelength: 1.0,
            energy: 12.4,
            detector_distance: 500.0,
        }
    }

    /// Write a raw fly scan file in the acquisition layout
    pub(crate) fn write_raw_file(
        path: &Path,
        clock: &[f64],
        monitor: &[f64],
        signal: &[f64],
        ranges: &[f64],
    ) -> hdf5::Result<()> {
        let file = File::create(path)?;
        let entry = file.create_group("entry")?;
        let fly = entry.create_group("flyScan")?;
        let meta = entry.create_group("metadata")?;
        let mono = entry
            .create_group("instrument")?
            .create_group("monochromator")?;

        fly.new_dataset_builder().with_data(clock).create("mca1")?;
        fly.new_dataset_builder().with_data(monitor).create("mca2")?;
        fly.new_dataset_builder().with_data(signal).create("mca3")?;
        fly.new_dataset_builder().with_data(ranges).create("mca4")?;
        fly.new_dataset_builder()
            .with_data(&[clock.len() as i64])
            .create("AR_pulses")?;
        fly.new_dataset_builder()
            .with_data(&[10.0_f64])
            .create("AR_start")?;
        fly.new_dataset_builder()
            .with_data(&[0.001_f64])
            .create("AR_increment")?;
        let gains = [1.0e4, 1.0e6, 1.0e8, 1.0e10, 1.0e12];
        let backgrounds = [0.5, 1.0, 2.0, 4.0, 8.0];
        for range in 0..NUMBER_OF_RANGES {
            meta.new_dataset_builder()
                .with_data(&[gains[range]])
                .create(format!("upd_gain{range}").as_str())?;
            meta.new_dataset_builder()
                .with_data(&[backgrounds[range]])
                .create(format!("upd_bkg{range}").as_str())?;
        }
        meta.new_dataset_builder()
            .with_data(&[500.0_f64])
            .create("detector_distance")?;
        mono.new_dataset_builder()
            .with_data(&[1.0_f64])
            .create("DCM_wavelength")?;
        mono.new_dataset_builder()
            .with_data(&[12.4_f64])
            .create("DCM_energy")?;
        Ok(())
    }

    #[test]
    fn test_mismatched_lengths() {
        let result = RawChannelSet::new(
            array![1.0, 2.0, 3.0],
            array![1.0, 2.0, 3.0],
            array![1.0, 2.0],
            array![1.0, 2.0, 3.0],
            test_metadata(3),
        );
        match result {
            Err(RawDataError::LengthMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            _ => panic!("expected a length mismatch"),
        }
    }

    #[test]
    fn test_declared_count_disagrees() {
        let result = RawChannelSet::new(
            array![1.0, 2.0],
            array![1.0, 2.0],
            array![1.0, 2.0],
            array![1.0, 2.0],
            test_metadata(4),
        );
        assert!(matches!(result, Err(RawDataError::LengthMismatch { .. })));
    }

    #[test]
    fn test_read_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Blank_20_1386638201.h5");
        let clock = [5e7, 5e7, 5e7];
        let monitor = [1000.0, 1001.0, 1002.0];
        let signal = [100.0, 101.0, 102.0];
        let ranges = [2e5, 2e5, 2e5];
        write_raw_file(&path, &clock, &monitor, &signal, &ranges).unwrap();

        let raw = RawFlyScan::read(&path).unwrap();
        assert_eq!(raw.name, "Blank_20_1386638201");
        assert_eq!(raw.channels.len(), 3);
        assert_eq!(raw.channels.monitor_counts()[1], 1001.0);
        assert_eq!(raw.channels.metadata().num_channels, 3);
        assert_eq!(raw.channels.metadata().angle_start, 10.0);
        assert_eq!(raw.calibration.gain[3], 1.0e10);
        assert_eq!(raw.calibration.background_rate[4], 8.0);
    }

    #[test]
    fn test_missing_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.h5");
        {
            let file = File::create(&path).unwrap();
            file.create_group("entry").unwrap();
        }
        match RawFlyScan::read(&path) {
            Err(RawDataError::MissingData(item)) => assert!(item.starts_with("/entry/")),
            other => panic!("expected missing data, got {other:?}"),
        }
    }

    #[test]
    fn test_two_dimensional_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_d.h5");
        write_raw_file(&path, &[5e7], &[1.0], &[1.0], &[1.0]).unwrap();
        {
            let file = File::open_rw(&path).unwrap();
            let fly = file.group("/entry/flyScan").unwrap();
            fly.unlink("mca3").unwrap();
            fly.new_dataset_builder()
                .with_data(&ndarray::Array2::<f64>::zeros([1, 2]))
                .create("mca3")
                .unwrap();
        }
        assert!(matches!(
            RawFlyScan::read(&path),
            Err(RawDataError::Shape { ndim: 2, .. })
        ));
    }

    /// Replace one item of the flyScan group in an existing raw file
    fn rewrite_fly_item<F>(path: &Path, item: &str, create: F)
    where
        F: FnOnce(&hdf5::Group) -> hdf5::Result<hdf5::Dataset>,
    {
        let file = File::open_rw(path).unwrap();
        let fly = file.group("/entry/flyScan").unwrap();
        fly.unlink(item).unwrap();
        create(&fly).unwrap();
    }

    #[test]
    fn test_rank_zero_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.h5");
        write_raw_file(&path, &[5e7, 5e7], &[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]).unwrap();
        rewrite_fly_item(&path, "AR_start", |fly| {
            let dataset = fly.new_dataset::<f64>().create("AR_start")?;
            dataset.write_scalar(&12.5)?;
            Ok(dataset)
        });
        let raw = RawFlyScan::read(&path).unwrap();
        assert_eq!(raw.channels.metadata().angle_start, 12.5);
        assert_eq!(raw.channels.metadata().angle_step, 0.001);
    }

    #[test]
    fn test_empty_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.h5");
        write_raw_file(&path, &[5e7], &[1.0], &[1.0], &[1.0]).unwrap();
        rewrite_fly_item(&path, "AR_increment", |fly| {
            fly.new_dataset::<f64>().shape(0).create("AR_increment")
        });
        match RawFlyScan::read(&path) {
            Err(RawDataError::MissingData(item)) => {
                assert_eq!(item, "/entry/flyScan/AR_increment")
            }
            other => panic!("expected missing data, got {other:?}"),
        }
    }

    #[test]
    fn test_rank_zero_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rank_zero.h5");
        write_raw_file(&path, &[5e7], &[1.0], &[1.0], &[1.0]).unwrap();
        rewrite_fly_item(&path, "mca2", |fly| {
            let dataset = fly.new_dataset::<f64>().create("mca2")?;
            dataset.write_scalar(&1.0)?;
            Ok(dataset)
        });
        assert!(matches!(
            RawFlyScan::read(&path),
            Err(RawDataError::Shape { ndim: 0, .. })
        ));
    }

    #[test]
    fn test_nonexistent_file() {
        let path = PathBuf::from("/definitely/not/here.h5");
        assert!(matches!(
            RawFlyScan::read(&path),
            Err(RawDataError::BadFilePath(_))
        ));
    }
}
