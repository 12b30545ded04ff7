use hdf5::types::VarLenUnicode;
use hdf5::{File, Group, H5Type, Location};
use ndarray::{Array1, ArrayView1};
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::error::HDF5WriterError;
use super::raw_data::RawFlyScan;
use super::reduction::ReducedDataset;

const Q_BINNED_NAME: &str = "Q_binned";
const R_BINNED_NAME: &str = "R_binned";

/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// A simple struct which wraps around the hdf5-rust library.
///
/// Opens an HDF5 file for writing reduced fly scans in the NeXus layout. Each reduced
/// scan becomes one NXdata group inside a single NXentry.
#[derive(Debug)]
pub struct HDFWriter {
    file_handle: File,
    entry_group: Group,
    datasets_written: u32,
}
// Structure
// <file> - file_name, file_time, creator, HDF5_Version
// <entry> (NXentry) - version, datasets
// |---- <scan name> (NXdata) - signal, axes, raw_file
// |    |---- Q_binned, R_binned
// |    |---- Q, R, ar, ranges, time, gain, bkg, ratio, ratio_unmasked
// |    |---- raw_clock_pulses, raw_I0, raw_upd, raw_ranges, range_change_mask
// |    |---- wavelength, energy, SDD, ar_centroid

impl HDFWriter {
    /// Create the writer, opening a file at path and creating the entry group
    pub fn new(path: &Path, entry_name: &str) -> Result<Self, HDF5WriterError> {
        let file_handle = File::create(path)?;
        let creator = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);
        let file_time = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let (major, minor, patch) = hdf5::library_version();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        write_string_attr(&file_handle, "file_name", &file_name)?;
        write_string_attr(&file_handle, "file_time", &file_time)?;
        write_string_attr(&file_handle, "creator", &creator)?;
        write_string_attr(
            &file_handle,
            "HDF5_Version",
            &format!("{major}.{minor}.{patch}"),
        )?;

        let entry_group = file_handle.create_group(entry_name)?;
        write_string_attr(&entry_group, "NX_class", "NXentry")?;
        write_string_attr(&entry_group, "version", &creator)?;
        entry_group.new_attr::<u32>().create("datasets")?;

        Ok(Self {
            file_handle,
            entry_group,
            datasets_written: 0,
        })
    }

    /// Write one reduced fly scan as an NXdata group named after the raw scan.
    ///
    /// A group that fails partway is unlinked again, so the entry only ever holds
    /// complete scans.
    pub fn write_reduction(
        &mut self,
        raw: &RawFlyScan,
        reduced: &ReducedDataset,
    ) -> Result<(), HDF5WriterError> {
        let group = self.entry_group.create_group(&raw.name)?;
        if let Err(e) = write_nxdata(&group, raw, reduced) {
            if let Err(unlink_err) = self.entry_group.unlink(&raw.name) {
                spdlog::warn!("Could not remove incomplete group {}: {}", raw.name, unlink_err);
            }
            return Err(e);
        }
        self.datasets_written += 1;
        Ok(())
    }

    pub fn datasets_written(&self) -> u32 {
        self.datasets_written
    }

    /// Write the dataset count, consume the writer
    pub fn close(self) -> Result<(), HDF5WriterError> {
        self.entry_group
            .attr("datasets")?
            .write_scalar(&self.datasets_written)?;
        spdlog::info!(
            "{} reduced scans written to {}.",
            self.datasets_written,
            self.file_handle.filename()
        );
        Ok(())
    }
}

fn write_nxdata(
    group: &Group,
    raw: &RawFlyScan,
    reduced: &ReducedDataset,
) -> Result<(), HDF5WriterError> {
    write_string_attr(group, "NX_class", "NXdata")?;
    write_string_attr(group, "raw_file", &raw.path.to_string_lossy())?;
    write_string_attr(group, "signal", R_BINNED_NAME)?;
    write_string_attr(group, "axes", Q_BINNED_NAME)?;

    // The binned profile is the primary signal
    write_dataset(
        group,
        Q_BINNED_NAME,
        ArrayView1::from(&reduced.binned.q),
        Some("1/A"),
    )?;
    let r_binned = write_dataset(
        group,
        R_BINNED_NAME,
        ArrayView1::from(&reduced.binned.r),
        Some("a.u."),
    )?;
    r_binned
        .new_attr::<i32>()
        .create("signal")?
        .write_scalar(&1)?;
    write_string_attr(&r_binned, "axes", Q_BINNED_NAME)?;

    // Unbinned and per-channel diagnostics; invalid channels are written as NaN
    let q_profile = &reduced.q_profile;
    let corrected = &reduced.corrected;
    write_dataset(group, "Q", q_profile.q.filled(f64::NAN).view(), Some("1/A"))?;
    write_dataset(group, "R", q_profile.r.filled(f64::NAN).view(), Some("a.u."))?;
    write_dataset(group, "ar", reduced.angle.view(), Some("degrees"))?;
    let ranges: Array1<i32> = corrected
        .range_id
        .iter()
        .map(|range| range.map_or(-1, i32::from))
        .collect();
    write_dataset(group, "ranges", ranges.view(), None)?;
    write_dataset(group, "time", corrected.dwell_time.view(), Some("s"))?;
    write_dataset(group, "gain", corrected.gain.filled(f64::NAN).view(), Some("V/A"))?;
    write_dataset(
        group,
        "bkg",
        corrected.background.filled(f64::NAN).view(),
        Some("counts"),
    )?;
    write_dataset(group, "ratio", reduced.ratio.filled(f64::NAN).view(), Some("a.u."))?;
    write_dataset(
        group,
        "ratio_unmasked",
        corrected.ratio.filled(f64::NAN).view(),
        Some("a.u."),
    )?;
    let mask: Array1<u8> = reduced
        .range_change_mask
        .iter()
        .by_vals()
        .map(u8::from)
        .collect();
    write_dataset(group, "range_change_mask", mask.view(), None)?;

    let channels = &raw.channels;
    write_dataset(group, "raw_clock_pulses", channels.clock_pulses().view(), Some("counts"))?;
    write_dataset(group, "raw_I0", channels.monitor_counts().view(), Some("counts"))?;
    write_dataset(group, "raw_upd", channels.signal_counts().view(), Some("counts"))?;
    write_dataset(group, "raw_ranges", channels.range_counts().view(), Some("counts"))?;

    let metadata = channels.metadata();
    write_dataset(group, "wavelength", ArrayView1::from(&[metadata.wavelength]), Some("A"))?;
    write_dataset(group, "energy", ArrayView1::from(&[metadata.energy]), Some("keV"))?;
    write_dataset(
        group,
        "SDD",
        ArrayView1::from(&[metadata.detector_distance]),
        Some("mm"),
    )?;
    write_dataset(
        group,
        "ar_centroid",
        ArrayView1::from(&[q_profile.centroid]),
        Some("degrees"),
    )?;

    Ok(())
}

fn write_string_attr(location: &Location, name: &str, value: &str) -> Result<(), HDF5WriterError> {
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&VarLenUnicode::from_str(value)?)?;
    Ok(())
}

fn write_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    data: ArrayView1<'_, T>,
    units: Option<&str>,
) -> Result<hdf5::Dataset, HDF5WriterError> {
    let dataset = group.new_dataset_builder().with_data(data).create(name)?;
    if let Some(units) = units {
        write_string_attr(&dataset, "units", units)?;
    }
    Ok(dataset)
}
