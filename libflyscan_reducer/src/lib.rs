//! # flyscan_reducer
//!
//! flyscan_reducer is the USAXS fly scan data reduction, written in Rust. It takes the raw
//! HDF5 files written by the fly scan acquisition (time-binned scaler channels recorded
//! during a continuous sweep of the analyzer angle) and reduces each of them to a
//! calibrated, rebinned scattering profile R(Q), written as an HDF5/NeXus file.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### HDF5
//!
//! Before building and running flyscan_reducer, HDF5 must be installed. Typically this will
//! be installed using a package manager (homebrew, apt, etc), and the Rust libraries will
//! auto detect the location of the HDF install. If HDF5 lives in a custom location, write
//! the following snippet into the file `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./flyscan_reducer_cli` from the
//! top level repository.
//!
//! ## Reduction
//!
//! Each raw fly scan goes through the same single pass:
//!
//! 1. [`raw_data`]: read the four scaler channels, the scan metadata and the amplifier
//!    calibration table from the raw file.
//! 2. [`angle`]: rebuild the analyzer angle of every channel from its start and step.
//! 3. [`corrector`]: classify each channel's amplifier range and convert the counts to a
//!    calibrated intensity ratio.
//! 4. [`range_mask`]: invalidate the channels around every amplifier range change.
//! 5. [`q_transform`]: find the direct beam centroid and convert angle to Q.
//! 6. [`rebin`]: average onto a logarithmic Q grid.
//!
//! Numerical trouble in a single channel (no clock pulses, a zero monitor, a negative
//! ratio) never stops a reduction; the channel is simply masked out. A reduction fails
//! only for malformed raw files or when no channel at all carries a usable intensity.
//! When reducing many files, a failure is logged and the remaining files are still
//! reduced.
//!
//! ## Configuration
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! raw_path: /data/USAXS_data/struckData
//! raw_files: []
//! output_path: /data/USAXS_data/reduced
//! combined_output: null
//! entry_name: flyScan
//! number_of_bins: 500
//! q_floor: 1.0e-5
//! q_ceiling: 1.0
//! q_resolution_floor: 1.0e-6
//! centroid: null
//! time_before_range_change: 0.2
//! time_after_range_change: 0.3
//! n_threads: 1
//! ```
//!
//! If `raw_files` is empty every `.h5` file in `raw_path` is reduced. Setting `centroid`
//! re-reduces with a previously determined beam centre instead of computing one.
//! `n_threads` workers divide the files amongst themselves. Setting `combined_output` to a
//! file name writes every scan into that one file under `output_path` instead, using a
//! single worker.
//!
//! ## Output
//!
//! Every raw file `<name>.h5` gives a reduced file `<name>_reduced.h5` (or a group in the
//! combined file):
//!
//! ```text
//! <name>_reduced.h5 - file_name, file_time, creator, HDF5_Version
//! flyScan (NXentry) - version, datasets
//! |---- <name> (NXdata) - signal=R_binned, axes=Q_binned, raw_file
//! |    |---- Q_binned, R_binned
//! |    |---- Q, R, ar, ranges, time, gain, bkg, ratio, ratio_unmasked
//! |    |---- raw_clock_pulses, raw_I0, raw_upd, raw_ranges, range_change_mask
//! |    |---- wavelength, energy, SDD, ar_centroid
//! ```
//!
//! Invalid channels are written as NaN (or -1 for `ranges`). A scan that fails while being
//! written leaves neither a partial file nor a partial group behind.
pub mod angle;
pub mod config;
pub mod constants;
pub mod corrector;
pub mod error;
pub mod hdf_writer;
pub mod masked;
pub mod process;
pub mod q_transform;
pub mod range_mask;
pub mod raw_data;
pub mod rebin;
pub mod reduction;
pub mod worker_status;
