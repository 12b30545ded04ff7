/// Frequency of the clock driving the multichannel scaler (50 MHz)
pub const PULSE_FREQUENCY: f64 = 50e6;
/// Scale factor turning the range-selector count rate into an amplifier range id
pub const RANGE_ADJUSTMENT_CONSTANT: f64 = 500.0;
/// Number of amplifier gain ranges
pub const NUMBER_OF_RANGES: usize = 5;

// Masking window around range changes; chosen by inspecting the 2013-12-09 data
pub const DEFAULT_TIME_BEFORE_RANGE_CHANGE: f64 = 0.2;
pub const DEFAULT_TIME_AFTER_RANGE_CHANGE: f64 = 0.3;

pub const DEFAULT_Q_RESOLUTION_FLOOR: f64 = 1e-6;
pub const DEFAULT_Q_FLOOR: f64 = 1e-5;
pub const DEFAULT_Q_CEILING: f64 = 1.0;
pub const DEFAULT_NUMBER_OF_BINS: usize = 500;

// Raw fly scan layout written by the acquisition program
pub const FLY_SCAN_GROUP: &str = "/entry/flyScan";
pub const METADATA_GROUP: &str = "/entry/metadata";
pub const MONOCHROMATOR_GROUP: &str = "/entry/instrument/monochromator";
pub const CLOCK_PULSES_NAME: &str = "mca1";
pub const MONITOR_COUNTS_NAME: &str = "mca2";
pub const SIGNAL_COUNTS_NAME: &str = "mca3";
pub const RANGE_COUNTS_NAME: &str = "mca4";
pub const NUM_CHANNELS_NAME: &str = "AR_pulses";
pub const ANGLE_START_NAME: &str = "AR_start";
pub const ANGLE_STEP_NAME: &str = "AR_increment";
pub const GAIN_PREFIX: &str = "upd_gain";
pub const BACKGROUND_PREFIX: &str = "upd_bkg";
pub const DETECTOR_DISTANCE_NAME: &str = "detector_distance";
pub const WAVELENGTH_NAME: &str = "DCM_wavelength";
pub const ENERGY_NAME: &str = "DCM_energy";
