//! Amplifier range classification and gain/background correction.
//!
//! Every division in this module is allowed to produce NaN or infinity. Such results are
//! never treated as errors; the affected channel is flagged invalid in the returned
//! [`MaskedSeries`] and drops out of everything downstream.
use ndarray::Array1;

use super::constants::{NUMBER_OF_RANGES, PULSE_FREQUENCY, RANGE_ADJUSTMENT_CONSTANT};
use super::masked::MaskedSeries;
use super::raw_data::{CalibrationTable, RawChannelSet};

/// Per-channel output of the range and gain correction
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedChannels {
    /// Amplifier range of each channel; None where it could not be determined
    pub range_id: Vec<Option<u8>>,
    /// Seconds spent in each channel
    pub dwell_time: Array1<f64>,
    /// Amplifier gain of each channel (V/A)
    pub gain: MaskedSeries,
    /// Expected background counts accumulated in each channel
    pub background: MaskedSeries,
    /// Calibrated intensity ratio, before any range change masking
    pub ratio: MaskedSeries,
}

/// Classify a channel's amplifier range from the range-selector count rate.
///
/// Returns None when the clock count is zero or the result does not name one of the five
/// ranges.
pub fn classify_range(range_counts: f64, clock_pulses: f64) -> Option<u8> {
    let range = (RANGE_ADJUSTMENT_CONSTANT * range_counts / clock_pulses).round();
    if range.is_finite() && range >= 0.0 && range < NUMBER_OF_RANGES as f64 {
        Some(range as u8)
    } else {
        None
    }
}

/// Convert raw counts into the calibrated intensity ratio
/// `(signal - background) / monitor / gain`.
pub fn correct_channels(raw: &RawChannelSet, calibration: &CalibrationTable) -> CorrectedChannels {
    let n_channels = raw.len();
    let clock = raw.clock_pulses();

    let range_id: Vec<Option<u8>> = clock
        .iter()
        .zip(raw.range_counts().iter())
        .map(|(pulses, counts)| classify_range(*counts, *pulses))
        .collect();
    let dwell_time = clock.mapv(|pulses| pulses / PULSE_FREQUENCY);

    let mut gain = MaskedSeries::all_invalid(n_channels);
    let mut background = MaskedSeries::all_invalid(n_channels);
    let mut ratio = MaskedSeries::all_invalid(n_channels);
    for (channel, range) in range_id.iter().enumerate() {
        let Some(range) = range else {
            continue;
        };
        let range = *range as usize;
        let channel_gain = calibration.gain[range];
        let channel_background = dwell_time[channel] * calibration.background_rate[range];
        gain.set(channel, channel_gain);
        background.set(channel, channel_background);

        let value = (raw.signal_counts()[channel] - channel_background)
            / raw.monitor_counts()[channel]
            / channel_gain;
        if value.is_finite() && value > 0.0 {
            ratio.set(channel, value);
        }
    }

    let n_unusable = n_channels - ratio.count_valid();
    if n_unusable > 0 {
        spdlog::debug!(
            "{} of {} channels have no usable intensity ratio",
            n_unusable,
            n_channels
        );
    }

    CorrectedChannels {
        range_id,
        dwell_time,
        gain,
        background,
        ratio,
    }
}
