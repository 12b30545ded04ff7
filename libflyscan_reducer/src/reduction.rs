use bitvec::prelude::*;
use ndarray::Array1;

use super::angle::build_angle_axis;
use super::constants::*;
use super::corrector::{correct_channels, CorrectedChannels};
use super::error::ReductionError;
use super::masked::MaskedSeries;
use super::q_transform::{q_transform, QProfile};
use super::range_mask::{compute_range_change_mask, MaskWindow};
use super::raw_data::{CalibrationTable, RawChannelSet};
use super::rebin::{rebin, BinnedProfile, RebinSettings};

/// Everything that controls a reduction apart from the raw data itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionParameters {
    pub rebin: RebinSettings,
    /// |Q| at or below this is too close to the direct beam to use (1/A)
    pub q_resolution_floor: f64,
    /// Previously determined beam centre (degrees); computed from the data if None
    pub centroid: Option<f64>,
    pub range_change_window: MaskWindow,
}

impl Default for ReductionParameters {
    fn default() -> Self {
        Self {
            rebin: RebinSettings {
                number_of_bins: DEFAULT_NUMBER_OF_BINS,
                q_floor: Some(DEFAULT_Q_FLOOR),
                q_ceiling: Some(DEFAULT_Q_CEILING),
            },
            q_resolution_floor: DEFAULT_Q_RESOLUTION_FLOOR,
            centroid: None,
            range_change_window: MaskWindow::default(),
        }
    }
}

/// The result of reducing one fly scan, including every intermediate series
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedDataset {
    /// Motor angle of each channel (degrees)
    pub angle: Array1<f64>,
    pub corrected: CorrectedChannels,
    pub range_change_mask: BitVec,
    /// Calibrated ratio with the range change mask applied
    pub ratio: MaskedSeries,
    pub q_profile: QProfile,
    pub binned: BinnedProfile,
}

/// Run the full reduction of one fly scan:
/// angle axis, range and gain correction, range change masking, Q transform, rebinning.
pub fn reduce(
    raw: &RawChannelSet,
    calibration: &CalibrationTable,
    parameters: &ReductionParameters,
) -> Result<ReducedDataset, ReductionError> {
    let metadata = raw.metadata();
    let angle = build_angle_axis(
        metadata.angle_start,
        metadata.angle_step,
        metadata.num_channels,
    )?;

    let corrected = correct_channels(raw, calibration);
    let range_change_mask = compute_range_change_mask(
        &corrected.range_id,
        &corrected.dwell_time,
        &parameters.range_change_window,
    );
    let ratio = corrected.ratio.with_union_mask(&range_change_mask);

    let q_profile = q_transform(
        &angle,
        &ratio,
        metadata.wavelength,
        parameters.centroid,
        parameters.q_resolution_floor,
    )?;
    let binned = rebin(&q_profile.q, &q_profile.r, &parameters.rebin);

    spdlog::info!(
        "Reduced {} channels ({} usable) to {} bins; beam centroid at {} degrees",
        raw.len(),
        q_profile.r.count_valid(),
        binned.len(),
        q_profile.centroid
    );

    Ok(ReducedDataset {
        angle,
        corrected,
        range_change_mask,
        ratio,
        q_profile,
        binned,
    })
}
