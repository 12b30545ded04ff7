use ndarray::Array1;
use std::f64::consts::PI;

use super::error::{CentroidError, ReductionError, ScanError};
use super::masked::MaskedSeries;

/// Momentum transfer axis and the intensity re-exposed against it
#[derive(Debug, Clone, PartialEq)]
pub struct QProfile {
    /// Direct beam angle used as zero Q (degrees)
    pub centroid: f64,
    /// Momentum transfer (1/A); invalid too close to the direct beam
    pub q: MaskedSeries,
    /// Intensity, invalid wherever either the ratio or Q is invalid
    pub r: MaskedSeries,
}

/// Intensity weighted mean angle over the channels with a valid ratio
pub fn intensity_centroid(angle: &Array1<f64>, ratio: &MaskedSeries) -> Result<f64, CentroidError> {
    let mut weighted_sum = 0.0;
    let mut total = 0.0;
    let mut n_used = 0;
    for (channel, value) in ratio.iter_valid() {
        weighted_sum += value * angle[channel];
        total += value;
        n_used += 1;
    }
    let centroid = weighted_sum / total;
    if n_used == 0 || !centroid.is_finite() {
        return Err(CentroidError::Undefined(n_used));
    }
    Ok(centroid)
}

/// Map motor angle to momentum transfer, `Q = (4 pi / wavelength) sin(centroid - angle)`.
///
/// If `centroid_override` is given it is used as the beam centre instead of computing one.
pub fn q_transform(
    angle: &Array1<f64>,
    ratio: &MaskedSeries,
    wavelength: f64,
    centroid_override: Option<f64>,
    q_resolution_floor: f64,
) -> Result<QProfile, ReductionError> {
    if !wavelength.is_finite() || wavelength <= 0.0 {
        return Err(ScanError::InvalidWavelength(wavelength).into());
    }
    let centroid = match centroid_override {
        Some(value) if value.is_finite() => value,
        Some(value) => return Err(CentroidError::BadOverride(value).into()),
        None => intensity_centroid(angle, ratio)?,
    };

    let prefactor = 4.0 * PI / wavelength;
    let q_values = angle.mapv(|a| prefactor * (centroid - a).to_radians().sin());
    let q = MaskedSeries::from_values_where(q_values, |value| {
        value.is_finite() && value.abs() > q_resolution_floor
    });
    let r = ratio.with_union_mask(q.mask());

    Ok(QProfile { centroid, q, r })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_centroid_of_symmetric_peak() {
        let angle = array![2.0, 1.0, 0.0, -1.0, -2.0];
        let ratio = MaskedSeries::new(array![1.0, 3.0, 5.0, 3.0, 1.0]);
        let centroid = intensity_centroid(&angle, &ratio).unwrap();
        assert!(centroid.abs() < 1e-12);
    }

    #[test]
    fn test_centroid_ignores_invalid_channels() {
        let angle = array![2.0, 1.0, 0.0];
        let mut ratio = MaskedSeries::new(array![1.0, 1.0, 1.0e9]);
        ratio.invalidate(2);
        let centroid = intensity_centroid(&angle, &ratio).unwrap();
        assert!((centroid - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_undefined_without_valid_channels() {
        let angle = array![1.0, 0.0];
        let ratio = MaskedSeries::all_invalid(2);
        assert!(matches!(
            intensity_centroid(&angle, &ratio),
            Err(CentroidError::Undefined(0))
        ));
        assert!(matches!(
            q_transform(&angle, &ratio, 1.0, None, 1e-6),
            Err(ReductionError::CentroidError(CentroidError::Undefined(0)))
        ));
    }

    #[test]
    fn test_override_skips_centroid() {
        // No valid channels, but the supplied centre makes Q well defined
        let angle = array![1.0, 0.5, 0.0];
        let ratio = MaskedSeries::all_invalid(3);
        let profile = q_transform(&angle, &ratio, 1.0, Some(0.5), 1e-6).unwrap();
        assert_eq!(profile.centroid, 0.5);
        assert!(profile.q.is_valid(0));
        assert!(!profile.q.is_valid(1));
        assert_eq!(profile.r.count_valid(), 0);
        assert!(matches!(
            q_transform(&angle, &ratio, 1.0, Some(f64::NAN), 1e-6),
            Err(ReductionError::CentroidError(CentroidError::BadOverride(_)))
        ));
    }

    #[test]
    fn test_q_values_and_resolution_floor() {
        let wavelength = 1.5;
        let angle = array![0.0, -0.01, 0.01, -1e-9];
        let ratio = MaskedSeries::new(array![1.0, 1.0, 1.0, 1.0]);
        let profile = q_transform(&angle, &ratio, wavelength, Some(0.0), 1e-6).unwrap();
        // Exactly at the beam
        assert!(!profile.q.is_valid(0));
        let expected = 4.0 * PI / wavelength * (0.01_f64).to_radians().sin();
        assert!((profile.q.get(1).unwrap() - expected).abs() < 1e-15);
        // Negative side of the beam keeps its sign
        assert!((profile.q.get(2).unwrap() + expected).abs() < 1e-15);
        // Within the resolution floor
        assert!(!profile.q.is_valid(3));
        // R follows Q's mask
        assert!(!profile.r.is_valid(0) && !profile.r.is_valid(3));
        assert!(profile.r.is_valid(1) && profile.r.is_valid(2));
    }

    #[test]
    fn test_r_keeps_ratio_mask() {
        let angle = array![0.0, -0.01, -0.02];
        let mut ratio = MaskedSeries::new(array![1.0, 1.0, 1.0]);
        ratio.invalidate(2);
        let profile = q_transform(&angle, &ratio, 1.0, Some(0.0), 1e-6).unwrap();
        assert!(profile.q.is_valid(2));
        assert!(!profile.r.is_valid(2));
        assert!(profile.r.is_valid(1));
    }

    #[test]
    fn test_bad_wavelength() {
        let angle = array![0.0];
        let ratio = MaskedSeries::new(array![1.0]);
        assert!(matches!(
            q_transform(&angle, &ratio, 0.0, Some(0.0), 1e-6),
            Err(ReductionError::ScanError(ScanError::InvalidWavelength(_)))
        ));
    }
}
