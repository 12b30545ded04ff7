use ndarray::Array1;

use super::error::ScanError;

/// Reconstruct the motor angle of every channel from the linear start/step model.
///
/// The scan runs backwards, so a positive step gives a decreasing axis:
/// `angle[i] = angle_start - i * angle_step`.
pub fn build_angle_axis(
    angle_start: f64,
    angle_step: f64,
    num_channels: i64,
) -> Result<Array1<f64>, ScanError> {
    if num_channels <= 0 {
        return Err(ScanError::InvalidChannelCount(num_channels));
    }
    Ok(Array1::from_shape_fn(num_channels as usize, |i| {
        angle_start - (i as f64) * angle_step
    }))
}
