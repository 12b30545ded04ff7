//! Excision of the amplifier settling transient around range changes.
//!
//! When the amplifier switches range it takes a moment to settle, and the channels
//! recorded during that moment are garbage. We find every range change and invalidate
//! the channels within a time window around it.
//!
//! Walk convention: starting next to a change, each neighbour is marked only if it lies
//! inside the window. The walk halts, without marking, at the first neighbour which is
//! outside the window or which has already been marked by an earlier change.
use bit_set::BitSet;
use bitvec::prelude::*;
use ndarray::Array1;

use super::constants::{DEFAULT_TIME_AFTER_RANGE_CHANGE, DEFAULT_TIME_BEFORE_RANGE_CHANGE};

/// Time window (seconds) invalidated around each range change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskWindow {
    pub time_before: f64,
    pub time_after: f64,
}

impl Default for MaskWindow {
    fn default() -> Self {
        Self {
            time_before: DEFAULT_TIME_BEFORE_RANGE_CHANGE,
            time_after: DEFAULT_TIME_AFTER_RANGE_CHANGE,
        }
    }
}

/// Cumulative elapsed time at the end of each channel
pub fn elapsed_time(dwell_time: &Array1<f64>) -> Array1<f64> {
    let mut total = 0.0;
    dwell_time
        .iter()
        .map(|dwell| {
            total += dwell;
            total
        })
        .collect()
}

/// Channels where the amplifier range differs from the previous channel.
///
/// The first and last channels are never reported. A channel whose range could not be
/// determined counts as a range of its own.
pub fn find_range_changes(range_id: &[Option<u8>]) -> BitSet {
    let mut changes = BitSet::with_capacity(range_id.len());
    if range_id.len() < 3 {
        return changes;
    }
    for channel in 1..(range_id.len() - 1) {
        if range_id[channel] != range_id[channel - 1] {
            changes.insert(channel);
        }
    }
    changes
}

/// Build the range change mask; a set bit marks a channel contaminated by a range change
pub fn compute_range_change_mask(
    range_id: &[Option<u8>],
    dwell_time: &Array1<f64>,
    window: &MaskWindow,
) -> BitVec {
    let n_channels = range_id.len();
    let mut mask = bitvec![0; n_channels];
    let abs_time = elapsed_time(dwell_time);
    let changes = find_range_changes(range_id);

    for channel in changes.iter() {
        mask.set(channel, true);
        let t_change = abs_time[channel];
        let t_start = t_change - window.time_before;
        let t_stop = t_change + window.time_after;

        // channels just before the change
        let mut current = channel;
        while current > 0 {
            current -= 1;
            if mask[current] || abs_time[current] < t_start {
                break;
            }
            mask.set(current, true);
        }

        // channels just after the change
        let mut current = channel + 1;
        while current < n_channels {
            if mask[current] || abs_time[current] > t_stop {
                break;
            }
            mask.set(current, true);
            current += 1;
        }
    }

    spdlog::debug!(
        "Found {} range changes, masking {} channels",
        changes.len(),
        mask.count_ones()
    );

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_range_has_no_mask() {
        let range_id = vec![Some(2); 5];
        let dwell = Array1::from_elem(5, 1.0);
        let mask = compute_range_change_mask(&range_id, &dwell, &MaskWindow::default());
        assert_eq!(mask.count_ones(), 0);
        assert_eq!(mask.len(), 5);
    }

    #[test]
    fn test_one_channel_excursion() {
        // Channel 2 switches to range 3 and back; changes at 2 and 3
        let range_id = vec![Some(2), Some(2), Some(3), Some(2), Some(2)];
        let dwell = Array1::from_elem(5, 1.0);
        let changes: Vec<usize> = find_range_changes(&range_id).iter().collect();
        assert_eq!(changes, vec![2, 3]);
        let mask = compute_range_change_mask(&range_id, &dwell, &MaskWindow::default());
        // one second channels are outside a 0.2 s / 0.3 s window
        assert_eq!(mask, bitvec![0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_window_walks_by_time() {
        // 0.125 s channels (exact in binary), one change at channel 10
        let mut range_id = vec![Some(1); 10];
        range_id.extend(vec![Some(2); 10]);
        let dwell = Array1::from_elem(20, 0.125);
        let mask = compute_range_change_mask(&range_id, &dwell, &MaskWindow::default());
        let masked: Vec<usize> = mask.iter_ones().collect();
        // t[10] = 1.375; before: t >= 1.175 keeps only channel 9 (1.25)
        // after: t <= 1.675 keeps channels 11 (1.5) and 12 (1.625)
        assert_eq!(masked, vec![9, 10, 11, 12]);
    }

    #[test]
    fn test_walk_does_not_cross_masked_channels() {
        // Adjacent changes at 5 and 6 with a wide window: the second walk stops on the first
        let range_id = vec![
            Some(0),
            Some(0),
            Some(0),
            Some(0),
            Some(0),
            Some(1),
            Some(2),
            Some(2),
            Some(2),
            Some(2),
        ];
        let dwell = Array1::from_elem(10, 1.0);
        let window = MaskWindow {
            time_before: 2.0,
            time_after: 1.0,
        };
        let mask = compute_range_change_mask(&range_id, &dwell, &window);
        // change 5: back to 3, forward to 6; change 6: already masked neighbours, forward to 7
        assert_eq!(mask, bitvec![0, 0, 0, 1, 1, 1, 1, 1, 0, 0]);

        let again = compute_range_change_mask(&range_id, &dwell, &window);
        assert_eq!(mask, again);
    }

    #[test]
    fn test_end_channels_are_not_changes() {
        let range_id = vec![Some(1), Some(2), Some(2), Some(3)];
        let changes: Vec<usize> = find_range_changes(&range_id).iter().collect();
        assert_eq!(changes, vec![1]);
        assert!(find_range_changes(&[Some(1), Some(2)]).is_empty());
        assert!(find_range_changes(&[]).is_empty());
    }

    #[test]
    fn test_unknown_range_is_a_change() {
        let range_id = vec![Some(2), Some(2), None, Some(2), Some(2)];
        let changes: Vec<usize> = find_range_changes(&range_id).iter().collect();
        assert_eq!(changes, vec![2, 3]);
    }

    #[test]
    fn test_elapsed_time() {
        let t = elapsed_time(&array![0.5, 0.25, 0.0, 1.0]);
        assert_eq!(t.to_vec(), vec![0.5, 0.75, 0.75, 1.75]);
    }
}
