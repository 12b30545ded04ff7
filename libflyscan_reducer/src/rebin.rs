//! Resampling of the irregular R(Q) series onto a logarithmic Q grid.
//!
//! Bin `k` (for `1 <= k < M`) collects the samples with `edge[k-1] <= Q < edge[k]`, that is
//! every sample whose first strictly greater edge is `edge[k]`. Samples below the first edge
//! or at/above the last edge belong to no bin. Each emitted bin is labelled by the
//! geometric centre of its two edges.
use super::masked::MaskedSeries;

/// The reduced, rebinned intensity profile. Ascending in Q.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinnedProfile {
    pub q: Vec<f64>,
    pub r: Vec<f64>,
}

impl BinnedProfile {
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}

/// Rebinning controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebinSettings {
    pub number_of_bins: usize,
    pub q_floor: Option<f64>,
    pub q_ceiling: Option<f64>,
}

/// `number_of_bins` edges spaced uniformly in log(Q) from `q_low` to `q_high`.
///
/// The end edges are exactly `q_low` and `q_high`.
pub fn log_bin_edges(q_low: f64, q_high: f64, number_of_bins: usize) -> Vec<f64> {
    match number_of_bins {
        0 => vec![],
        1 => vec![q_low],
        _ => {
            let log_low = q_low.ln();
            let step = (q_high.ln() - log_low) / (number_of_bins - 1) as f64;
            let mut edges: Vec<f64> = (0..number_of_bins)
                .map(|k| (log_low + step * k as f64).exp())
                .collect();
            edges[0] = q_low;
            edges[number_of_bins - 1] = q_high;
            edges
        }
    }
}

/// Average the valid (Q, R) samples with positive Q into logarithmic bins.
///
/// Only bins which received at least one sample and whose mean is finite and positive
/// are emitted, so the profile may be shorter than the requested bin count.
pub fn rebin(q: &MaskedSeries, r: &MaskedSeries, settings: &RebinSettings) -> BinnedProfile {
    let samples: Vec<(f64, f64)> = q
        .iter_valid()
        .filter(|(_, q_value)| *q_value > 0.0)
        .filter_map(|(channel, q_value)| r.get(channel).map(|r_value| (q_value, r_value)))
        .collect();
    if samples.is_empty() || settings.number_of_bins < 2 {
        return BinnedProfile::default();
    }

    let (sample_min, sample_max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), (q_value, _)| {
            (low.min(*q_value), high.max(*q_value))
        });
    let q_low = settings.q_floor.map_or(sample_min, |floor| floor.max(sample_min));
    let q_high = settings
        .q_ceiling
        .map_or(sample_max, |ceiling| ceiling.min(sample_max));
    if !(q_low > 0.0 && q_low < q_high) {
        spdlog::warn!(
            "Empty rebinning range [{}, {}]; no binned profile produced",
            q_low,
            q_high
        );
        return BinnedProfile::default();
    }

    let n_bins = settings.number_of_bins;
    let edges = log_bin_edges(q_low, q_high, n_bins);
    let mut sums = vec![0.0; n_bins];
    let mut counts = vec![0_usize; n_bins];
    for (q_value, r_value) in samples {
        let bin = edges.partition_point(|edge| *edge <= q_value);
        if bin > 0 && bin < n_bins {
            sums[bin] += r_value;
            counts[bin] += 1;
        }
    }

    let mut profile = BinnedProfile::default();
    for bin in 1..n_bins {
        if counts[bin] == 0 {
            continue;
        }
        let mean = sums[bin] / counts[bin] as f64;
        if mean.is_finite() && mean > 0.0 {
            profile.q.push((edges[bin - 1] * edges[bin]).sqrt());
            profile.r.push(mean);
        }
    }
    profile
}
