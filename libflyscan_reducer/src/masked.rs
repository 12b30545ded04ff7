use bitvec::prelude::*;
use ndarray::Array1;

/// A per-channel series of values paired with an explicit validity mask.
///
/// A set bit in the mask means the channel is invalid and must be excluded from every
/// downstream aggregate. Invalid channels keep whatever value was computed for them, but
/// that value should never be read as data; use [`MaskedSeries::get`] or
/// [`MaskedSeries::iter_valid`] rather than indexing `values` directly.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedSeries {
    values: Array1<f64>,
    invalid: BitVec,
}

impl MaskedSeries {
    /// Create a series where every channel is valid
    pub fn new(values: Array1<f64>) -> Self {
        let invalid = bitvec![0; values.len()];
        Self { values, invalid }
    }

    /// Create a series where every channel is invalid. Values are zeroed.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            values: Array1::zeros(len),
            invalid: bitvec![1; len],
        }
    }

    /// Create a series, invalidating any channel which fails the predicate
    pub fn from_values_where<F>(values: Array1<f64>, is_valid: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        let invalid: BitVec = values.iter().map(|v| !is_valid(*v)).collect();
        Self { values, invalid }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the value at a channel, or None if the channel is invalid (or out of bounds)
    pub fn get(&self, index: usize) -> Option<f64> {
        match self.invalid.get(index) {
            Some(bit) if !*bit => Some(self.values[index]),
            _ => None,
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Set the value of a channel and mark it valid
    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
        self.invalid.set(index, false);
    }

    pub fn invalidate(&mut self, index: usize) {
        self.invalid.set(index, true);
    }

    /// Invalidate every channel which is invalid in `other_mask`
    pub fn invalidate_where(&mut self, other_mask: &BitSlice) {
        for index in other_mask.iter_ones() {
            if index < self.invalid.len() {
                self.invalid.set(index, true);
            }
        }
    }

    /// Copy of this series with the union of both masks
    pub fn with_union_mask(&self, other_mask: &BitSlice) -> Self {
        let mut series = self.clone();
        series.invalidate_where(other_mask);
        series
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn mask(&self) -> &BitSlice {
        self.invalid.as_bitslice()
    }

    pub fn count_valid(&self) -> usize {
        self.invalid.count_zeros()
    }

    /// Iterate over (channel, value) for valid channels only
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .zip(self.invalid.iter().by_vals())
            .enumerate()
            .filter(|(_, (_, invalid))| !*invalid)
            .map(|(index, (value, _))| (index, *value))
    }

    /// The values with every invalid channel replaced by `fill`, for export
    pub fn filled(&self, fill: f64) -> Array1<f64> {
        let mut out = self.values.clone();
        for index in self.invalid.iter_ones() {
            out[index] = fill;
        }
        out
    }
}
