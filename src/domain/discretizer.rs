//! Quantile discretization of continuous sequences.
//!
//! Boundaries are the k+1 quantiles of the input (linear interpolation
//! between order statistics). Each value lands in the right-closed interval
//! `(b[i], b[i+1]]`; the lowest interval also takes the minimum. Repeated
//! boundaries collapse their bins and the surviving count is reported as
//! `effective_bins`.

use crate::domain::error::{Diagnostic, InfogainError};

pub const DEFAULT_BIN_COUNT: usize = 10;
pub const MIN_DISCRETIZE_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discretizer {
    pub bin_count: usize,
    pub min_samples: usize,
}

impl Default for Discretizer {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            min_samples: MIN_DISCRETIZE_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discretization {
    /// Bin label per input element, in input order.
    pub labels: Vec<usize>,
    /// Distinct boundaries, ascending.
    pub boundaries: Vec<f64>,
    pub requested_bins: usize,
    pub effective_bins: usize,
}

impl Discretization {
    pub fn is_degenerate(&self) -> bool {
        self.effective_bins < self.requested_bins
    }

    /// Number of elements per bin label.
    pub fn bin_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.effective_bins];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// A `DegenerateDiscretization` diagnostic when bins collapsed.
    pub fn diagnostic(&self, series: &str) -> Option<Diagnostic> {
        self.is_degenerate()
            .then(|| Diagnostic::DegenerateDiscretization {
                series: series.to_string(),
                requested: self.requested_bins,
                effective: self.effective_bins,
            })
    }
}

impl Discretizer {
    pub fn new(bin_count: usize, min_samples: usize) -> Self {
        Self {
            bin_count,
            min_samples,
        }
    }

    pub fn discretize(&self, values: &[f64]) -> Result<Discretization, InfogainError> {
        if values.len() < self.min_samples {
            return Err(InfogainError::InsufficientData {
                context: "discretization".to_string(),
                have: values.len(),
                need: self.min_samples,
            });
        }
        if values.is_empty() {
            return Err(InfogainError::InsufficientData {
                context: "discretization".to_string(),
                have: 0,
                need: 1,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(InfogainError::InvalidSeries {
                name: "discretization input".to_string(),
                reason: "contains non-finite values".to_string(),
            });
        }

        let requested_bins = self.bin_count.max(1);

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut boundaries: Vec<f64> = (0..=requested_bins)
            .map(|i| quantile(&sorted, i as f64 / requested_bins as f64))
            .collect();
        boundaries.dedup();

        let effective_bins = boundaries.len().saturating_sub(1).max(1);
        let interior: &[f64] = if boundaries.len() > 2 {
            &boundaries[1..boundaries.len() - 1]
        } else {
            &[]
        };

        let labels = values
            .iter()
            .map(|&v| interior.partition_point(|&b| b < v))
            .collect();

        Ok(Discretization {
            labels,
            boundaries,
            requested_bins,
            effective_bins,
        })
    }
}

/// Quantile `q` in [0, 1] of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}
