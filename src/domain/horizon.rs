//! Forward-horizon scan: how much an indicator tells about returns h days ahead.
//!
//! For every horizon h the indicator and price are aligned, the forward
//! return `price[t+h] / price[t] - 1` is attached to row t (the last h rows
//! have none and are dropped), both columns are discretized, and the pair is
//! scored. Horizons without enough rows are skipped, never scored as zero.

use crate::domain::alignment::align_pair;
use crate::domain::discretizer::{DEFAULT_BIN_COUNT, Discretizer, MIN_DISCRETIZE_SAMPLES};
use crate::domain::entropy::{InformationScore, transfer_entropy};
use crate::domain::error::Diagnostic;
use crate::domain::series::Series;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub const DEFAULT_HORIZONS: [usize; 5] = [1, 3, 7, 14, 30];
pub const DEFAULT_TRANSFER_ENTROPY_BINS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub bin_count: usize,
    pub min_samples: usize,
    pub transfer_entropy: bool,
    pub transfer_entropy_bins: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            min_samples: MIN_DISCRETIZE_SAMPLES,
            transfer_entropy: false,
            transfer_entropy_bins: DEFAULT_TRANSFER_ENTROPY_BINS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonScore {
    pub horizon: usize,
    pub score: InformationScore,
    /// Pearson correlation of the raw indicator with the forward return.
    pub correlation: f64,
    /// Present only when the scan was configured for it and enough rows exist.
    pub transfer_entropy: Option<f64>,
    pub indicator_bins: usize,
    pub target_bins: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HorizonSkipReason {
    InsufficientData { rows: usize, minimum: usize },
    ZeroHorizon,
    Discretization(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedHorizon {
    pub horizon: usize,
    pub reason: HorizonSkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalHorizons {
    pub by_information_gain: usize,
    pub max_information_gain: f64,
    pub by_normalized_mi: usize,
    pub max_normalized_mi: f64,
    pub by_correlation: usize,
    pub max_abs_correlation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonScan {
    pub indicator: String,
    pub scores: BTreeMap<usize, HorizonScore>,
    pub skipped: Vec<SkippedHorizon>,
    pub optimal: Option<OptimalHorizons>,
}

impl HorizonScan {
    pub fn information_scores(&self) -> BTreeMap<usize, InformationScore> {
        self.scores.iter().map(|(&h, s)| (h, s.score)).collect()
    }
}

/// Score `indicator` against forward returns of `price` at every horizon.
pub fn scan_horizons(
    indicator: &Series,
    price: &Series,
    horizons: &[usize],
    config: &ScanConfig,
) -> HorizonScan {
    let frame = align_pair(indicator, price);
    let indicator_values = frame.column_at(0);
    let prices = frame.column_at(1);

    let mut scores = BTreeMap::new();
    let mut skipped = Vec::new();

    let ordered: BTreeSet<usize> = horizons.iter().copied().collect();
    for horizon in ordered {
        match score_horizon(indicator.name(), &indicator_values, &prices, horizon, config) {
            Ok(score) => {
                debug!(
                    indicator = indicator.name(),
                    horizon,
                    information_gain = score.score.information_gain,
                    correlation = score.correlation,
                    "horizon scored"
                );
                scores.insert(horizon, score);
            }
            Err(reason) => {
                info!(
                    indicator = indicator.name(),
                    horizon,
                    reason = ?reason,
                    "horizon skipped"
                );
                skipped.push(SkippedHorizon { horizon, reason });
            }
        }
    }

    let optimal = select_optimal(&scores);

    HorizonScan {
        indicator: indicator.name().to_string(),
        scores,
        skipped,
        optimal,
    }
}

/// Per-horizon information scores with the default scan settings.
pub fn compute_information_scores(
    indicator: &Series,
    price: &Series,
    horizons: &[usize],
) -> BTreeMap<usize, InformationScore> {
    scan_horizons(indicator, price, horizons, &ScanConfig::default()).information_scores()
}

fn score_horizon(
    name: &str,
    indicator: &[f64],
    prices: &[f64],
    horizon: usize,
    config: &ScanConfig,
) -> Result<HorizonScore, HorizonSkipReason> {
    if horizon == 0 {
        return Err(HorizonSkipReason::ZeroHorizon);
    }

    let returns = forward_returns(prices, horizon);
    let (xs, rs): (Vec<f64>, Vec<f64>) = indicator
        .iter()
        .copied()
        .zip(returns)
        .filter(|(x, r)| x.is_finite() && r.is_finite())
        .unzip();

    if xs.len() < config.min_samples {
        return Err(HorizonSkipReason::InsufficientData {
            rows: xs.len(),
            minimum: config.min_samples,
        });
    }

    let discretizer = Discretizer::new(config.bin_count, config.min_samples);
    let x_bins = discretizer
        .discretize(&xs)
        .map_err(|e| HorizonSkipReason::Discretization(e.to_string()))?;
    let r_bins = discretizer
        .discretize(&rs)
        .map_err(|e| HorizonSkipReason::Discretization(e.to_string()))?;

    let score = InformationScore::compute(&x_bins.labels, &r_bins.labels)
        .map_err(|e| HorizonSkipReason::Discretization(e.to_string()))?;

    let mut diagnostics = Vec::new();
    diagnostics.extend(x_bins.diagnostic(name));
    diagnostics.extend(r_bins.diagnostic(&format!("return_{}d", horizon)));
    diagnostics.extend(score.diagnostics());

    let correlation = match pearson_correlation(&xs, &rs) {
        Some(c) => c,
        None => {
            diagnostics.push(Diagnostic::DivisionDegenerate {
                metric: "correlation",
            });
            0.0
        }
    };

    let transfer_entropy = if config.transfer_entropy {
        lagged_transfer_entropy(&xs, &rs, horizon, config)
    } else {
        None
    };

    Ok(HorizonScore {
        horizon,
        score,
        correlation,
        transfer_entropy,
        indicator_bins: x_bins.effective_bins,
        target_bins: r_bins.effective_bins,
        diagnostics,
    })
}

fn lagged_transfer_entropy(
    xs: &[f64],
    rs: &[f64],
    lag: usize,
    config: &ScanConfig,
) -> Option<f64> {
    if xs.len() < lag + config.min_samples {
        return None;
    }
    let discretizer = Discretizer::new(config.transfer_entropy_bins, config.min_samples);
    let x_bins = discretizer.discretize(xs).ok()?;
    let r_bins = discretizer.discretize(rs).ok()?;
    transfer_entropy(&x_bins.labels, &r_bins.labels, lag).ok()
}

/// `price[t+h] / price[t] - 1` for every t that has a value h rows ahead.
pub fn forward_returns(prices: &[f64], horizon: usize) -> Vec<f64> {
    if horizon == 0 || prices.len() <= horizon {
        return Vec::new();
    }
    prices
        .iter()
        .zip(&prices[horizon..])
        .map(|(&now, &later)| later / now - 1.0)
        .collect()
}

/// Pearson correlation, or `None` when either side has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = x[..n].iter().sum::<f64>() / nf;
    let mean_y = y[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Argmax per criterion; `scores` iterates ascending so strict `>` keeps the
/// smallest horizon on exact ties.
fn select_optimal(scores: &BTreeMap<usize, HorizonScore>) -> Option<OptimalHorizons> {
    let mut iter = scores.values();
    let first = iter.next()?;

    let mut best = OptimalHorizons {
        by_information_gain: first.horizon,
        max_information_gain: first.score.information_gain,
        by_normalized_mi: first.horizon,
        max_normalized_mi: first.score.normalized_mutual_information,
        by_correlation: first.horizon,
        max_abs_correlation: first.correlation.abs(),
    };

    for s in iter {
        if s.score.information_gain > best.max_information_gain {
            best.by_information_gain = s.horizon;
            best.max_information_gain = s.score.information_gain;
        }
        if s.score.normalized_mutual_information > best.max_normalized_mi {
            best.by_normalized_mi = s.horizon;
            best.max_normalized_mi = s.score.normalized_mutual_information;
        }
        if s.correlation.abs() > best.max_abs_correlation {
            best.by_correlation = s.horizon;
            best.max_abs_correlation = s.correlation.abs();
        }
    }

    Some(best)
}
