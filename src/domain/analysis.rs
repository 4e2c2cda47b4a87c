//! Batch analysis: scan many indicators against one price series and rank
//! them by a composite information score.
//!
//! A failing indicator is recorded as skipped and the batch continues.

use crate::domain::error::InfogainError;
use crate::domain::horizon::{HorizonScan, ScanConfig, scan_horizons};
use crate::domain::series::Series;
use crate::ports::data_port::SeriesPort;
use chrono::NaiveDate;
use std::fmt;
use tracing::{info, warn};

const IG_WEIGHT: f64 = 0.3;
const NMI_WEIGHT: f64 = 0.3;
const SU_WEIGHT: f64 = 0.2;
const TE_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct IndicatorReport {
    pub name: String,
    pub scan: HorizonScan,
    pub composite_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
    NoScorableHorizon,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(reason) => write!(f, "fetch failed: {}", reason),
            SkipReason::NoData => f.write_str("no data"),
            SkipReason::NoScorableHorizon => f.write_str("no horizon had enough aligned rows"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedIndicator {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct BatchAnalysis {
    /// Scored indicators, best composite score first.
    pub ranked: Vec<IndicatorReport>,
    pub skipped: Vec<SkippedIndicator>,
}

/// Mean over scored horizons of 0.3·IG + 0.3·NMI + 0.2·SU + 0.2·TE.
///
/// Horizons without a transfer entropy value contribute TE = 0.
pub fn composite_information_score(scan: &HorizonScan) -> f64 {
    if scan.scores.is_empty() {
        return 0.0;
    }
    let total: f64 = scan
        .scores
        .values()
        .map(|h| {
            IG_WEIGHT * h.score.information_gain
                + NMI_WEIGHT * h.score.normalized_mutual_information
                + SU_WEIGHT * h.score.symmetric_uncertainty
                + TE_WEIGHT * h.transfer_entropy.unwrap_or(0.0)
        })
        .sum();
    total / scan.scores.len() as f64
}

/// Rank already-fetched indicator series against `price`.
pub fn rank_indicators(
    indicators: &[Series],
    price: &Series,
    horizons: &[usize],
    config: &ScanConfig,
) -> BatchAnalysis {
    let mut ranked = Vec::new();
    let mut skipped = Vec::new();

    for indicator in indicators {
        match score_indicator(indicator, price, horizons, config) {
            Ok(report) => ranked.push(report),
            Err(reason) => {
                warn!(indicator = indicator.name(), %reason, "skipping indicator");
                skipped.push(SkippedIndicator {
                    name: indicator.name().to_string(),
                    reason,
                });
            }
        }
    }

    sort_ranked(&mut ranked);
    BatchAnalysis { ranked, skipped }
}

/// Fetch each indicator through `port`, scan it and rank the results.
///
/// Fails only when the price series is empty or every indicator is skipped.
#[allow(clippy::too_many_arguments)]
pub fn analyze_indicators(
    port: &dyn SeriesPort,
    indicator_ids: &[String],
    asset: &str,
    start: NaiveDate,
    end: NaiveDate,
    horizons: &[usize],
    config: &ScanConfig,
) -> Result<BatchAnalysis, InfogainError> {
    let price = port.get_price_series(asset, start, end)?;
    if price.is_empty() {
        return Err(InfogainError::InsufficientData {
            context: format!("price series {}", asset),
            have: 0,
            need: config.min_samples,
        });
    }
    info!(asset, points = price.len(), "loaded price series");

    let mut fetched = Vec::new();
    let mut skipped = Vec::new();

    for id in indicator_ids {
        match port.get_series(id, start, end) {
            Ok(series) if series.is_empty() => {
                warn!(indicator = id.as_str(), "skipping indicator (no data)");
                skipped.push(SkippedIndicator {
                    name: id.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(series) => fetched.push(series),
            Err(e) => {
                warn!(indicator = id.as_str(), error = %e, "skipping indicator (fetch failed)");
                skipped.push(SkippedIndicator {
                    name: id.clone(),
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
            }
        }
    }

    let mut batch = rank_indicators(&fetched, &price, horizons, config);
    skipped.append(&mut batch.skipped);
    batch.skipped = skipped;

    if batch.ranked.is_empty() {
        return Err(InfogainError::InsufficientData {
            context: "indicator batch (every indicator was skipped)".to_string(),
            have: 0,
            need: 1,
        });
    }

    info!(
        ranked = batch.ranked.len(),
        skipped = batch.skipped.len(),
        "indicator analysis complete"
    );
    Ok(batch)
}

fn score_indicator(
    indicator: &Series,
    price: &Series,
    horizons: &[usize],
    config: &ScanConfig,
) -> Result<IndicatorReport, SkipReason> {
    if indicator.is_empty() {
        return Err(SkipReason::NoData);
    }
    let scan = scan_horizons(indicator, price, horizons, config);
    if scan.scores.is_empty() {
        return Err(SkipReason::NoScorableHorizon);
    }
    Ok(IndicatorReport {
        name: indicator.name().to_string(),
        composite_score: composite_information_score(&scan),
        scan,
    })
}

// Descending by score; ties keep name order so output is deterministic.
fn sort_ranked(ranked: &mut [IndicatorReport]) {
    ranked.sort_by(|a, b| {
        b.composite_score
            .total_cmp(&a.composite_score)
            .then_with(|| a.name.cmp(&b.name))
    });
}
