//! Threshold-table signals and weighted composite blending.
//!
//! Each registered indicator carries six ascending breakpoints. A value maps
//! to a zone and the zone to a signal in {-2..2}:
//!
//! | value                          | zone        | signal |
//! |--------------------------------|-------------|--------|
//! | v <= strong_buy                | strong buy  | +2     |
//! | strong_buy < v <= buy          | buy         | +1     |
//! | buy < v <= neutral_high        | neutral     | 0      |
//! | neutral_high < v <= sell       | sell        | -1     |
//! | v > sell                       | strong sell | -2     |
//!
//! `neutral_low` splits the neutral band and `strong_sell` marks the
//! published extreme; neither changes the zone. Inverted indicators negate
//! the mapping. Indicator names are matched case-insensitively.

use crate::domain::error::{Diagnostic, InfogainError};
use crate::domain::series::{Series, SeriesPoint};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::warn;

pub type Signal = i8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Zone {
    pub fn signal(self) -> Signal {
        match self {
            Zone::StrongBuy => 2,
            Zone::Buy => 1,
            Zone::Neutral => 0,
            Zone::Sell => -1,
            Zone::StrongSell => -2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdTable {
    pub strong_buy: f64,
    pub buy: f64,
    pub neutral_low: f64,
    pub neutral_high: f64,
    pub sell: f64,
    pub strong_sell: f64,
}

impl ThresholdTable {
    /// Build from six breakpoints; they must be finite and ascending.
    pub fn new(breakpoints: [f64; 6]) -> Result<Self, InfogainError> {
        if breakpoints.iter().any(|b| !b.is_finite()) {
            return Err(InfogainError::InvalidSeries {
                name: "threshold table".to_string(),
                reason: "breakpoints must be finite".to_string(),
            });
        }
        if breakpoints.windows(2).any(|w| w[1] < w[0]) {
            return Err(InfogainError::InvalidSeries {
                name: "threshold table".to_string(),
                reason: format!("breakpoints must be ascending: {:?}", breakpoints),
            });
        }
        let [strong_buy, buy, neutral_low, neutral_high, sell, strong_sell] = breakpoints;
        Ok(Self {
            strong_buy,
            buy,
            neutral_low,
            neutral_high,
            sell,
            strong_sell,
        })
    }

    pub fn zone(&self, value: f64) -> Zone {
        if value <= self.strong_buy {
            Zone::StrongBuy
        } else if value <= self.buy {
            Zone::Buy
        } else if value <= self.neutral_high {
            Zone::Neutral
        } else if value <= self.sell {
            Zone::Sell
        } else {
            Zone::StrongSell
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRule {
    pub thresholds: ThresholdTable,
    pub inverted: bool,
    /// Weight in the composite; `None` keeps the indicator out of the blend.
    pub weight: Option<f64>,
}

impl IndicatorRule {
    pub fn signal(&self, value: f64) -> Signal {
        let s = self.thresholds.zone(value).signal();
        if self.inverted { -s } else { s }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalGenerator {
    rules: HashMap<String, IndicatorRule>,
}

static DEFAULT_GENERATOR: LazyLock<SignalGenerator> = LazyLock::new(SignalGenerator::with_defaults);

/// Signal for `value` under the default registry.
pub fn generate_signal(indicator: &str, value: f64) -> Signal {
    DEFAULT_GENERATOR.generate_signal(indicator, value)
}

impl SignalGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for SOPR, MVRV z-score, NUPL, NVT and Puell multiple.
    pub fn with_defaults() -> Self {
        let defaults: [(&str, [f64; 6], f64); 5] = [
            ("SOPR", [0.95, 0.98, 1.00, 1.02, 1.05, 1.08], 0.20),
            ("MVRV", [-0.5, 0.0, 1.0, 2.0, 3.0, 4.0], 0.35),
            ("NUPL", [0.0, 0.25, 0.5, 0.65, 0.75, 0.85], 0.25),
            ("NVT", [40.0, 50.0, 70.0, 90.0, 100.0, 120.0], 0.10),
            ("Puell", [0.3, 0.5, 1.0, 2.0, 3.0, 4.0], 0.10),
        ];

        let mut generator = Self::new();
        for (name, breakpoints, weight) in defaults {
            if let Ok(thresholds) = ThresholdTable::new(breakpoints) {
                generator.register(
                    name,
                    IndicatorRule {
                        thresholds,
                        inverted: false,
                        weight: Some(weight),
                    },
                );
            }
        }
        generator
    }

    pub fn register(&mut self, name: &str, rule: IndicatorRule) {
        self.rules.insert(normalize(name), rule);
    }

    pub fn rule(&self, name: &str) -> Option<&IndicatorRule> {
        self.rules.get(&normalize(name))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.rules.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Signal for one value; unregistered indicators read as neutral.
    pub fn generate_signal(&self, indicator: &str, value: f64) -> Signal {
        match self.rule(indicator) {
            Some(rule) => rule.signal(value),
            None => {
                warn!(indicator, "{}", Diagnostic::UnknownIndicator {
                    name: indicator.to_string()
                });
                0
            }
        }
    }

    /// Signal per observation of `series`, looked up under `indicator`.
    pub fn signal_series(&self, indicator: &str, series: &Series) -> Series {
        let rule = self.rule(indicator);
        if rule.is_none() {
            warn!(indicator, "{}", Diagnostic::UnknownIndicator {
                name: indicator.to_string()
            });
        }
        series.map_values(format!("{}_signal", series.name()), |v| {
            rule.map_or(0.0, |r| f64::from(r.signal(v)))
        })
    }

    /// Weighted mean of the present signals, weights re-normalized over the
    /// indicators actually present. Unweighted or unregistered indicators do
    /// not take part; with nothing to blend the composite is 0.
    pub fn composite(&self, signals: &HashMap<String, Signal>) -> f64 {
        let mut weighted: Vec<(String, Signal, f64)> = signals
            .iter()
            .filter_map(|(name, &signal)| {
                let weight = self.rule(name).and_then(|r| r.weight)?;
                Some((normalize(name), signal, weight))
            })
            .collect();
        // Summed in name order so every map instance blends to the same bits.
        weighted.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut total = 0.0;
        let mut total_weight = 0.0;
        for (_, signal, weight) in weighted {
            total += f64::from(signal) * weight;
            total_weight += weight;
        }
        if total_weight > 0.0 {
            (total / total_weight).clamp(-2.0, 2.0)
        } else {
            0.0
        }
    }

    /// Composite signal on every date observed by any input.
    pub fn composite_series(&self, inputs: &[(&str, &Series)]) -> Series {
        let dates: BTreeSet<NaiveDate> = inputs
            .iter()
            .flat_map(|(_, s)| s.points().iter().map(|p| p.date))
            .collect();

        let mut per_date: BTreeMap<NaiveDate, HashMap<String, Signal>> =
            dates.into_iter().map(|d| (d, HashMap::new())).collect();

        for (name, series) in inputs {
            let Some(rule) = self.rule(name) else {
                warn!(indicator = *name, "{}", Diagnostic::UnknownIndicator {
                    name: name.to_string()
                });
                continue;
            };
            for point in series.points() {
                if let Some(slot) = per_date.get_mut(&point.date) {
                    slot.insert(normalize(name), rule.signal(point.value));
                }
            }
        }

        let points = per_date
            .into_iter()
            .map(|(date, signals)| SeriesPoint {
                date,
                value: self.composite(&signals),
            })
            .collect();

        // Dates come from a BTreeSet and composites are finite.
        Series::new("composite_signal", points).unwrap_or_else(|_| Series::empty("composite_signal"))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
