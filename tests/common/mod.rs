#![allow(dead_code)]

use chrono::NaiveDate;
use infogain::domain::error::InfogainError;
use infogain::domain::series::{Series, SeriesPoint};
use infogain::ports::data_port::SeriesPort;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub struct MockSeriesPort {
    pub series: HashMap<String, Series>,
    pub prices: HashMap<String, Series>,
    pub errors: HashMap<String, String>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            prices: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, id: &str, series: Series) -> Self {
        self.series.insert(id.to_string(), series);
        self
    }

    pub fn with_price(mut self, asset: &str, series: Series) -> Self {
        self.prices.insert(asset.to_string(), series);
        self
    }

    pub fn with_error(mut self, id: &str, reason: &str) -> Self {
        self.errors.insert(id.to_string(), reason.to_string());
        self
    }

    fn lookup(
        &self,
        map: &HashMap<String, Series>,
        id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, InfogainError> {
        if let Some(reason) = self.errors.get(id) {
            return Err(InfogainError::Data {
                reason: reason.clone(),
            });
        }
        match map.get(id) {
            Some(s) => Series::new(
                id,
                s.points()
                    .iter()
                    .copied()
                    .filter(|p| p.date >= start && p.date <= end)
                    .collect(),
            ),
            None => Ok(Series::empty(id)),
        }
    }
}

impl SeriesPort for MockSeriesPort {
    fn get_series(
        &self,
        indicator_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, InfogainError> {
        self.lookup(&self.series, indicator_id, start, end)
    }

    fn get_price_series(
        &self,
        asset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, InfogainError> {
        self.lookup(&self.prices, asset, start, end)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_date() -> NaiveDate {
    date(2020, 1, 1)
}

/// Consecutive daily observations starting at `start_date()`.
pub fn daily_series(name: &str, values: &[f64]) -> Series {
    daily_series_from(name, start_date(), values)
}

pub fn daily_series_from(name: &str, start: NaiveDate, values: &[f64]) -> Series {
    Series::new(
        name,
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| SeriesPoint {
                date: start + chrono::Duration::days(i as i64),
                value,
            })
            .collect(),
    )
    .unwrap()
}

/// Multiplicative random walk with daily moves in [-2%, 2%].
pub fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(price);
        price *= 1.0 + rng.gen_range(-0.02..0.02);
    }
    out
}

pub fn uniform_noise(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// `-(p[t+lag] / p[t] - 1)`: perfectly anti-correlated with the `lag`-day
/// forward return. The last `lag` prices have no value.
pub fn anti_correlated_at_lag(prices: &[f64], lag: usize) -> Vec<f64> {
    prices
        .iter()
        .zip(&prices[lag..])
        .map(|(&now, &later)| -(later / now - 1.0))
        .collect()
}
