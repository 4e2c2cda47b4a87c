//! CSV file series adapter.
//!
//! Each series lives in `<base>/<id>.csv` with a `date,value` header. Blank
//! or non-finite values are treated as missing observations.

use crate::domain::error::InfogainError;
use crate::domain::series::Series;
use crate::ports::data_port::SeriesPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvSeriesAdapter {
    base_path: PathBuf,
}

impl CsvSeriesAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", id))
    }

    fn read_series(&self, id: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, InfogainError> {
        let path = self.csv_path(id);
        let content = fs::read_to_string(&path).map_err(|e| InfogainError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut pairs = Vec::new();
        let mut missing = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| InfogainError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| InfogainError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                InfogainError::Data {
                    reason: format!("invalid date {:?} in {}: {}", date_str, path.display(), e),
                }
            })?;

            if date < start || date > end {
                continue;
            }

            let raw = record.get(1).map(str::trim).unwrap_or("");
            if raw.is_empty() {
                missing += 1;
                continue;
            }
            let value: f64 = raw.parse().map_err(|e| InfogainError::Data {
                reason: format!("invalid value {:?} at {} in {}: {}", raw, date, path.display(), e),
            })?;
            if !value.is_finite() {
                missing += 1;
                continue;
            }

            pairs.push((date, value));
        }

        if missing > 0 {
            debug!(series = id, missing, "dropped missing observations");
        }
        Series::from_unordered(id, pairs)
    }
}

impl SeriesPort for CsvSeriesAdapter {
    fn get_series(&self, indicator_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, InfogainError> {
        self.read_series(indicator_id, start, end)
    }

    fn get_price_series(&self, asset: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, InfogainError> {
        self.read_series(asset, start, end)
    }
}
