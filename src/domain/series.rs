//! Time-indexed series representation.
//!
//! A `Series` is an immutable, strictly ascending sequence of daily
//! observations. Construction is the only place ordering and finiteness are
//! checked; every consumer downstream relies on both.

use crate::domain::error::InfogainError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a series, rejecting unordered or duplicate dates and non-finite values.
    pub fn new(name: impl Into<String>, points: Vec<SeriesPoint>) -> Result<Self, InfogainError> {
        let name = name.into();

        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(InfogainError::InvalidSeries {
                name,
                reason: format!("non-finite value on {}", bad.date),
            });
        }

        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(InfogainError::InvalidSeries {
                name,
                reason: format!("{} does not follow {}", w[1].date, w[0].date),
            });
        }

        Ok(Self { name, points })
    }

    /// Build a series from (date, value) pairs in any order.
    ///
    /// Pairs are sorted by date; on duplicate dates the last pair wins.
    pub fn from_unordered(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, InfogainError> {
        let mut points: Vec<SeriesPoint> = pairs
            .into_iter()
            .map(|(date, value)| SeriesPoint { date, value })
            .collect();
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<SeriesPoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self::new(name, deduped)
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Value on `date`, if observed.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// A new series with every value mapped through `f`.
    pub fn map_values(&self, name: impl Into<String>, f: impl Fn(f64) -> f64) -> Self {
        Self {
            name: name.into(),
            points: self
                .points
                .iter()
                .map(|p| SeriesPoint {
                    date: p.date,
                    value: f(p.value),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn pt(day: u32, value: f64) -> SeriesPoint {
        SeriesPoint { date: d(day), value }
    }

    #[test]
    fn new_accepts_ascending_points() {
        let s = Series::new("sopr", vec![pt(1, 1.0), pt(2, 1.1), pt(5, 0.9)]).unwrap();
        assert_eq!(s.name(), "sopr");
        assert_eq!(s.len(), 3);
        assert_eq!(s.first_date(), Some(d(1)));
        assert_eq!(s.last_date(), Some(d(5)));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let result = Series::new("sopr", vec![pt(1, 1.0), pt(1, 1.1)]);
        assert!(matches!(result, Err(InfogainError::InvalidSeries { .. })));
    }

    #[test]
    fn new_rejects_descending_dates() {
        let result = Series::new("sopr", vec![pt(3, 1.0), pt(2, 1.1)]);
        assert!(matches!(result, Err(InfogainError::InvalidSeries { .. })));
    }

    #[test]
    fn new_rejects_nan() {
        let result = Series::new("sopr", vec![pt(1, 1.0), pt(2, f64::NAN)]);
        assert!(matches!(result, Err(InfogainError::InvalidSeries { .. })));
    }

    #[test]
    fn from_unordered_sorts_and_keeps_last_duplicate() {
        let s = Series::from_unordered(
            "mvrv",
            vec![(d(3), 3.0), (d(1), 1.0), (d(3), 30.0), (d(2), 2.0)],
        )
        .unwrap();
        assert_eq!(s.values(), vec![1.0, 2.0, 30.0]);
    }

    #[test]
    fn get_by_date() {
        let s = Series::new("nupl", vec![pt(1, 0.1), pt(4, 0.4)]).unwrap();
        assert_eq!(s.get(d(4)), Some(0.4));
        assert_eq!(s.get(d(2)), None);
    }

    #[test]
    fn empty_series() {
        let s = Series::empty("price");
        assert!(s.is_empty());
        assert_eq!(s.first_date(), None);
    }

    #[test]
    fn map_values_keeps_dates() {
        let s = Series::new("nvt", vec![pt(1, 2.0), pt(2, 4.0)]).unwrap();
        let halved = s.map_values("nvt_half", |v| v / 2.0);
        assert_eq!(halved.name(), "nvt_half");
        assert_eq!(halved.values(), vec![1.0, 2.0]);
        assert_eq!(halved.points()[1].date, d(2));
    }
}
