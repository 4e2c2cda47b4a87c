//! Inner-join alignment of several series on their shared dates.

use crate::domain::series::Series;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Rows present in every input series, ascending by date.
///
/// `values[i]` of each row belongs to `names[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    pub names: Vec<String>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Values of the column at `index`, in row order.
    pub fn column_at(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.values[index]).collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).map(|i| self.column_at(i))
    }
}

/// Inner-join `series` on date.
///
/// An empty intersection (or an empty input) yields an empty frame.
pub fn align(series: &[&Series]) -> AlignedFrame {
    let names: Vec<String> = series.iter().map(|s| s.name().to_string()).collect();

    let Some((first, rest)) = series.split_first() else {
        return AlignedFrame {
            names,
            rows: Vec::new(),
        };
    };

    let mut shared: BTreeSet<NaiveDate> = first.points().iter().map(|p| p.date).collect();
    for s in rest {
        let dates: BTreeSet<NaiveDate> = s.points().iter().map(|p| p.date).collect();
        shared.retain(|d| dates.contains(d));
    }

    let lookups: Vec<HashMap<NaiveDate, f64>> = series
        .iter()
        .map(|s| s.points().iter().map(|p| (p.date, p.value)).collect())
        .collect();

    let rows = shared
        .into_iter()
        .map(|date| AlignedRow {
            date,
            values: lookups.iter().map(|l| l[&date]).collect(),
        })
        .collect();

    AlignedFrame { names, rows }
}

/// Convenience for the common two-series case.
pub fn align_pair(left: &Series, right: &Series) -> AlignedFrame {
    align(&[left, right])
}
