//! Domain error types and recoverable diagnostics.

use chrono::NaiveDate;
use std::fmt;

/// Top-level error type for infogain.
#[derive(Debug, thiserror::Error)]
pub enum InfogainError {
    #[error("insufficient data for {context}: have {have} observations, need {need}")]
    InsufficientData {
        context: String,
        have: usize,
        need: usize,
    },

    #[error("non-chronological input at index {index}: {current} does not follow {previous}")]
    NonChronologicalInput {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid price {price} at {date}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("invalid signal {signal} at {date}")]
    InvalidSignal { date: NaiveDate, signal: f64 },

    #[error("invalid series {name}: {reason}")]
    InvalidSeries { name: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InfogainError {
    /// Process exit status used by the CLI for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            InfogainError::Io(_) => 1,
            InfogainError::ConfigParse { .. }
            | InfogainError::ConfigMissing { .. }
            | InfogainError::ConfigInvalid { .. } => 2,
            InfogainError::Data { .. } | InfogainError::InsufficientData { .. } => 5,
            InfogainError::NonChronologicalInput { .. }
            | InfogainError::InvalidPrice { .. }
            | InfogainError::InvalidSignal { .. }
            | InfogainError::InvalidSeries { .. } => 6,
        }
    }
}

impl From<&InfogainError> for std::process::ExitCode {
    fn from(err: &InfogainError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

/// A recoverable condition reported next to a nominal result.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Quantile boundaries collapsed; fewer bins than requested were used.
    DegenerateDiscretization {
        series: String,
        requested: usize,
        effective: usize,
    },
    /// A ratio had a zero denominator and fell back to 0.
    DivisionDegenerate { metric: &'static str },
    /// No threshold table is registered; the indicator reads as neutral.
    UnknownIndicator { name: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DegenerateDiscretization {
                series,
                requested,
                effective,
            } => write!(
                f,
                "degenerate discretization of {}: {} of {} bins",
                series, effective, requested
            ),
            Diagnostic::DivisionDegenerate { metric } => {
                write!(f, "{} has a zero denominator, reported as 0", metric)
            }
            Diagnostic::UnknownIndicator { name } => {
                write!(f, "no threshold table for {}, signal is neutral", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = InfogainError::InsufficientData {
            context: "sopr @ 7d".into(),
            have: 42,
            need: 100,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for sopr @ 7d: have 42 observations, need 100"
        );
    }

    #[test]
    fn non_chronological_message() {
        let err = InfogainError::NonChronologicalInput {
            index: 3,
            previous: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            current: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "non-chronological input at index 3: 2024-01-04 does not follow 2024-01-05"
        );
    }

    #[test]
    fn exit_codes_by_category() {
        let config = InfogainError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        };
        assert_eq!(config.exit_status(), 2);

        let data = InfogainError::Data {
            reason: "boom".into(),
        };
        assert_eq!(data.exit_status(), 5);

        let input = InfogainError::InvalidPrice {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            price: 0.0,
        };
        assert_eq!(input.exit_status(), 6);
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::DegenerateDiscretization {
            series: "nupl".into(),
            requested: 10,
            effective: 4,
        };
        assert_eq!(d.to_string(), "degenerate discretization of nupl: 4 of 10 bins");
    }
}
