//! Configuration validation.
//!
//! Validates every section before analysis or backtesting runs, and provides
//! the strict value parsers the CLI builders share.

use crate::domain::error::InfogainError;
use crate::domain::signal::ThresholdTable;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::str::FromStr;

pub const SIGNAL_SECTION_PREFIX: &str = "signal:";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    validate_data_config(config)?;
    validate_analysis_config(config)?;
    validate_backtest_config(config)?;
    validate_signal_sections(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    require_non_empty(config, "data", "dir")?;
    require_non_empty(config, "data", "asset")?;
    validate_dates(config)?;
    if let Some(list) = config.get_string("data", "indicators") {
        parse_indicator_list(&list)?;
    }
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    check_min(config, "bin_count", 2)?;
    check_min(config, "min_samples", 2)?;
    check_min(config, "transfer_entropy_bins", 2)?;
    if let Some(h) = config.get_string("analysis", "horizons") {
        parse_horizons(&h)?;
    }
    if let Some(raw) = config.get_string("analysis", "transfer_entropy") {
        parse_bool(&raw).ok_or_else(|| invalid("analysis", "transfer_entropy", "expected a boolean"))?;
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    if let Some(capital) = parse_number::<f64>(config, "backtest", "initial_capital")? {
        if !capital.is_finite() || capital <= 0.0 {
            return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
        }
    }
    Ok(())
}

pub fn validate_signal_sections(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    for section in signal_sections(config) {
        let raw = config
            .get_string(&section, "thresholds")
            .ok_or_else(|| InfogainError::ConfigMissing {
                section: section.clone(),
                key: "thresholds".to_string(),
            })?;
        parse_thresholds(&section, &raw)?;

        if let Some(weight) = parse_number::<f64>(config, &section, "weight")? {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(invalid(&section, "weight", "weight must be positive"));
            }
        }
        if let Some(raw) = config.get_string(&section, "inverted") {
            parse_bool(&raw).ok_or_else(|| invalid(&section, "inverted", "expected a boolean"))?;
        }
    }
    Ok(())
}

/// `[signal:<NAME>]` section names, sorted.
pub fn signal_sections(config: &dyn ConfigPort) -> Vec<String> {
    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(SIGNAL_SECTION_PREFIX) && s.len() > SIGNAL_SECTION_PREFIX.len())
        .collect();
    sections.sort();
    sections
}

/// Comma-separated positive horizons; duplicates are dropped, order kept.
pub fn parse_horizons(input: &str) -> Result<Vec<usize>, InfogainError> {
    let mut horizons = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        let h: usize = trimmed
            .parse()
            .map_err(|_| invalid("analysis", "horizons", &format!("not a positive integer: {:?}", trimmed)))?;
        if h == 0 {
            return Err(invalid("analysis", "horizons", "horizons must be positive"));
        }
        if seen.insert(h) {
            horizons.push(h);
        }
    }
    Ok(horizons)
}

/// Comma-separated series ids; blank tokens and duplicates are rejected.
pub fn parse_indicator_list(input: &str) -> Result<Vec<String>, InfogainError> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let id = token.trim();
        if id.is_empty() {
            return Err(invalid("data", "indicators", "empty token in indicator list"));
        }
        if !seen.insert(id.to_string()) {
            return Err(invalid("data", "indicators", &format!("duplicate indicator: {}", id)));
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Six comma-separated ascending breakpoints.
pub fn parse_thresholds(section: &str, input: &str) -> Result<ThresholdTable, InfogainError> {
    let values: Vec<f64> = input
        .split(',')
        .map(|t| t.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid(section, "thresholds", "thresholds must be numbers"))?;

    let breakpoints: [f64; 6] = values
        .try_into()
        .map_err(|v: Vec<f64>| invalid(section, "thresholds", &format!("expected 6 values, got {}", v.len())))?;

    ThresholdTable::new(breakpoints).map_err(|e| invalid(section, "thresholds", &e.to_string()))
}

pub fn parse_date(section: &str, key: &str, value: Option<&str>) -> Result<NaiveDate, InfogainError> {
    match value {
        None => Err(InfogainError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| invalid(section, key, &format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Strictly parse an optional numeric key; present but malformed is an error.
pub fn parse_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, InfogainError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("not a number: {:?}", raw))),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), InfogainError> {
    let start_str = config.get_string("data", "start_date");
    let end_str = config.get_string("data", "end_date");

    let start_date = parse_date("data", "start_date", start_str.as_deref())?;
    let end_date = parse_date("data", "end_date", end_str.as_deref())?;

    if start_date >= end_date {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

fn check_min(config: &dyn ConfigPort, key: &str, minimum: usize) -> Result<(), InfogainError> {
    match parse_number::<usize>(config, "analysis", key)? {
        Some(v) if v < minimum => Err(invalid(
            "analysis",
            key,
            &format!("{} must be at least {}", key, minimum),
        )),
        _ => Ok(()),
    }
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), InfogainError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(InfogainError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> InfogainError {
    InfogainError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
