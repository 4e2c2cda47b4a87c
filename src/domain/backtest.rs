//! Signal-driven position backtest.
//!
//! The engine consumes a chronological (date, price, signal) stream. Each
//! step maps the signal to a target position fraction, records the resulting
//! trade, and compounds capital by the return earned over the previous
//! interval at the position held during it. No fees or slippage are modeled.

use crate::domain::alignment::align_pair;
use crate::domain::error::InfogainError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::series::Series;
use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub price: f64,
    pub signal: f64,
    pub action: TradeAction,
    /// Position fraction in [0, 1] after this step.
    pub position: f64,
    pub capital_after: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub capital: f64,
    pub position: f64,
    pub signal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub signal: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
}

/// Position fraction targeted by `signal` when currently holding `current`.
pub fn target_position(signal: f64, current: f64) -> f64 {
    if signal > 1.5 {
        1.0
    } else if signal > 0.5 {
        0.6
    } else if signal < -1.5 {
        0.0
    } else if signal < -0.5 {
        0.3
    } else {
        current
    }
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    initial_capital: f64,
    capital: f64,
    position: f64,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl BacktestEngine {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            position: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Advance one step. Invalid points are rejected before any state changes.
    pub fn step(&mut self, point: StreamPoint) -> Result<&Trade, InfogainError> {
        let previous = self.equity_curve.last().copied();
        validate_point(&point, previous.map(|p| p.date), self.equity_curve.len())?;

        let held = self.position;
        if let Some(prev) = previous {
            self.capital *= 1.0 + held * (point.price / prev.price - 1.0);
        }

        let target = target_position(point.signal, held);
        let action = if target > held {
            TradeAction::Buy
        } else if target < held {
            TradeAction::Sell
        } else {
            TradeAction::Hold
        };
        self.position = target;

        if action != TradeAction::Hold {
            debug!(
                date = %point.date,
                %action,
                from = held,
                to = target,
                capital = self.capital,
                "position change"
            );
        }

        self.equity_curve.push(EquityPoint {
            date: point.date,
            price: point.price,
            capital: self.capital,
            position: self.position,
            signal: point.signal,
        });
        self.trades.push(Trade {
            date: point.date,
            price: point.price,
            signal: point.signal,
            action,
            position: self.position,
            capital_after: self.capital,
        });

        Ok(&self.trades[self.trades.len() - 1])
    }

    /// Consume the engine, returning its logs and their metrics.
    pub fn finish(self) -> BacktestResult {
        let metrics = PerformanceMetrics::compute(&self.equity_curve, &self.trades, self.initial_capital);
        BacktestResult {
            trades: self.trades,
            equity_curve: self.equity_curve,
            metrics,
        }
    }
}

/// Run a full backtest over `stream`.
///
/// The whole stream is validated first, so an error means no step ran.
pub fn run_backtest(stream: &[StreamPoint], initial_capital: f64) -> Result<BacktestResult, InfogainError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(InfogainError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: format!("must be a positive number, got {}", initial_capital),
        });
    }

    let mut previous = None;
    for (index, point) in stream.iter().enumerate() {
        validate_point(point, previous, index)?;
        previous = Some(point.date);
    }

    let mut engine = BacktestEngine::new(initial_capital);
    for point in stream {
        engine.step(*point)?;
    }
    let result = engine.finish();

    info!(
        steps = stream.len(),
        total_return = result.metrics.total_return,
        buy_hold_return = result.metrics.buy_hold_return,
        "backtest complete"
    );
    Ok(result)
}

/// Pair each price with the signal on the same date.
pub fn build_signal_stream(price: &Series, signals: &Series) -> Vec<StreamPoint> {
    align_pair(price, signals)
        .rows
        .into_iter()
        .map(|row| StreamPoint {
            date: row.date,
            price: row.values[0],
            signal: row.values[1],
        })
        .collect()
}

fn validate_point(point: &StreamPoint, previous: Option<NaiveDate>, index: usize) -> Result<(), InfogainError> {
    if let Some(prev) = previous {
        if point.date <= prev {
            return Err(InfogainError::NonChronologicalInput {
                index,
                previous: prev,
                current: point.date,
            });
        }
    }
    if !point.price.is_finite() || point.price <= 0.0 {
        return Err(InfogainError::InvalidPrice {
            date: point.date,
            price: point.price,
        });
    }
    if !point.signal.is_finite() {
        return Err(InfogainError::InvalidSignal {
            date: point.date,
            signal: point.signal,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::SeriesPoint;
    use approx::assert_relative_eq;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn stream(prices: &[f64], signals: &[f64]) -> Vec<StreamPoint> {
        prices
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(i, (&price, &signal))| StreamPoint {
                date: day(i as i64),
                price,
                signal,
            })
            .collect()
    }

    #[test]
    fn target_position_bands() {
        assert_eq!(target_position(2.0, 0.3), 1.0);
        assert_eq!(target_position(1.0, 0.0), 0.6);
        assert_eq!(target_position(-2.0, 1.0), 0.0);
        assert_eq!(target_position(-1.0, 1.0), 0.3);
        assert_eq!(target_position(0.0, 0.6), 0.6);
        assert_eq!(target_position(0.5, 0.3), 0.3);
        assert_eq!(target_position(-0.5, 0.3), 0.3);
    }

    #[test]
    fn compounding_at_sixty_percent() {
        let s = stream(&[100.0, 110.0, 121.0, 133.1], &[1.0; 4]);
        let result = run_backtest(&s, 10_000.0).unwrap();

        assert!(result.trades.iter().all(|t| t.position == 0.6));
        assert_eq!(result.trades[0].action, TradeAction::Buy);
        assert!(result.trades[1..].iter().all(|t| t.action == TradeAction::Hold));

        let expected = (1.06f64.powi(3) - 1.0) * 100.0;
        assert_relative_eq!(result.metrics.total_return, expected, epsilon = 1e-9);
        assert_relative_eq!(result.metrics.buy_hold_return, 33.1, epsilon = 1e-9);
    }

    #[test]
    fn first_step_does_not_move_capital() {
        let s = stream(&[100.0], &[2.0]);
        let result = run_backtest(&s, 500.0).unwrap();
        assert_eq!(result.equity_curve[0].capital, 500.0);
        assert_eq!(result.equity_curve[0].position, 1.0);
    }

    #[test]
    fn return_uses_position_held_over_interval() {
        // Flat on day 0, buy fully on day 1: the day-0 -> day-1 move is not earned.
        let s = stream(&[100.0, 200.0, 300.0], &[0.0, 2.0, 0.0]);
        let result = run_backtest(&s, 1_000.0).unwrap();

        assert_eq!(result.equity_curve[1].capital, 1_000.0);
        assert_relative_eq!(result.equity_curve[2].capital, 1_500.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_price_returns_nothing() {
        let s = stream(&[50.0; 6], &[2.0, -2.0, 1.0, -1.0, 0.0, 2.0]);
        let result = run_backtest(&s, 1_000.0).unwrap();
        assert_eq!(result.metrics.total_return, 0.0);
        assert_eq!(result.equity_curve.last().unwrap().capital, 1_000.0);
    }

    #[test]
    fn replay_is_deterministic() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        let signals: Vec<f64> = (0..50).map(|i| ((i % 5) as f64) - 2.0).collect();
        let s = stream(&prices, &signals);

        let a = run_backtest(&s, 10_000.0).unwrap();
        let b = run_backtest(&s, 10_000.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_chronological_rejected_before_mutation() {
        let mut engine = BacktestEngine::new(1_000.0);
        engine
            .step(StreamPoint {
                date: day(5),
                price: 10.0,
                signal: 2.0,
            })
            .unwrap();

        let err = engine
            .step(StreamPoint {
                date: day(5),
                price: 20.0,
                signal: -2.0,
            })
            .unwrap_err();

        assert!(matches!(err, InfogainError::NonChronologicalInput { index: 1, .. }));
        assert_eq!(engine.trades().len(), 1);
        assert_eq!(engine.capital(), 1_000.0);
        assert_eq!(engine.position(), 1.0);
    }

    #[test]
    fn run_rejects_whole_stream_up_front() {
        let mut s = stream(&[1.0, 2.0, 3.0], &[0.0; 3]);
        s[2].date = day(0);
        assert!(matches!(
            run_backtest(&s, 100.0),
            Err(InfogainError::NonChronologicalInput { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_bad_price_and_signal() {
        let s = stream(&[1.0, 0.0], &[0.0, 0.0]);
        assert!(matches!(run_backtest(&s, 100.0), Err(InfogainError::InvalidPrice { .. })));

        let s = stream(&[1.0, 2.0], &[0.0, f64::NAN]);
        assert!(matches!(run_backtest(&s, 100.0), Err(InfogainError::InvalidSignal { .. })));
    }

    #[test]
    fn rejects_non_positive_capital() {
        let s = stream(&[1.0], &[0.0]);
        assert!(matches!(
            run_backtest(&s, 0.0),
            Err(InfogainError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn empty_stream_is_empty_result() {
        let result = run_backtest(&[], 100.0).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.metrics.total_return, 0.0);
    }

    #[test]
    fn signal_stream_joins_on_date() {
        let price = Series::new(
            "price",
            (0..4)
                .map(|i| SeriesPoint {
                    date: day(i),
                    value: 100.0 + i as f64,
                })
                .collect(),
        )
        .unwrap();
        let signals = Series::new(
            "signal",
            [1, 3]
                .iter()
                .map(|&i| SeriesPoint {
                    date: day(i),
                    value: -1.0,
                })
                .collect(),
        )
        .unwrap();

        let s = build_signal_stream(&price, &signals);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].price, 101.0);
        assert_eq!(s[1].date, day(3));
        assert_eq!(s[1].signal, -1.0);
    }
}
