//! Performance metrics over a backtest's equity curve and trade log.
//!
//! Returns and drawdown are expressed in percent; `win_rate` is a fraction.

use super::backtest::{EquityPoint, Trade, TradeAction};
use chrono::NaiveDate;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeExtreme {
    pub date: NaiveDate,
    pub return_pct: f64,
    pub action: TradeAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub buy_hold_return: f64,
    pub excess_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub round_trips: usize,
    pub avg_trade_return: f64,
    pub best_trade: Option<TradeExtreme>,
    pub worst_trade: Option<TradeExtreme>,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], initial_capital: f64) -> Self {
        let final_capital = equity_curve
            .last()
            .map(|p| p.capital)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_capital / initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        let buy_hold_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) if first.price > 0.0 => (last.price / first.price - 1.0) * 100.0,
            _ => 0.0,
        };

        let (round_trips, wins) = count_round_trips(trades);
        let win_rate = if round_trips > 0 {
            wins as f64 / round_trips as f64
        } else {
            0.0
        };

        let trade_returns = trade_returns(trades);
        let avg_trade_return = if trade_returns.is_empty() {
            0.0
        } else {
            trade_returns.iter().map(|t| t.return_pct).sum::<f64>() / trade_returns.len() as f64
        };
        let best_trade = trade_returns
            .iter()
            .copied()
            .max_by(|a, b| a.return_pct.total_cmp(&b.return_pct));
        let worst_trade = trade_returns
            .iter()
            .copied()
            .min_by(|a, b| a.return_pct.total_cmp(&b.return_pct));

        PerformanceMetrics {
            total_return,
            buy_hold_return,
            excess_return: total_return - buy_hold_return,
            max_drawdown: compute_max_drawdown(equity_curve),
            sharpe_ratio: compute_sharpe(equity_curve),
            win_rate,
            total_trades: trades.iter().filter(|t| t.action != TradeAction::Hold).count(),
            round_trips,
            avg_trade_return,
            best_trade,
            worst_trade,
        }
    }
}

/// Largest peak-to-trough decline of capital, as a positive percentage.
fn compute_max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.capital;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.capital > peak {
            peak = point.capital;
        } else if peak > 0.0 {
            let dd = (peak - point.capital) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd * 100.0
}

/// Annualized Sharpe ratio of daily capital returns (sample stdev, no
/// risk-free rate). Zero with fewer than two returns or zero variance.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].capital > 0.0)
        .map(|w| w[1].capital / w[0].capital - 1.0)
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// A round trip opens at a BUY and closes at the next SELL. It wins when
/// capital after the SELL exceeds capital after the opening BUY.
fn count_round_trips(trades: &[Trade]) -> (usize, usize) {
    let mut open: Option<f64> = None;
    let mut trips = 0usize;
    let mut wins = 0usize;

    for trade in trades {
        match trade.action {
            TradeAction::Buy if open.is_none() => open = Some(trade.capital_after),
            TradeAction::Sell => {
                if let Some(entry) = open.take() {
                    trips += 1;
                    if trade.capital_after > entry {
                        wins += 1;
                    }
                }
            }
            _ => {}
        }
    }
    (trips, wins)
}

/// Capital change over the step ending at each non-HOLD trade, in percent.
fn trade_returns(trades: &[Trade]) -> Vec<TradeExtreme> {
    trades
        .windows(2)
        .filter(|w| w[1].action != TradeAction::Hold && w[0].capital_after > 0.0)
        .map(|w| TradeExtreme {
            date: w[1].date,
            return_pct: (w[1].capital_after / w[0].capital_after - 1.0) * 100.0,
            action: w[1].action,
        })
        .collect()
}
