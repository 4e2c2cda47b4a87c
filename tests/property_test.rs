//! Property tests for the entropy, alignment, discretization, signal and
//! backtest invariants.

mod common;

use common::*;
use infogain::domain::alignment::{align, align_pair};
use infogain::domain::backtest::{StreamPoint, run_backtest};
use infogain::domain::discretizer::Discretizer;
use infogain::domain::entropy::{InformationScore, entropy};
use infogain::domain::series::{Series, SeriesPoint};
use infogain::domain::signal::SignalGenerator;
use proptest::prelude::*;
use std::collections::HashMap;

fn labelled_pairs() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (1usize..300).prop_flat_map(|n| {
        (
            prop::collection::vec(0usize..6, n),
            prop::collection::vec(0usize..6, n),
        )
    })
}

fn sparse_series(name: &'static str) -> impl Strategy<Value = Series> {
    prop::collection::btree_map(0i64..120, -1e3f64..1e3, 0..80).prop_map(move |m| {
        Series::new(
            name,
            m.into_iter()
                .map(|(day, value)| SeriesPoint {
                    date: start_date() + chrono::Duration::days(day),
                    value,
                })
                .collect(),
        )
        .unwrap()
    })
}

fn stream_from(prices: &[f64], signals: &[f64]) -> Vec<StreamPoint> {
    prices
        .iter()
        .zip(signals)
        .enumerate()
        .map(|(i, (&price, &signal))| StreamPoint {
            date: start_date() + chrono::Duration::days(i as i64),
            price,
            signal,
        })
        .collect()
}

proptest! {
    #[test]
    fn information_gain_bounded_by_target_entropy((x, y) in labelled_pairs()) {
        let score = InformationScore::compute(&x, &y).unwrap();
        prop_assert!(score.information_gain >= 0.0);
        prop_assert!(score.information_gain <= score.target_entropy + 1e-9);
        prop_assert!(score.conditional_entropy >= 0.0);
    }

    #[test]
    fn normalized_scores_in_unit_interval((x, y) in labelled_pairs()) {
        let score = InformationScore::compute(&x, &y).unwrap();
        prop_assert!((0.0..=1.0).contains(&score.symmetric_uncertainty));
        prop_assert!((0.0..=1.0).contains(&score.normalized_mutual_information));
        prop_assert!(score.gain_ratio >= 0.0);
    }

    #[test]
    fn self_information_equals_entropy(x in prop::collection::vec(0usize..8, 1..300)) {
        let score = InformationScore::compute(&x, &x).unwrap();
        prop_assert!((score.information_gain - entropy(&x)).abs() < 1e-9);
    }

    #[test]
    fn discretized_labels_stay_in_range(values in prop::collection::vec(-1e6f64..1e6, 100..400)) {
        let disc = Discretizer::default().discretize(&values).unwrap();
        prop_assert!(disc.effective_bins >= 1 && disc.effective_bins <= 10);
        prop_assert!(disc.labels.iter().all(|&l| l < disc.effective_bins));

        // value-monotonic: a larger value never gets a smaller label
        let mut pairs: Vec<(f64, usize)> = values.iter().copied().zip(disc.labels.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        prop_assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn alignment_is_idempotent(a in sparse_series("a"), b in sparse_series("b")) {
        let frame = align_pair(&a, &b);
        let a2 = Series::from_unordered("a", frame.dates().into_iter().zip(frame.column_at(0))).unwrap();
        let b2 = Series::from_unordered("b", frame.dates().into_iter().zip(frame.column_at(1))).unwrap();

        prop_assert_eq!(align_pair(&a2, &b2), frame.clone());
        prop_assert!(frame.len() <= a.len().min(b.len()));
    }

    #[test]
    fn alignment_rows_invariant_to_input_order(
        a in sparse_series("a"),
        b in sparse_series("b"),
        c in sparse_series("c"),
    ) {
        let abc = align(&[&a, &b, &c]);
        let cab = align(&[&c, &a, &b]);
        prop_assert_eq!(abc.dates(), cab.dates());
        for name in ["a", "b", "c"] {
            prop_assert_eq!(abc.column(name), cab.column(name));
        }
    }

    #[test]
    fn backtest_replay_is_identical(
        moves in prop::collection::vec(-0.05f64..0.05, 1..120),
        signals in prop::collection::vec(-2.0f64..2.0, 120),
    ) {
        let mut price = 100.0;
        let prices: Vec<f64> = moves.iter().map(|m| { price *= 1.0 + m; price }).collect();
        let stream = stream_from(&prices, &signals[..prices.len()]);

        let first = run_backtest(&stream, 10_000.0).unwrap();
        let second = run_backtest(&stream, 10_000.0).unwrap();
        prop_assert_eq!(&first.trades, &second.trades);
        prop_assert_eq!(
            first.equity_curve.last().map(|p| p.capital.to_bits()),
            second.equity_curve.last().map(|p| p.capital.to_bits())
        );
        prop_assert!(first.trades.iter().all(|t| (0.0..=1.0).contains(&t.position)));
    }

    #[test]
    fn constant_price_never_returns(
        price in 1.0f64..1e5,
        signals in prop::collection::vec(-2.0f64..2.0, 1..100),
    ) {
        let prices = vec![price; signals.len()];
        let result = run_backtest(&stream_from(&prices, &signals), 5_000.0).unwrap();
        prop_assert_eq!(result.metrics.total_return, 0.0);
        prop_assert_eq!(result.metrics.max_drawdown, 0.0);
    }

    #[test]
    fn composite_stays_in_signal_range(
        mvrv in -2i8..=2,
        nupl in -2i8..=2,
        sopr in prop::option::of(-2i8..=2),
    ) {
        let generator = SignalGenerator::with_defaults();
        let mut signals = HashMap::new();
        signals.insert("MVRV".to_string(), mvrv);
        signals.insert("NUPL".to_string(), nupl);
        if let Some(s) = sopr {
            signals.insert("SOPR".to_string(), s);
        }
        let c = generator.composite(&signals);
        prop_assert!((-2.0..=2.0).contains(&c));
    }
}
