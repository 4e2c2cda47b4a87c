//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{BatchAnalysis, analyze_indicators};
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, DEFAULT_INITIAL_CAPITAL, build_signal_stream, run_backtest,
};
use crate::domain::config_validation::{
    SIGNAL_SECTION_PREFIX, parse_bool, parse_date, parse_horizons, parse_indicator_list,
    parse_number, parse_thresholds, signal_sections, validate_config,
};
use crate::domain::discretizer::{DEFAULT_BIN_COUNT, MIN_DISCRETIZE_SAMPLES};
use crate::domain::error::InfogainError;
use crate::domain::horizon::{
    DEFAULT_HORIZONS, DEFAULT_TRANSFER_ENTROPY_BINS, HorizonScan, ScanConfig, scan_horizons,
};
use crate::domain::series::Series;
use crate::domain::signal::{IndicatorRule, SignalGenerator};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::SeriesPort;

#[derive(Parser, Debug)]
#[command(name = "infogain", about = "Information-theoretic indicator analysis and backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Score one indicator against forward returns at every horizon
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        indicator: String,
    },
    /// Rank all configured indicators by composite information score
    Rank {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Backtest threshold signals of one indicator or the configured composite
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        indicator: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub asset: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub horizons: Vec<usize>,
    pub scan: ScanConfig,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Score { config, indicator } => run_score(&config, &indicator),
        Command::Rank { config } => run_rank(&config),
        Command::Backtest { config, indicator } => run_backtest_command(&config, indicator.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, InfogainError> {
    FileConfigAdapter::from_file(path).map_err(|e| InfogainError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load and validate in one step.
pub fn load_validated_config(path: &PathBuf) -> Result<FileConfigAdapter, InfogainError> {
    let adapter = load_config(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_data_config(adapter: &dyn ConfigPort) -> Result<DataConfig, InfogainError> {
    let required = |key: &str| {
        adapter
            .get_string("data", key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| InfogainError::ConfigMissing {
                section: "data".into(),
                key: key.into(),
            })
    };

    let dir = PathBuf::from(required("dir")?.trim());
    let asset = required("asset")?.trim().to_string();
    let start_date = parse_date("data", "start_date", adapter.get_string("data", "start_date").as_deref())?;
    let end_date = parse_date("data", "end_date", adapter.get_string("data", "end_date").as_deref())?;
    let indicators = match adapter.get_string("data", "indicators") {
        Some(list) if !list.trim().is_empty() => parse_indicator_list(&list)?,
        _ => Vec::new(),
    };

    Ok(DataConfig {
        dir,
        asset,
        start_date,
        end_date,
        indicators,
    })
}

pub fn build_analysis_config(adapter: &dyn ConfigPort) -> Result<AnalysisConfig, InfogainError> {
    let horizons = match adapter.get_string("analysis", "horizons") {
        Some(h) => parse_horizons(&h)?,
        None => DEFAULT_HORIZONS.to_vec(),
    };
    let transfer_entropy = adapter
        .get_string("analysis", "transfer_entropy")
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false);

    Ok(AnalysisConfig {
        horizons,
        scan: ScanConfig {
            bin_count: parse_number(adapter, "analysis", "bin_count")?.unwrap_or(DEFAULT_BIN_COUNT),
            min_samples: parse_number(adapter, "analysis", "min_samples")?
                .unwrap_or(MIN_DISCRETIZE_SAMPLES),
            transfer_entropy,
            transfer_entropy_bins: parse_number(adapter, "analysis", "transfer_entropy_bins")?
                .unwrap_or(DEFAULT_TRANSFER_ENTROPY_BINS),
        },
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, InfogainError> {
    Ok(BacktestConfig {
        initial_capital: parse_number(adapter, "backtest", "initial_capital")?
            .unwrap_or(DEFAULT_INITIAL_CAPITAL),
    })
}

/// Default registry with every `[signal:<NAME>]` section layered on top.
///
/// A section that omits `weight` inherits the weight of the table it replaces,
/// so overriding thresholds never drops an indicator from the composite.
pub fn build_signal_generator(adapter: &dyn ConfigPort) -> Result<SignalGenerator, InfogainError> {
    let mut generator = SignalGenerator::with_defaults();

    for section in signal_sections(adapter) {
        let name = &section[SIGNAL_SECTION_PREFIX.len()..];
        let raw = adapter
            .get_string(&section, "thresholds")
            .ok_or_else(|| InfogainError::ConfigMissing {
                section: section.clone(),
                key: "thresholds".into(),
            })?;

        let rule = IndicatorRule {
            thresholds: parse_thresholds(&section, &raw)?,
            inverted: adapter.get_bool(&section, "inverted", false),
            // An override without a weight keeps the weight already registered.
            weight: parse_number(adapter, &section, "weight")?
                .or_else(|| generator.rule(name).and_then(|r| r.weight)),
        };
        info!(
            indicator = name,
            inverted = rule.inverted,
            weight = ?rule.weight,
            "registered threshold table"
        );
        generator.register(name, rule);
    }

    Ok(generator)
}

fn fail(err: InfogainError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_validated_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let summary = build_data_config(&adapter).and_then(|data| {
        let analysis = build_analysis_config(&adapter)?;
        let backtest = build_backtest_config(&adapter)?;
        let signals = build_signal_generator(&adapter)?;
        Ok((data, analysis, backtest, signals))
    });

    match summary {
        Ok((data, analysis, backtest, signals)) => {
            println!("Configuration OK: {}", config_path.display());
            println!("  Asset:            {}", data.asset);
            println!("  Period:           {} to {}", data.start_date, data.end_date);
            println!("  Indicators:       {}", data.indicators.len());
            println!("  Horizons:         {:?}", analysis.horizons);
            println!("  Bins:             {}", analysis.scan.bin_count);
            println!("  Initial capital:  {:.2}", backtest.initial_capital);
            println!("  Threshold tables: {}", signals.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_score(config_path: &PathBuf, indicator: &str) -> ExitCode {
    match score_from_config(config_path, indicator) {
        Ok(scan) if scan.scores.is_empty() => {
            print_scan(&scan);
            fail(InfogainError::InsufficientData {
                context: format!("indicator {} (no scorable horizon)", indicator),
                have: 0,
                need: 1,
            })
        }
        Ok(scan) => {
            print_scan(&scan);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_rank(config_path: &PathBuf) -> ExitCode {
    match rank_from_config(config_path) {
        Ok(batch) => {
            print_ranking(&batch);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_backtest_command(config_path: &PathBuf, indicator: Option<&str>) -> ExitCode {
    match backtest_from_config(config_path, indicator) {
        Ok(result) => {
            print_backtest(&result, indicator.unwrap_or("composite"));
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn score_from_config(config_path: &PathBuf, indicator: &str) -> Result<HorizonScan, InfogainError> {
    let adapter = load_validated_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let analysis = build_analysis_config(&adapter)?;
    let port = CsvSeriesAdapter::new(data.dir.clone());

    let price = port.get_price_series(&data.asset, data.start_date, data.end_date)?;
    let series = port.get_series(indicator, data.start_date, data.end_date)?;
    Ok(scan_horizons(&series, &price, &analysis.horizons, &analysis.scan))
}

pub fn rank_from_config(config_path: &PathBuf) -> Result<BatchAnalysis, InfogainError> {
    let adapter = load_validated_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let analysis = build_analysis_config(&adapter)?;
    if data.indicators.is_empty() {
        return Err(InfogainError::ConfigMissing {
            section: "data".into(),
            key: "indicators".into(),
        });
    }

    let port = CsvSeriesAdapter::new(data.dir.clone());
    analyze_indicators(
        &port,
        &data.indicators,
        &data.asset,
        data.start_date,
        data.end_date,
        &analysis.horizons,
        &analysis.scan,
    )
}

pub fn backtest_from_config(
    config_path: &PathBuf,
    indicator: Option<&str>,
) -> Result<BacktestResult, InfogainError> {
    let adapter = load_validated_config(config_path)?;
    let data = build_data_config(&adapter)?;
    let backtest = build_backtest_config(&adapter)?;
    let generator = build_signal_generator(&adapter)?;
    let port = CsvSeriesAdapter::new(data.dir.clone());

    let price = port.get_price_series(&data.asset, data.start_date, data.end_date)?;
    let signals = match indicator {
        Some(id) => {
            let series = port.get_series(id, data.start_date, data.end_date)?;
            generator.signal_series(id, &series)
        }
        None => composite_signals(&port, &generator, &data)?,
    };

    let stream = build_signal_stream(&price, &signals);
    info!(rows = stream.len(), "signal stream built");
    run_backtest(&stream, backtest.initial_capital)
}

/// Composite signal over every configured indicator that could be fetched.
pub fn composite_signals(
    port: &dyn SeriesPort,
    generator: &SignalGenerator,
    data: &DataConfig,
) -> Result<Series, InfogainError> {
    if data.indicators.is_empty() {
        return Err(InfogainError::ConfigMissing {
            section: "data".into(),
            key: "indicators".into(),
        });
    }

    let mut fetched = Vec::new();
    for id in &data.indicators {
        match port.get_series(id, data.start_date, data.end_date) {
            Ok(series) if !series.is_empty() => fetched.push((id.as_str(), series)),
            Ok(_) => warn!(indicator = id.as_str(), "no data, left out of composite"),
            Err(e) => warn!(indicator = id.as_str(), error = %e, "fetch failed, left out of composite"),
        }
    }

    let inputs: Vec<(&str, &Series)> = fetched.iter().map(|(id, s)| (*id, s)).collect();
    let composite = generator.composite_series(&inputs);
    if composite.is_empty() {
        return Err(InfogainError::InsufficientData {
            context: "composite signal".into(),
            have: 0,
            need: 1,
        });
    }
    Ok(composite)
}

fn print_scan(scan: &HorizonScan) {
    println!("=== {} ===", scan.indicator);
    println!(
        "{:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>5}",
        "horizon", "IG", "GR", "SU", "NMI", "corr", "TE", "bins"
    );
    for (h, s) in &scan.scores {
        let te = s
            .transfer_entropy
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>7}d {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8} {:>5}",
            h,
            s.score.information_gain,
            s.score.gain_ratio,
            s.score.symmetric_uncertainty,
            s.score.normalized_mutual_information,
            s.correlation,
            te,
            s.indicator_bins
        );
        for d in &s.diagnostics {
            println!("          note: {}", d);
        }
    }
    for skipped in &scan.skipped {
        println!("{:>7}d skipped: {:?}", skipped.horizon, skipped.reason);
    }
    if let Some(best) = &scan.optimal {
        println!(
            "Optimal horizon: {}d by IG ({:.4}), {}d by NMI ({:.4}), {}d by |corr| ({:.4})",
            best.by_information_gain,
            best.max_information_gain,
            best.by_normalized_mi,
            best.max_normalized_mi,
            best.by_correlation,
            best.max_abs_correlation
        );
    }
}

fn print_ranking(batch: &BatchAnalysis) {
    println!("=== Indicator Ranking ===");
    for (rank, report) in batch.ranked.iter().enumerate() {
        let best = report
            .scan
            .optimal
            .as_ref()
            .map(|o| format!("{}d", o.by_information_gain))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}. {:<32} score {:.4}  best horizon {}",
            rank + 1,
            report.name,
            report.composite_score,
            best
        );
    }
    if !batch.skipped.is_empty() {
        println!("\nSkipped:");
        for s in &batch.skipped {
            println!("  {} ({})", s.name, s.reason);
        }
    }
}

fn print_backtest(result: &BacktestResult, label: &str) {
    let m = &result.metrics;
    println!("=== Backtest: {} ===", label);
    println!("Total Return:     {:.2}%", m.total_return);
    println!("Buy & Hold:       {:.2}%", m.buy_hold_return);
    println!("Excess Return:    {:.2}%", m.excess_return);
    println!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    println!("Max Drawdown:     -{:.1}%", m.max_drawdown);
    println!("Total Trades:     {}", m.total_trades);
    println!("Round Trips:      {}", m.round_trips);
    println!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    println!("Avg Trade Return: {:.2}%", m.avg_trade_return);
    if let Some(best) = &m.best_trade {
        println!("Best Trade:       {} {} {:+.2}%", best.date, best.action, best.return_pct);
    }
    if let Some(worst) = &m.worst_trade {
        println!("Worst Trade:      {} {} {:+.2}%", worst.date, worst.action, worst.return_pct);
    }
}
