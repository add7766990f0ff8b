//! Scan orchestration: one-shot scans and bar-by-bar walks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use railscan_core::channel::DEFAULT_SIGMA_MULTIPLES;
use railscan_core::fingerprint::{ConfigHash, DatasetHash, ResultKey};
use railscan_core::{
    assemble, evaluate, CancelToken, ChannelClassifier, Direction, IncrementalScanner, RailHint,
    RailLevels, RegressionChannel, ScanConfig, ScanError, SignalReport, Strength, TieBreakPolicy,
};

use crate::config::{ConfigError, ScanFile};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Price band where an entry is considered reasonable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub low: f64,
    pub high: f64,
}

impl EntryZone {
    /// LONG: between support and the midline. SHORT: between the midline
    /// and resistance. HOLD: none.
    pub fn for_direction(direction: Direction, hint: &RailHint) -> Option<Self> {
        let (a, b) = match direction {
            Direction::Long => (hint.support, hint.mid),
            Direction::Short => (hint.mid, hint.resist),
            Direction::Hold => return None,
        };
        Some(Self {
            low: a.min(b),
            high: a.max(b),
        })
    }

    pub fn contains(&self, price: f64) -> bool {
        (self.low..=self.high).contains(&price)
    }
}

/// Complete result of scanning one series at its latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub bar_count: usize,
    pub report: SignalReport,
    pub channel: RegressionChannel,
    pub rails: RailLevels,
    pub rail_hint: Option<RailHint>,
    pub entry_zone: Option<EntryZone>,
    /// 0.0 at the lower rail, 1.0 at the upper.
    pub channel_position: f64,
    pub slope_pct_per_bar: f64,
    pub avg_bars_to_resolution: Option<f64>,
    pub avg_return_pct: Option<f64>,
    pub tie_break_policy: TieBreakPolicy,
    pub dataset_hash: String,
    pub config_hash: String,
    pub synthetic: bool,
}

impl ScanResult {
    pub fn key(&self) -> ResultKey {
        ResultKey::new(
            DatasetHash(self.dataset_hash.clone()),
            ConfigHash(self.config_hash.clone()),
        )
    }
}

/// Scan an already-loaded series at its latest bar. No I/O.
pub fn run_scan(
    data: &LoadedData,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<ScanResult, RunError> {
    let series = data.series();
    let eval = evaluate(series, config, cancel)?;
    let as_of = eval.signal.bar_index();
    let bar = series.bars()[as_of];

    let rails = eval.channel.levels_at(as_of);
    let rail_hint = RailHint::nearest(&eval.channel, as_of, bar.close, &DEFAULT_SIGMA_MULTIPLES);
    let entry_zone = rail_hint
        .as_ref()
        .and_then(|hint| EntryZone::for_direction(eval.signal.direction(), hint));

    if data.has_synthetic {
        warn!(symbol = data.symbol(), "scan result rests on synthetic data");
    }
    info!(
        symbol = data.symbol(),
        direction = ?eval.signal.direction(),
        strength = ?eval.signal.strength(),
        probability = ?eval.report.probability.value(),
        samples = eval.report.sample_count,
        "scan complete"
    );

    Ok(ScanResult {
        schema_version: SCHEMA_VERSION,
        symbol: data.symbol().to_string(),
        as_of: bar.timestamp,
        bar_count: series.len(),
        report: eval.report,
        channel: eval.channel,
        rails,
        rail_hint,
        entry_zone,
        channel_position: rails.position_of(bar.close),
        slope_pct_per_bar: eval.channel.slope_pct_per_bar(),
        avg_bars_to_resolution: eval.estimate.avg_bars_to_resolution,
        avg_return_pct: eval.estimate.avg_return_pct,
        tie_break_policy: config.probability().tie_break_policy,
        dataset_hash: data.dataset_hash.to_string(),
        config_hash: ConfigHash::of(config)?.to_string(),
        synthetic: data.has_synthetic,
    })
}

/// Load data per `opts` (overridden by the file's `[data]` table where the
/// options leave a field unset) and scan it.
pub fn run_scan_file(
    file: &ScanFile,
    opts: &LoadOptions,
    cancel: &CancelToken,
) -> Result<ScanResult, RunError> {
    let config = file.scan_config()?;
    let data = load_series(&merge_load_options(file, opts))?;
    run_scan(&data, &config, cancel)
}

/// Command-line options win; the scan file fills the gaps.
pub fn merge_load_options(file: &ScanFile, opts: &LoadOptions) -> LoadOptions {
    LoadOptions {
        path: opts.path.clone().or_else(|| file.data.path.clone()),
        symbol: opts.symbol.clone().or_else(|| file.data.symbol.clone()),
        synthetic_bars: opts.synthetic_bars.or(file.data.synthetic_bars),
        seed: if opts.seed != 0 { opts.seed } else { file.data.seed },
    }
}

/// One evaluated bar of a walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkRow {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub direction: Direction,
    pub strength: Strength,
    pub entry_price: f64,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub probability: Option<f64>,
    pub sample_count: usize,
    pub unresolved_count: usize,
    pub risk_reward_ratio: Option<f64>,
    pub low_confidence: bool,
}

impl WalkRow {
    fn from_report(report: &SignalReport, timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            bar_index: report.signal.bar_index(),
            timestamp,
            close,
            direction: report.signal.direction(),
            strength: report.signal.strength(),
            entry_price: report.entry_price,
            stop_price: report.stop_price,
            target_price: report.target_price,
            probability: report.probability.value(),
            sample_count: report.sample_count,
            unresolved_count: report.unresolved_count,
            risk_reward_ratio: report.risk_reward_ratio,
            low_confidence: report.low_confidence,
        }
    }
}

/// Replay the series bar by bar through the incremental scanner and report
/// the last `last_n` bars (all bars when `None`). Bars before warmup are
/// skipped.
///
/// Each row equals what a one-shot scan of the series truncated at that bar
/// would report.
pub fn run_walk(
    data: &LoadedData,
    config: &ScanConfig,
    last_n: Option<usize>,
    cancel: &CancelToken,
) -> Result<Vec<WalkRow>, RunError> {
    let bars = data.series().bars();
    let first_reported = last_n.map_or(0, |n| bars.len().saturating_sub(n));
    let condition_on_strength = config.probability().condition_on_strength;
    let mut scanner =
        IncrementalScanner::new(ChannelClassifier::new(config), config.probability().clone());

    let mut rows = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        cancel.check()?;
        let Some(signal) = scanner.push(*bar)? else {
            continue;
        };
        if i < first_reported {
            continue;
        }
        let estimate = scanner.estimate(signal.key(condition_on_strength))?;
        let report = assemble(signal, bars, &estimate, config)?;
        rows.push(WalkRow::from_report(&report, bar.timestamp, bar.close));
    }

    let actionable = rows.iter().filter(|r| r.direction != Direction::Hold).count();
    info!(
        symbol = data.symbol(),
        rows = rows.len(),
        actionable,
        "walk complete"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use railscan_core::{evaluate_at, ScanParams};

    fn synthetic(n: usize, seed: u64) -> LoadedData {
        load_series(&LoadOptions {
            symbol: Some("TEST".into()),
            synthetic_bars: Some(n),
            seed,
            ..Default::default()
        })
        .unwrap()
    }

    fn config() -> ScanConfig {
        let mut params = ScanParams::default();
        params.channel.window_length = 40;
        params.probability.horizon_bars = 10;
        params.probability.min_sample_count = 5;
        ScanConfig::new(params).unwrap()
    }

    #[test]
    fn scan_result_carries_provenance() {
        let data = synthetic(300, 1);
        let result = run_scan(&data, &config(), &CancelToken::new()).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.symbol, "TEST");
        assert_eq!(result.bar_count, 300);
        assert!(result.synthetic);
        assert_eq!(result.dataset_hash, data.dataset_hash.to_string());
        assert_eq!(result.config_hash.len(), 64);
        assert_eq!(result.as_of, data.series().bars()[299].timestamp);
        assert!(result.rails.upper > result.rails.lower);
        assert_eq!(result.entry_zone.is_some(), result.report.is_actionable());
    }

    #[test]
    fn insufficient_history_is_a_scan_error() {
        let data = synthetic(20, 1);
        assert!(matches!(
            run_scan(&data, &config(), &CancelToken::new()),
            Err(RunError::Scan(ScanError::InsufficientData { .. }))
        ));
    }

    #[test]
    fn walk_rows_match_one_shot_scans() {
        let data = synthetic(200, 5);
        let cfg = config();
        let cancel = CancelToken::new();
        let rows = run_walk(&data, &cfg, Some(30), &cancel).unwrap();
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[0].bar_index, 170);

        for row in &rows {
            let eval = evaluate_at(data.series().bars(), row.bar_index, &cfg, &cancel).unwrap();
            assert_eq!(row.direction, eval.report.signal.direction());
            assert_eq!(row.probability, eval.report.probability.value());
            assert_eq!(row.sample_count, eval.report.sample_count);
            assert_eq!(row.unresolved_count, eval.report.unresolved_count);
            assert_eq!(row.low_confidence, eval.report.low_confidence);
        }
    }

    #[test]
    fn walk_skips_warmup_bars() {
        let data = synthetic(60, 9);
        let rows = run_walk(&data, &config(), None, &CancelToken::new()).unwrap();
        // Window 40: bars 39..=59 classify.
        assert_eq!(rows.len(), 21);
        assert_eq!(rows[0].bar_index, 39);
    }

    #[test]
    fn entry_zone_by_direction() {
        let hint = RailHint {
            support_k: -1.0,
            support: 95.0,
            resist_k: 1.0,
            resist: 105.0,
            mid: 100.0,
        };
        let long = EntryZone::for_direction(Direction::Long, &hint).unwrap();
        assert_eq!((long.low, long.high), (95.0, 100.0));
        let short = EntryZone::for_direction(Direction::Short, &hint).unwrap();
        assert_eq!((short.low, short.high), (100.0, 105.0));
        assert!(short.contains(102.0));
        assert!(EntryZone::for_direction(Direction::Hold, &hint).is_none());
    }

    #[test]
    fn cli_options_override_file_data_table() {
        let mut file = ScanFile::default();
        file.data.symbol = Some("FILE".into());
        file.data.synthetic_bars = Some(100);
        file.data.seed = 3;
        let opts = LoadOptions {
            symbol: Some("CLI".into()),
            ..Default::default()
        };
        let merged = merge_load_options(&file, &opts);
        assert_eq!(merged.symbol.as_deref(), Some("CLI"));
        assert_eq!(merged.synthetic_bars, Some(100));
        assert_eq!(merged.seed, 3);
    }
}
