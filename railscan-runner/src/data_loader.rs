//! Bar loading and data resolution for the runner.
//!
//! Implements the fallback policy:
//! 1. If a CSV path is given and exists → load it
//! 2. If not and synthetic bars were requested → generate them (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode. Results produced on it carry
//! `synthetic = true`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use railscan_core::data::{DataError, DataSource, LoadedSeries, PriceSeriesProvider};
use railscan_core::fingerprint::DatasetHash;
use railscan_core::{PriceBar, PriceSeries, ScanError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data file for '{symbol}' (use --data FILE or --synthetic N)")]
    NoData { symbol: String },

    #[error("data file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl LoadError {
    /// The underlying scan error, if the series itself was rejected.
    pub fn scan_error(&self) -> Option<&ScanError> {
        match self {
            Self::Data(DataError::Series(e)) => Some(e),
            _ => None,
        }
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "Date", alias = "Timestamp")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(default, alias = "Volume")]
    volume: Option<f64>,
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// One CSV file holding a single symbol's bars, oldest first.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bars(&self) -> Result<Vec<PriceBar>, DataError> {
        let io_err = |e: &dyn std::fmt::Display| DataError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| io_err(&e))?;

        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            // Row 1 is the header.
            let row_no = i + 2;
            let row = row.map_err(|e| DataError::Parse {
                row: row_no,
                reason: e.to_string(),
            })?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Parse {
                row: row_no,
                reason: format!("unrecognised timestamp '{}'", row.timestamp),
            })?;
            bars.push(PriceBar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            });
        }
        Ok(bars)
    }
}

impl PriceSeriesProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, symbol: &str) -> Result<LoadedSeries, DataError> {
        let bars = self.read_bars()?;
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        Ok(LoadedSeries {
            symbol: symbol.to_string(),
            series: PriceSeries::new(bars)?,
            source: DataSource::Csv,
        })
    }
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Seeded random-walk bars on weekdays, starting at 100.0.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl SyntheticProvider {
    pub fn new(bars: usize, seed: u64) -> Self {
        Self {
            bars,
            seed,
            start: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default(),
        }
    }

    /// Generate the bars for `symbol`. Same symbol + seed = same bars.
    pub fn generate(&self, symbol: &str) -> Vec<PriceBar> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&self.seed.to_le_bytes());
        let seed: [u8; 32] = *hasher.finalize().as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut bars = Vec::with_capacity(self.bars);
        let mut price = 100.0_f64;
        let mut current = self.start;

        while bars.len() < self.bars {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

            bars.push(PriceBar {
                timestamp: current.and_time(NaiveTime::MIN).and_utc(),
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            current += Duration::days(1);
        }
        bars
    }
}

impl PriceSeriesProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, symbol: &str) -> Result<LoadedSeries, DataError> {
        if self.bars == 0 {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        Ok(LoadedSeries {
            symbol: symbol.to_string(),
            series: PriceSeries::new(self.generate(symbol))?,
            source: DataSource::Synthetic,
        })
    }
}

// ── Resolution ───────────────────────────────────────────────────────

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// CSV file to read.
    pub path: Option<PathBuf>,
    /// Label for the series; defaults to the CSV file stem, then "SYNTH".
    pub symbol: Option<String>,
    /// Bars to generate when no file is available.
    pub synthetic_bars: Option<usize>,
    pub seed: u64,
}

impl LoadOptions {
    pub fn symbol(&self) -> String {
        if let Some(symbol) = &self.symbol {
            return symbol.clone();
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| "SYNTH".to_string())
    }
}

/// Result of loading bars, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub loaded: LoadedSeries,
    /// BLAKE3 over all bar data.
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
}

impl LoadedData {
    pub fn series(&self) -> &PriceSeries {
        &self.loaded.series
    }

    pub fn symbol(&self) -> &str {
        &self.loaded.symbol
    }
}

/// Load one series, following the fallback policy.
pub fn load_series(opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let symbol = opts.symbol();

    let loaded = match (&opts.path, opts.synthetic_bars) {
        (Some(path), _) if path.exists() => CsvProvider::new(path).load(&symbol)?,
        (path, Some(n)) => {
            if let Some(path) = path {
                warn!(path = %path.display(), "data file missing, falling back to synthetic bars");
            }
            warn!(
                symbol = %symbol,
                bars = n,
                "generating synthetic data; results will be tagged as synthetic"
            );
            SyntheticProvider::new(n, opts.seed).load(&symbol)?
        }
        (Some(path), None) => return Err(LoadError::FileNotFound(path.clone())),
        (None, None) => return Err(LoadError::NoData { symbol }),
    };

    let dataset_hash = DatasetHash::of(loaded.series.bars());
    let has_synthetic = loaded.source.is_synthetic();
    info!(
        symbol = %loaded.symbol,
        bars = loaded.series.len(),
        source = ?loaded.source,
        "series loaded"
    );
    Ok(LoadedData {
        loaded,
        dataset_hash,
        has_synthetic,
    })
}
