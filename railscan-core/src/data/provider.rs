//! Price series provider trait and structured error types.
//!
//! `PriceSeriesProvider` abstracts over where bars come from (CSV files,
//! seeded synthetic walks, in-memory fixtures) so the scan never cares.
//! Every provider hands back a validated `PriceSeries`: bars are never
//! re-sorted, and out-of-order input surfaces as `ScanError::OutOfOrderData`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PriceBar, PriceSeries};
use crate::error::ScanError;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("I/O error reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parse error at row {row}: {reason}")]
    Parse { row: usize, reason: String },

    #[error("no bars for symbol '{symbol}'")]
    Empty { symbol: String },

    #[error(transparent)]
    Series(#[from] ScanError),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    Csv,
    Synthetic,
    Memory,
}

impl DataSource {
    pub fn is_synthetic(self) -> bool {
        self == Self::Synthetic
    }
}

/// A loaded series plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub series: PriceSeries,
    pub source: DataSource,
}

pub trait PriceSeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Load the full ordered bar history for `symbol`.
    fn load(&self, symbol: &str) -> Result<LoadedSeries, DataError>;
}

/// Fixed bars keyed by symbol. Handy for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }
}

impl PriceSeriesProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, symbol: &str) -> Result<LoadedSeries, DataError> {
        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        Ok(LoadedSeries {
            symbol: symbol.to_string(),
            series: PriceSeries::new(bars.clone())?,
            source: DataSource::Memory,
        })
    }
}
