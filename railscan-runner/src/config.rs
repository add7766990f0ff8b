//! TOML scan files.
//!
//! A scan file carries an optional `[data]` table (where the bars come from)
//! plus the `[channel]`, `[signal]` and `[probability]` tables of
//! `ScanParams`. Every table and key is optional; omitted values take the
//! defaults.
//!
//! ```toml
//! [data]
//! path = "data/spy.csv"
//! symbol = "SPY"
//!
//! [channel]
//! window_length = 120
//! price_scale = "LOG"
//!
//! [probability]
//! tp_distance = { type = "PERCENT", value = 0.03 }
//! tie_break_policy = "OPTIMISTIC"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use railscan_core::{ScanConfig, ScanError, ScanParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ScanError),
}

/// The `[data]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// CSV file with `timestamp,open,high,low,close[,volume]` rows.
    pub path: Option<PathBuf>,
    /// Label for reports; defaults to the file stem.
    pub symbol: Option<String>,
    /// Generate this many synthetic bars when no file is available.
    pub synthetic_bars: Option<usize>,
    pub seed: u64,
}

/// A whole scan file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanFile {
    pub data: DataSection,
    #[serde(flatten)]
    pub params: ScanParams,
}

impl ScanFile {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the parameter tables.
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        Ok(ScanConfig::new(self.params.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railscan_core::{Distance, PriceScale, TieBreakPolicy};

    #[test]
    fn empty_file_is_all_defaults() {
        let file = ScanFile::from_toml_str("").unwrap();
        assert_eq!(file, ScanFile::default());
        assert_eq!(file.scan_config().unwrap(), ScanConfig::default());
    }

    #[test]
    fn parses_partial_tables() {
        let file = ScanFile::from_toml_str(
            r#"
            [data]
            path = "data/spy.csv"
            symbol = "SPY"

            [channel]
            window_length = 120
            price_scale = "LOG"

            [probability]
            tp_distance = { type = "PERCENT", value = 0.03 }
            sl_distance = { type = "PRICE", value = 1.5 }
            tie_break_policy = "OPTIMISTIC"
            "#,
        )
        .unwrap();

        assert_eq!(file.data.symbol.as_deref(), Some("SPY"));
        assert_eq!(file.data.path, Some(PathBuf::from("data/spy.csv")));
        let cfg = file.scan_config().unwrap();
        assert_eq!(cfg.window_length(), 120);
        assert_eq!(cfg.channel().price_scale, PriceScale::Log);
        assert_eq!(cfg.probability().tp_distance, Distance::percent(0.03));
        assert_eq!(cfg.probability().sl_distance, Distance::price(1.5));
        assert_eq!(
            cfg.probability().tie_break_policy,
            TieBreakPolicy::Optimistic
        );
        // Untouched keys keep their defaults.
        assert_eq!(cfg.horizon_bars(), 20);
        assert_eq!(cfg.signal().velocity_lookback, 3);
    }

    #[test]
    fn invalid_values_are_rejected_at_validation() {
        let file = ScanFile::from_toml_str("[channel]\nwindow_length = 1\n").unwrap();
        assert!(matches!(
            file.scan_config(),
            Err(ConfigError::Invalid(ScanError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ScanFile::from_toml_str("[channel\nwindow_length = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let mut file = ScanFile::default();
        file.data.symbol = Some("QQQ".into());
        file.params.signal.proximity_threshold = 0.01;
        let text = file.to_toml_string().unwrap();
        assert_eq!(ScanFile::from_toml_str(&text).unwrap(), file);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ScanFile::load(dir.path().join("nope.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
