//! Deterministic identities for configs, datasets and cached results.
//!
//! - `ConfigHash`: BLAKE3 of the canonical JSON of a validated `ScanConfig`,
//!   with the `parallel` switch normalised out.
//! - `DatasetHash`: BLAKE3 of the raw bar fields, in order.
//! - `ResultKey`: combination of both; keys the runner's result cache.
//!
//! BLAKE3 keeps the hashes stable across builds and platforms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScanConfig;
use crate::domain::PriceBar;
use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of(config: &ScanConfig) -> Result<Self, ScanError> {
        // Sequential and parallel scans produce identical results.
        let normalised = config.clone().with_parallelism(false);
        let canonical = serde_json::to_string(&normalised)
            .map_err(|e| ScanError::invalid_config(format!("config does not serialize: {e}")))?;
        Ok(Self(blake3::hash(canonical.as_bytes()).to_hex().to_string()))
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(bars: &[PriceBar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in bars {
            hasher.update(&bar.timestamp.timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one scan result: same data + same config = same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub dataset_hash: DatasetHash,
    pub config_hash: ConfigHash,
}

impl ResultKey {
    pub fn new(dataset_hash: DatasetHash, config_hash: ConfigHash) -> Self {
        Self {
            dataset_hash,
            config_hash,
        }
    }

    /// Hex digest suitable for a file name.
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.dataset_hash.0.as_bytes());
        hasher.update(b":");
        hasher.update(self.config_hash.0.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset_hash, self.config_hash)
    }
}
