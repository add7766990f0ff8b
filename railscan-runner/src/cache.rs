//! Result caching with JSON storage and hash-based deduplication.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use railscan_core::fingerprint::{ConfigHash, ResultKey};
use railscan_core::{CancelToken, ScanConfig};
use tracing::info;

use crate::data_loader::LoadedData;
use crate::runner::{run_scan, ScanResult};

/// Cache for scan results.
///
/// Results are keyed by `ResultKey` (dataset hash + config hash), so an
/// identical series scanned with an identical config is never recomputed.
#[derive(Clone)]
pub struct ResultCache {
    cache_dir: PathBuf,
}

impl ResultCache {
    /// Creates a new cache with the specified directory.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn contains(&self, key: &ResultKey) -> bool {
        self.result_path(key).exists()
    }

    /// Returns `None` if the result is not cached.
    pub fn get(&self, key: &ResultKey) -> Result<Option<ScanResult>> {
        let path = self.result_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path).context("Failed to read cached result")?;
        let result: ScanResult =
            serde_json::from_str(&json).context("Failed to deserialize cached result")?;

        Ok(Some(result))
    }

    pub fn put(&self, result: &ScanResult) -> Result<()> {
        let path = self.result_path(&result.key());
        let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
        std::fs::write(&path, json).context("Failed to write cached result")?;
        Ok(())
    }

    /// Return the cached result for `data` + `config`, or scan and store it.
    /// The flag is true on a cache hit.
    ///
    /// The key covers bar content only, so a hit is relabelled with the
    /// caller's symbol and provenance.
    pub fn get_or_scan(
        &self,
        data: &LoadedData,
        config: &ScanConfig,
        cancel: &CancelToken,
    ) -> Result<(ScanResult, bool)> {
        let key = ResultKey::new(data.dataset_hash.clone(), ConfigHash::of(config)?);
        if let Some(mut cached) = self.get(&key)? {
            info!(key = %key, symbol = data.symbol(), "cache hit");
            cached.symbol = data.symbol().to_string();
            cached.synthetic = data.has_synthetic;
            return Ok((cached, true));
        }
        let result = run_scan(data, config, cancel)?;
        self.put(&result)?;
        Ok((result, false))
    }

    pub fn remove(&self, key: &ResultKey) -> Result<()> {
        let path = self.result_path(key);

        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove cached result")?;
        }

        Ok(())
    }

    /// Clears all cached results.
    pub fn clear(&self) -> Result<()> {
        for path in self.entries()? {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Returns the number of cached results.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Total bytes used by cached results.
    pub fn size_bytes(&self) -> Result<u64> {
        let mut total = 0;
        for path in self.entries()? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        let paths = std::fs::read_dir(&self.cache_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json")
            })
            .collect();
        Ok(paths)
    }

    fn result_path(&self, key: &ResultKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.hash()))
    }
}
