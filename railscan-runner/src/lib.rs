//! RailScan Runner: data loading, scan files, orchestration, caching, export.
//!
//! This crate builds on `railscan-core` to provide:
//! - CSV and seeded synthetic series providers with a fallback policy
//! - TOML scan files (`[data]`, `[channel]`, `[signal]`, `[probability]`)
//! - One-shot scans with provenance, and bar-by-bar walks
//! - A JSON result cache keyed by dataset + config hash
//! - JSON/CSV export

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use cache::ResultCache;
pub use config::{ConfigError, DataSection, ScanFile};
pub use data_loader::{
    load_series, CsvProvider, LoadError, LoadOptions, LoadedData, SyntheticProvider,
};
pub use runner::{
    merge_load_options, run_scan, run_scan_file, run_walk, EntryZone, RunError, ScanResult, WalkRow,
    SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scan_result_is_send_sync() {
        assert_send::<ScanResult>();
        assert_sync::<ScanResult>();
        assert_send::<WalkRow>();
        assert_sync::<WalkRow>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScanFile>();
        assert_sync::<ScanFile>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<CsvProvider>();
        assert_sync::<CsvProvider>();
        assert_send::<SyntheticProvider>();
        assert_sync::<SyntheticProvider>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
