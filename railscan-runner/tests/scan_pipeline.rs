//! Integration tests for the runner: scan file → data → scan → cache/export.

use std::path::Path;

use railscan_core::{CancelToken, Direction, ScanError};
use railscan_runner::data_loader::SyntheticProvider;
use railscan_runner::export::{
    export_bars_csv, export_walk_csv, import_json, save_scan_result, write_file,
};
use railscan_runner::{
    load_series, run_scan, run_scan_file, run_walk, LoadError, LoadOptions, ResultCache, RunError,
    ScanFile,
};

fn write_synthetic_csv(dir: &Path, name: &str, bars: usize, seed: u64) -> std::path::PathBuf {
    let path = dir.join(name);
    let series = SyntheticProvider::new(bars, seed).generate("FIXTURE");
    write_file(&path, &export_bars_csv(&series).unwrap()).unwrap();
    path
}

const SCAN_TOML: &str = r#"
[channel]
window_length = 50

[probability]
horizon_bars = 10
min_sample_count = 5
"#;

#[test]
fn scan_file_drives_a_csv_scan() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_synthetic_csv(dir.path(), "fixture.csv", 250, 1);
    let mut file = ScanFile::from_toml_str(SCAN_TOML).unwrap();
    file.data.path = Some(csv);

    let result = run_scan_file(&file, &LoadOptions::default(), &CancelToken::new()).unwrap();
    assert_eq!(result.symbol, "FIXTURE");
    assert_eq!(result.bar_count, 250);
    assert!(!result.synthetic);
    assert_eq!(result.channel.window_len(), 50);
    if result.report.signal.direction() == Direction::Hold {
        assert!(result.report.stop_price.is_none());
        assert!(result.entry_zone.is_none());
    } else {
        assert!(result.report.stop_price.is_some());
        assert!(result.entry_zone.is_some());
    }
}

#[test]
fn same_data_and_config_hit_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_synthetic_csv(dir.path(), "fixture.csv", 200, 2);
    let cache = ResultCache::new(dir.path().join("cache")).unwrap();
    let file = ScanFile::from_toml_str(SCAN_TOML).unwrap();
    let opts = LoadOptions {
        path: Some(csv),
        ..Default::default()
    };

    let first = run_scan_file(&file, &opts, &CancelToken::new()).unwrap();
    assert!(!cache.contains(&first.key()));
    cache.put(&first).unwrap();

    let second = run_scan_file(&file, &opts, &CancelToken::new()).unwrap();
    assert_eq!(first.key(), second.key());
    assert!(cache.contains(&second.key()));

    let mut other = file.clone();
    other.params.signal.proximity_threshold = 0.01;
    let third = run_scan_file(&other, &opts, &CancelToken::new()).unwrap();
    assert_ne!(first.key(), third.key());
    assert!(!cache.contains(&third.key()));
}

#[test]
fn saved_json_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let data = load_series(&LoadOptions {
        symbol: Some("QQQ".into()),
        synthetic_bars: Some(200),
        seed: 11,
        ..Default::default()
    })
    .unwrap();
    let file = ScanFile::from_toml_str(SCAN_TOML).unwrap();
    let result = run_scan(&data, &file.scan_config().unwrap(), &CancelToken::new()).unwrap();

    let path = save_scan_result(&result, &dir.path().join("out")).unwrap();
    let loaded = import_json(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(loaded.key(), result.key());
    assert!(loaded.synthetic);
}

#[test]
fn walk_export_covers_requested_bars() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_synthetic_csv(dir.path(), "walk.csv", 180, 3);
    let data = load_series(&LoadOptions {
        path: Some(csv),
        ..Default::default()
    })
    .unwrap();
    let config = ScanFile::from_toml_str(SCAN_TOML).unwrap().scan_config().unwrap();

    let rows = run_walk(&data, &config, Some(25), &CancelToken::new()).unwrap();
    assert_eq!(rows.len(), 25);
    assert_eq!(rows.last().unwrap().bar_index, 179);
    for row in &rows {
        assert_eq!(row.stop_price.is_some(), row.direction != Direction::Hold);
        if let Some(p) = row.probability {
            assert!((0.0..=1.0).contains(&p));
            assert!(row.sample_count > 0);
        }
    }
    let csv = export_walk_csv(&rows).unwrap();
    assert_eq!(csv.lines().count(), 26);
}

#[test]
fn out_of_order_csv_surfaces_as_fatal_scan_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        "timestamp,open,high,low,close\n\
         2024-01-03,101,103,100,102\n\
         2024-01-02,100,102,99,101\n",
    )
    .unwrap();
    let file = ScanFile::default();
    let err = run_scan_file(
        &file,
        &LoadOptions {
            path: Some(path),
            ..Default::default()
        },
        &CancelToken::new(),
    )
    .unwrap_err();
    match err {
        RunError::Data(ref e @ LoadError::Data(_)) => {
            assert!(matches!(e.scan_error(), Some(ScanError::OutOfOrderData { .. })));
        }
        other => panic!("expected out-of-order data error, got {other}"),
    }
}

#[test]
fn cancelled_walk_stops() {
    let data = load_series(&LoadOptions {
        synthetic_bars: Some(120),
        ..Default::default()
    })
    .unwrap();
    let config = ScanFile::from_toml_str(SCAN_TOML).unwrap().scan_config().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        run_walk(&data, &config, None, &cancel),
        Err(RunError::Scan(ScanError::Cancelled))
    ));
}
