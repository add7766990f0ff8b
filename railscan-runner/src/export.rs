//! Export: scan results as JSON, walks and bar series as CSV.
//!
//! Persisted JSON carries a `schema_version`; unknown (newer) versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use railscan_core::PriceBar;

use crate::runner::{ScanResult, WalkRow, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &ScanResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize ScanResult to JSON")
}

/// Deserialize a `ScanResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScanResult> {
    let result: ScanResult =
        serde_json::from_str(json).context("failed to deserialize ScanResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Write `{symbol}_{YYYYMMDD}.json` under `output_dir` and return its path.
pub fn save_scan_result(result: &ScanResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let name = format!(
        "{}_{}.json",
        result.symbol.replace(['/', '\\', ' '], "_"),
        result.as_of.format("%Y%m%d")
    );
    let path = output_dir.join(name);
    std::fs::write(&path, export_json(result)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_default()
}

/// One row per evaluated bar.
///
/// Columns: bar_index, timestamp, close, direction, strength, entry, stop,
/// target, probability, sample_count, unresolved_count, risk_reward,
/// low_confidence
pub fn export_walk_csv(rows: &[WalkRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bar_index",
        "timestamp",
        "close",
        "direction",
        "strength",
        "entry",
        "stop",
        "target",
        "probability",
        "sample_count",
        "unresolved_count",
        "risk_reward",
        "low_confidence",
    ])?;

    for r in rows {
        wtr.write_record([
            &r.bar_index.to_string(),
            &r.timestamp.to_rfc3339(),
            &format!("{:.6}", r.close),
            &format!("{:?}", r.direction).to_uppercase(),
            &format!("{:?}", r.strength).to_uppercase(),
            &format!("{:.6}", r.entry_price),
            &opt(r.stop_price, 6),
            &opt(r.target_price, 6),
            &opt(r.probability, 4),
            &r.sample_count.to_string(),
            &r.unresolved_count.to_string(),
            &opt(r.risk_reward_ratio, 4),
            &r.low_confidence.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Bars in the same layout `CsvProvider` reads.
pub fn export_bars_csv(bars: &[PriceBar]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        wtr.write_record([
            b.timestamp.to_rfc3339(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
