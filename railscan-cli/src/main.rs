//! RailScan CLI: scan, walk, synthetic data, and cache management commands.
//!
//! Commands:
//! - `scan`: evaluate the latest bar of a series and write the result JSON
//! - `walk`: replay a series bar by bar and export per-bar reports as CSV
//! - `synth`: write a seeded synthetic series as CSV
//! - `cache status` / `cache clear`: inspect or empty the result cache

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railscan_core::{CancelToken, Direction};
use railscan_runner::export::{export_bars_csv, export_walk_csv, save_scan_result, write_file};
use railscan_runner::{
    load_series, merge_load_options, run_scan, run_walk, LoadOptions, ResultCache, ScanFile,
    ScanResult, SyntheticProvider,
};

#[derive(Parser)]
#[command(
    name = "railscan",
    about = "RailScan CLI: regression channel signals with historical hit rates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the latest bar of a series and write the result JSON.
    Scan {
        /// CSV file with timestamp,open,high,low,close[,volume] columns.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Symbol label. Defaults to the CSV file stem.
        #[arg(long)]
        symbol: Option<String>,

        /// TOML scan file ([data], [channel], [signal], [probability]).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Generate this many synthetic bars when no data file is available.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output directory for result JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Result cache directory. No caching when omitted.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Replay a series bar by bar and export the last N reports as CSV.
    Walk {
        /// CSV file with timestamp,open,high,low,close[,volume] columns.
        #[arg(long)]
        data: Option<PathBuf>,

        /// TOML scan file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of trailing bars to report. All bars when omitted.
        #[arg(long)]
        last: Option<usize>,

        /// Output CSV path.
        #[arg(long, default_value = "walk.csv")]
        out: PathBuf,

        /// Generate this many synthetic bars when no data file is available.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic data.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Write a seeded synthetic series as CSV.
    Synth {
        /// Number of bars.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed. The same seed and symbol always give the same bars.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Symbol label mixed into the seed.
        #[arg(long, default_value = "SYNTH")]
        symbol: String,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Result cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached result count and size.
    Status {
        /// Cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
    /// Remove every cached result.
    Clear {
        /// Cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            data,
            symbol,
            config,
            synthetic,
            seed,
            output_dir,
            cache_dir,
        } => {
            let opts = LoadOptions {
                path: data,
                symbol,
                synthetic_bars: synthetic,
                seed,
            };
            run_scan_cmd(config.as_deref(), &opts, &output_dir, cache_dir.as_deref())
        }
        Commands::Walk {
            data,
            config,
            last,
            out,
            synthetic,
            seed,
        } => {
            let opts = LoadOptions {
                path: data,
                symbol: None,
                synthetic_bars: synthetic,
                seed,
            };
            run_walk_cmd(config.as_deref(), &opts, last, &out)
        }
        Commands::Synth {
            bars,
            seed,
            symbol,
            out,
        } => run_synth(bars, seed, &symbol, &out),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clear { cache_dir } => run_cache_clear(&cache_dir),
        },
    }
}

fn load_scan_file(path: Option<&Path>) -> Result<ScanFile> {
    match path {
        Some(path) => ScanFile::load(path)
            .with_context(|| format!("failed to load scan file {}", path.display())),
        None => Ok(ScanFile::default()),
    }
}

fn run_scan_cmd(
    config_path: Option<&Path>,
    opts: &LoadOptions,
    output_dir: &Path,
    cache_dir: Option<&Path>,
) -> Result<()> {
    let file = load_scan_file(config_path)?;
    let config = file.scan_config()?;
    let data = load_series(&merge_load_options(&file, opts))?;

    let cancel = CancelToken::new();
    let result = match cache_dir {
        Some(dir) => ResultCache::new(dir)?.get_or_scan(&data, &config, &cancel)?.0,
        None => run_scan(&data, &config, &cancel)?,
    };

    print_summary(&result);

    let path = save_scan_result(&result, output_dir)?;
    println!("Result saved to: {}", path.display());
    Ok(())
}

fn run_walk_cmd(
    config_path: Option<&Path>,
    opts: &LoadOptions,
    last: Option<usize>,
    out: &Path,
) -> Result<()> {
    let file = load_scan_file(config_path)?;
    let config = file.scan_config()?;
    let data = load_series(&merge_load_options(&file, opts))?;

    let rows = run_walk(&data, &config, last, &CancelToken::new())?;
    write_file(out, &export_walk_csv(&rows)?)?;

    let actionable = rows
        .iter()
        .filter(|r| r.direction != Direction::Hold)
        .count();
    println!(
        "Walked {} bars of {} ({} signals). Written to: {}",
        rows.len(),
        data.symbol(),
        actionable,
        out.display()
    );
    if data.has_synthetic {
        warn!(symbol = data.symbol(), "walk based on synthetic data");
    }
    Ok(())
}

fn run_synth(bars: usize, seed: u64, symbol: &str, out: &Path) -> Result<()> {
    let series = SyntheticProvider::new(bars, seed).generate(symbol);
    write_file(out, &export_bars_csv(&series)?)?;
    println!("Wrote {} synthetic bars to: {}", series.len(), out.display());
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ResultCache::new(cache_dir)?;
    let count = cache.len()?;
    if count == 0 {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Results: {count}");
    println!("Total size: {}", format_size(cache.size_bytes()?));
    Ok(())
}

fn run_cache_clear(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ResultCache::new(cache_dir)?;
    let count = cache.len()?;
    cache.clear()?;
    println!("Removed {count} cached result(s).");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn fmt_price(v: Option<f64>) -> String {
    v.map(|p| format!("{p:.4}")).unwrap_or_else(|| "-".into())
}

fn print_summary(result: &ScanResult) {
    let report = &result.report;
    println!();
    println!("=== Scan Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("As of:          {}", result.as_of.format("%Y-%m-%d"));
    println!(
        "Bars:           {} (window {})",
        result.bar_count,
        result.channel.window_len()
    );
    println!();
    println!("--- Channel ---");
    println!("Upper:          {:.4}", result.rails.upper);
    println!("Mid:            {:.4}", result.rails.mid);
    println!("Lower:          {:.4}", result.rails.lower);
    println!("Position:       {:.2}", result.channel_position);
    println!("Slope:          {:.4}% / bar", result.slope_pct_per_bar);
    if let Some(hint) = &result.rail_hint {
        println!(
            "Support:        {:.4} ({:+.0}σ)",
            hint.support, hint.support_k
        );
        println!(
            "Resistance:     {:.4} ({:+.0}σ)",
            hint.resist, hint.resist_k
        );
    }
    println!();
    println!("--- Signal ---");
    println!(
        "Direction:      {:?} ({:?})",
        report.signal.direction(),
        report.signal.strength()
    );
    println!("Entry:          {:.4}", report.entry_price);
    println!("Stop:           {}", fmt_price(report.stop_price));
    println!("Target:         {}", fmt_price(report.target_price));
    if let Some(zone) = &result.entry_zone {
        println!("Entry Zone:     {:.4} to {:.4}", zone.low, zone.high);
    }
    if let Some(rr) = report.risk_reward_ratio {
        println!("Risk/Reward:    {rr:.2}");
    }
    println!();
    println!("--- History ---");
    match report.probability.value() {
        Some(p) => println!("P(target):      {:.1}%", p * 100.0),
        None => println!("P(target):      undefined"),
    }
    println!("Samples:        {}", report.sample_count);
    println!("Unresolved:     {}", report.unresolved_count);
    if let Some(bars) = result.avg_bars_to_resolution {
        println!("Avg Bars:       {bars:.1}");
    }
    if let Some(ret) = result.avg_return_pct {
        println!("Avg Return:     {ret:.2}%");
    }
    println!("Tie Break:      {}", result.tie_break_policy.name());
    if report.low_confidence {
        println!();
        println!("WARNING: Low confidence (too few historical samples)");
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
