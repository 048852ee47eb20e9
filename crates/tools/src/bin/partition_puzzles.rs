//! partition_puzzles - split the puzzle export into rating / theme datasets
//!
//! Writes `datasets/<low>-<high>/{train,test}.csv` and
//! `sorted/<bin>/<theme>.csv` under the output directory.
//!
//! # Examples
//!
//! ```bash
//! # Straight from the Lichess download
//! cargo run -p tools --release --bin partition_puzzles -- \
//!   lichess_db_puzzle.csv.zst --output data --train-ratio 0.8
//!
//! # Also write the per-bin files (puzzles/puzzles_<bin>.csv) and save statistics
//! cargo run -p tools --release --bin partition_puzzles -- \
//!   lichess_db_puzzle.csv.zst --flat --stats data/summary.json
//!
//! # Settings from a file, one flag overridden
//! cargo run -p tools --release --bin partition_puzzles -- \
//!   puzzles.jsonl.gz --config puzzles.toml --range-width 100
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use puzzle_core::{Compression, InputFormat, Pipeline, PipelineConfig, WriteMode};

/// Progress refresh interval (rows).
const PROGRESS_STEP: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(
    name = "partition_puzzles",
    version,
    about = "Partition chess puzzles into rating-range train/test sets and rating/theme files"
)]
struct Cli {
    /// Puzzle file (.csv / .jsonl, optionally .gz or .zst); `-` reads stdin
    input: PathBuf,

    /// Output root directory. Without --append, existing datasets/, sorted/ and
    /// puzzles/ directories under it are replaced
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Share of each rating range written to train.csv (0.0 - 1.0)
    #[arg(long, value_parser = parse_ratio)]
    train_ratio: Option<f64>,

    /// Width of the datasets/<low>-<high> rating ranges
    #[arg(long, value_parser = parse_positive_u32)]
    range_width: Option<u32>,

    /// Step of the sorted/<bin> rating bins
    #[arg(long, value_parser = parse_positive_u32)]
    bin_step: Option<u32>,

    /// Input format (csv or jsonl); inferred from the extension by default
    #[arg(long)]
    format: Option<InputFormat>,

    /// TOML settings file; explicit flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append to existing bucket files instead of replacing them
    #[arg(long)]
    append: bool,

    /// Gzip the output files (.csv.gz)
    #[arg(long)]
    gzip: bool,

    /// Also write puzzles/puzzles_<bin>.csv sorted by themes
    #[arg(long)]
    flat: bool,

    /// Additional accepted theme name (repeatable)
    #[arg(long = "extra-theme")]
    extra_themes: Vec<String>,

    /// Save run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let val: f64 = s.parse().map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&val) {
        Ok(val)
    } else {
        Err(format!("ratio must be within [0, 1], got {val}"))
    }
}

fn parse_positive_u32(s: &str) -> Result<u32, String> {
    let val: u32 = s.parse().map_err(|_| format!("'{s}' is not a valid u32 number"))?;
    if val == 0 {
        Err("value must be positive".to_string())
    } else {
        Ok(val)
    }
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    cfg.input = cli.input.clone();
    if let Some(output) = &cli.output {
        cfg.output_dir = output.clone();
    }
    if let Some(ratio) = cli.train_ratio {
        cfg.train_ratio = ratio;
    }
    if let Some(width) = cli.range_width {
        cfg.range_width = width;
    }
    if let Some(step) = cli.bin_step {
        cfg.bin_step = step;
    }
    if cli.format.is_some() {
        cfg.format = cli.format;
    }
    if cli.append {
        cfg.write_mode = WriteMode::Append;
    }
    if cli.gzip {
        cfg.compression = Compression::Gzip;
    }
    if cli.flat {
        cfg.flat_layout = true;
    }
    cfg.extra_themes.extend(cli.extra_themes.iter().cloned());
    Ok(cfg)
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {pos} rows ({per_sec}) {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let cfg = build_config(&cli)?;
    let pipeline = Pipeline::new(cfg).context("invalid settings")?;

    let progress = progress_bar(!cli.no_progress);
    let mut rows: u64 = 0;
    let summary = pipeline
        .run(|| {
            rows += 1;
            if rows % PROGRESS_STEP == 0 {
                progress.set_position(rows);
            }
        })
        .with_context(|| format!("failed to partition {}", pipeline.config().input.display()))?;
    progress.set_position(rows);
    progress.finish_with_message("Done");

    summary.log_report();
    if !summary.is_clean() {
        log::warn!("finished with skipped rows or unwritten buckets; see the report above");
    }
    if let Some(path) = &cli.stats {
        summary.save_json(path)?;
        log::info!("statistics saved to {}", path.display());
    }
    Ok(())
}
