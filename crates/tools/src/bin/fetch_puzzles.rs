//! fetch_puzzles - download the Lichess puzzle export
//!
//! The download lands in `<output>.part` and is renamed once complete, so an
//! interrupted run never leaves a truncated file at the final path. An
//! existing output file is kept unless `--force` is given.
//!
//! # Examples
//!
//! ```bash
//! cargo run -p tools --release --bin fetch_puzzles
//! cargo run -p tools --release --bin fetch_puzzles -- --output data/raw/puzzles.csv.zst --force
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_ENCODING, HeaderValue};

const DEFAULT_URL: &str = "https://database.lichess.org/lichess_db_puzzle.csv.zst";

#[derive(Parser, Debug)]
#[command(name = "fetch_puzzles", version, about = "Download the Lichess puzzle database")]
struct Cli {
    /// Source URL
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    /// Destination file
    #[arg(short, long, default_value = "lichess_db_puzzle.csv.zst")]
    output: PathBuf,

    /// Download again even if the destination exists
    #[arg(long)]
    force: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn part_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn download(client: &Client, url: &str, out_path: &Path, show_progress: bool) -> Result<u64> {
    if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    }
    let mut res = client
        .get(url)
        .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"))
        .send()
        .with_context(|| format!("GET {url}"))?;
    let status = res.status();
    anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

    let progress = match (show_progress, res.content_length()) {
        (false, _) => ProgressBar::hidden(),
        (true, Some(len)) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                    .expect("valid template"),
            );
            pb
        }
        (true, None) => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("[{elapsed_precise}] {spinner} {bytes} ({bytes_per_sec}) {msg}")
                    .expect("valid template"),
            );
            pb
        }
    };

    let tmp = part_path(out_path);
    let file = File::create(&tmp).with_context(|| format!("open {}", tmp.display()))?;
    let mut writer = BufWriter::new(file);
    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = res.read(&mut buf).with_context(|| format!("read body: {url}"))?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .with_context(|| format!("write {}", tmp.display()))?;
        total += n as u64;
        progress.set_position(total);
    }
    writer.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(writer);
    progress.finish_with_message("Done");

    fs::rename(&tmp, out_path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), out_path.display()))?;
    Ok(total)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.output.exists() && !cli.force {
        log::info!("{} already exists, skipping download (use --force to replace)", cli.output.display());
        return Ok(());
    }

    log::info!("downloading {} -> {}", cli.url, cli.output.display());
    let client = Client::builder().build()?;
    let bytes = download(&client, &cli.url, &cli.output, !cli.no_progress)?;
    log::info!("saved {} ({} bytes)", cli.output.display(), bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("data/lichess_db_puzzle.csv.zst")),
            PathBuf::from("data/lichess_db_puzzle.csv.zst.part")
        );
    }
}
