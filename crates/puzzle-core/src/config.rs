//! Pipeline settings
//!
//! Defaults, optionally overridden by a TOML file, then by command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bucket::RatingScheme;
use crate::classify::Classifier;
use crate::error::{PuzzleError, PuzzleResult};
use crate::io::Compression;
use crate::reader::InputFormat;
use crate::split::Splitter;
use crate::theme::ThemeCatalog;
use crate::writer::{BucketWriter, WriteMode};

pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;
pub const DEFAULT_RANGE_WIDTH: u32 = 200;
pub const DEFAULT_BIN_STEP: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Input file, `-` for stdin
    pub input: PathBuf,
    /// Root of the `datasets/`, `sorted/` and `puzzles/` trees
    pub output_dir: PathBuf,
    /// `None` infers the format from the input extension
    pub format: Option<InputFormat>,
    /// Share of each rating range sent to `train.csv`
    pub train_ratio: f64,
    /// Width of the `datasets/<low>-<high>` ranges
    pub range_width: u32,
    /// Step of the `sorted/<bin>` and `puzzles_<bin>` bins
    pub bin_step: u32,
    /// Theme names accepted on top of the Lichess list
    pub extra_themes: Vec<String>,
    pub write_mode: WriteMode,
    pub compression: Compression,
    /// Also write `puzzles/puzzles_<bin>.csv`
    pub flat_layout: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("lichess_db_puzzle.csv.zst"),
            output_dir: PathBuf::from("data"),
            format: None,
            train_ratio: DEFAULT_TRAIN_RATIO,
            range_width: DEFAULT_RANGE_WIDTH,
            bin_step: DEFAULT_BIN_STEP,
            extra_themes: Vec::new(),
            write_mode: WriteMode::Truncate,
            compression: Compression::None,
            flat_layout: false,
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML file; missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> PuzzleResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PuzzleError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            PuzzleError::Config(reason) => PuzzleError::ConfigFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> PuzzleResult<Self> {
        toml::from_str(text).map_err(|e| PuzzleError::Config(e.to_string()))
    }

    pub fn validate(&self) -> PuzzleResult<()> {
        if self.range_width == 0 {
            return Err(PuzzleError::Config("range_width must be positive".into()));
        }
        if self.bin_step == 0 {
            return Err(PuzzleError::Config("bin_step must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.train_ratio) {
            return Err(PuzzleError::Config(format!(
                "train_ratio must be within [0, 1], got {}",
                self.train_ratio
            )));
        }
        if self.write_mode == WriteMode::Append && self.compression != Compression::None {
            return Err(PuzzleError::Config("append mode cannot be combined with compressed output".into()));
        }
        ThemeCatalog::with_extra(&self.extra_themes)?;
        Ok(())
    }

    pub fn classifier(&self) -> PuzzleResult<Classifier> {
        Ok(Classifier::new(
            RatingScheme::new(self.range_width)?,
            self.bin_step,
            Splitter::new(self.train_ratio)?,
            ThemeCatalog::with_extra(&self.extra_themes)?,
        ))
    }

    pub fn bucket_writer(&self) -> PuzzleResult<BucketWriter> {
        BucketWriter::new(&self.output_dir, self.write_mode, self.compression)
    }
}
