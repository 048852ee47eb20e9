//! Reader -> classifier -> writer driver and the run summary.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::bucket::Destination;
use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::error::{PuzzleError, PuzzleResult};
use crate::partition::Partition;
use crate::reader::PuzzleReader;
use crate::record::PuzzleRecord;
use crate::split::Split;
use crate::writer::BucketWriter;

/// Malformed rows reported at warn level before switching to debug.
const MALFORMED_WARN_LIMIT: u64 = 10;

/// Train/test counts of one rating range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: u64,
    pub test: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Run statistics
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    /// Rows seen, malformed ones included
    pub rows_read: u64,
    pub records_partitioned: u64,
    pub malformed_skipped: u64,
    /// Unrecognised theme tag -> occurrences
    pub unrecognized_themes: BTreeMap<String, u64>,
    /// Layout directory -> bucket count
    pub buckets: BTreeMap<String, u64>,
    /// `<low>-<high>` -> split sizes
    pub ranges: BTreeMap<String, SplitCounts>,
    pub files_written: u64,
    pub rows_written: u64,
    pub write_errors: Vec<WriteFailure>,
}

impl Summary {
    pub fn is_clean(&self) -> bool {
        self.malformed_skipped == 0 && self.write_errors.is_empty()
    }

    /// Logs a human-readable report.
    pub fn log_report(&self) {
        log::info!(
            "rows read: {}, partitioned: {}, malformed skipped: {}",
            self.rows_read,
            self.records_partitioned,
            self.malformed_skipped
        );
        for (layout, count) in &self.buckets {
            log::info!("{layout}: {count} buckets");
        }
        log::info!("files written: {}, rows written: {}", self.files_written, self.rows_written);
        if !self.unrecognized_themes.is_empty() {
            let total: u64 = self.unrecognized_themes.values().sum();
            log::warn!(
                "{} unrecognized theme tag(s), {} occurrence(s) dropped",
                self.unrecognized_themes.len(),
                total
            );
        }
        for failure in &self.write_errors {
            log::error!("bucket not written: {}: {}", failure.path.display(), failure.error);
        }
    }

    /// Saves the summary as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(file, self).with_context(|| "Failed to write JSON")?;
        Ok(())
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    classifier: Classifier,
    writer: BucketWriter,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> PuzzleResult<Self> {
        config.validate()?;
        let classifier = config.classifier()?;
        let writer = config.bucket_writer()?;
        Ok(Self {
            config,
            classifier,
            writer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline. `on_row` is called once per input row.
    ///
    /// Fails only when the input cannot be opened or read; malformed rows and
    /// failed buckets end up in the summary.
    pub fn run<F: FnMut()>(&self, on_row: F) -> PuzzleResult<Summary> {
        let reader = PuzzleReader::open(&self.config.input, self.config.format)?;
        log::info!("partitioning {} into {}", self.config.input.display(), self.writer.root().display());
        let mut summary = Summary::default();
        let partition = self.partition(reader, &mut summary, on_row)?;
        log::info!("{} records in {} buckets", partition.record_count(), partition.bucket_count());
        match self.writer.clear_layouts() {
            Ok(removed) => {
                for dir in removed {
                    log::debug!("removed previous output {}", dir.display());
                }
            }
            Err(e) => {
                log::error!("{e}");
                summary.write_errors.push(failure(e, self.writer.root()));
            }
        }
        self.write(&partition, &mut summary);
        Ok(summary)
    }

    /// Classifies every record of `rows` into a `Partition`.
    pub fn partition<I, F>(&self, rows: I, summary: &mut Summary, mut on_row: F) -> PuzzleResult<Partition>
    where
        I: IntoIterator<Item = PuzzleResult<PuzzleRecord>>,
        F: FnMut(),
    {
        let mut partition = Partition::new();
        let mut warned_themes: HashSet<String> = HashSet::new();

        for row in rows {
            on_row();
            summary.rows_read += 1;
            let record = match row {
                Ok(record) => record,
                Err(e) if e.is_recoverable() => {
                    summary.malformed_skipped += 1;
                    if summary.malformed_skipped <= MALFORMED_WARN_LIMIT {
                        log::warn!("skipping {e}");
                    } else {
                        log::debug!("skipping {e}");
                    }
                    continue;
                }
                Err(fatal) => return Err(fatal),
            };

            let class = self.classifier.classify(&record);
            for tag in &class.dropped_themes {
                *summary.unrecognized_themes.entry(tag.clone()).or_default() += 1;
                if warned_themes.insert(tag.clone()) {
                    log::warn!("unrecognized theme '{tag}' dropped (first seen on puzzle {})", record.id);
                }
            }
            let counts = summary.ranges.entry(class.range.to_string()).or_default();
            match class.split {
                Split::Train => counts.train += 1,
                Split::Test => counts.test += 1,
            }
            partition.insert(record, class.destinations(self.config.flat_layout));
            summary.records_partitioned += 1;
        }
        if summary.malformed_skipped > MALFORMED_WARN_LIMIT {
            log::warn!("{} malformed rows skipped in total", summary.malformed_skipped);
        }
        Ok(partition)
    }

    /// Writes every bucket. A failed bucket is recorded and the rest continue.
    pub fn write(&self, partition: &Partition, summary: &mut Summary) {
        for dest in partition.destinations() {
            *summary.buckets.entry(dest.layout().to_owned()).or_default() += 1;
            let members = match dest {
                Destination::Flat { .. } => partition.members_sorted_by_themes(dest),
                _ => partition.members(dest),
            };
            match self.writer.write_bucket(dest, members) {
                Ok(rows) => {
                    summary.files_written += 1;
                    summary.rows_written += rows as u64;
                }
                Err(e) => {
                    log::error!("{e}");
                    summary.write_errors.push(failure(e, &self.writer.path_for(dest)));
                }
            }
        }
    }
}

fn failure(e: PuzzleError, fallback: &Path) -> WriteFailure {
    let path = match &e {
        PuzzleError::Write { path, .. } => path.clone(),
        _ => fallback.to_path_buf(),
    };
    WriteFailure {
        path,
        error: e.to_string(),
    }
}
