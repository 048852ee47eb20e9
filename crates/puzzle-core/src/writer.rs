//! Bucket writer: one CSV file per destination.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bucket::{Destination, DATASETS_DIR, FLAT_DIR, SORTED_DIR};
use crate::error::{PuzzleError, PuzzleResult};
use crate::io::{open_writer, Compression};
use crate::record::{PuzzleRecord, CSV_HEADER};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the file; re-running the pipeline reproduces the same output.
    #[default]
    Truncate,
    /// Add rows after existing content. The header is written only for new or empty files.
    Append,
}

/// Writes buckets below an output root, creating directories as needed.
#[derive(Debug, Clone)]
pub struct BucketWriter {
    root: PathBuf,
    mode: WriteMode,
    compression: Compression,
}

impl BucketWriter {
    pub fn new(root: impl Into<PathBuf>, mode: WriteMode, compression: Compression) -> PuzzleResult<Self> {
        if mode == WriteMode::Append && compression != Compression::None {
            return Err(PuzzleError::Config("append mode cannot be combined with compressed output".into()));
        }
        Ok(Self {
            root: root.into(),
            mode,
            compression,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the layout directories under the root before a truncating run,
    /// so buckets that are empty this time do not keep rows from an earlier
    /// run. Other files under the root are left alone. Returns the removed
    /// directories; a no-op in append mode.
    pub fn clear_layouts(&self) -> PuzzleResult<Vec<PathBuf>> {
        let mut removed = Vec::new();
        if self.mode != WriteMode::Truncate {
            return Ok(removed);
        }
        for layout in [DATASETS_DIR, SORTED_DIR, FLAT_DIR] {
            let dir = self.root.join(layout);
            if dir.is_dir() {
                fs::remove_dir_all(&dir).map_err(|source| PuzzleError::Write {
                    path: dir.clone(),
                    source,
                })?;
                removed.push(dir);
            }
        }
        Ok(removed)
    }

    /// Full path of the file for `dest`.
    pub fn path_for(&self, dest: &Destination) -> PathBuf {
        let mut path = self.root.join(dest.relative_path()).into_os_string();
        path.push(self.compression.suffix());
        PathBuf::from(path)
    }

    /// Writes `records` to the file for `dest` and returns the row count.
    /// A failure only affects this bucket.
    pub fn write_bucket<'a, I>(&self, dest: &Destination, records: I) -> PuzzleResult<usize>
    where
        I: IntoIterator<Item = &'a PuzzleRecord>,
    {
        let path = self.path_for(dest);
        self.write_file(&path, records).map_err(|source| PuzzleError::Write {
            path: path.clone(),
            source,
        })
    }

    fn write_file<'a, I>(&self, path: &Path, records: I) -> io::Result<usize>
    where
        I: IntoIterator<Item = &'a PuzzleRecord>,
    {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let append = self.mode == WriteMode::Append;
        let needs_header = !append || fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let out = open_writer(path, self.compression, append)?;
        let mut csv_out = csv::WriterBuilder::new().has_headers(false).from_writer(out);
        if needs_header {
            csv_out.write_record(CSV_HEADER)?;
        }
        let mut rows = 0usize;
        for record in records {
            csv_out.write_record(record.csv_fields())?;
            rows += 1;
        }
        let out = csv_out.into_inner().map_err(|e| e.into_error())?;
        out.close()?;
        log::debug!("wrote {rows} rows to {}", path.display());
        Ok(rows)
    }
}
