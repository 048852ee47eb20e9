//! Error types for the puzzle pipeline

use std::path::PathBuf;

/// Errors raised while reading, classifying or writing puzzle records.
///
/// `MalformedRecord` and `Write` are recoverable: the pipeline counts them and
/// keeps going. The rest abort the run.
#[derive(thiserror::Error, Debug)]
pub enum PuzzleError {
    /// A row could not be turned into a `PuzzleRecord`
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A bucket file could not be created or written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input source could not be opened
    #[error("failed to open input {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input stream failed mid-way
    #[error("failed to read input: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// Invalid pipeline settings
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A config file could not be read or parsed
    #[error("failed to load config {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },
}

impl PuzzleError {
    /// True for per-record / per-bucket failures the pipeline skips over.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PuzzleError::MalformedRecord { .. } | PuzzleError::Write { .. })
    }

    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        PuzzleError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for pipeline operations
pub type PuzzleResult<T> = Result<T, PuzzleError>;
