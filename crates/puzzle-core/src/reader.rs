//! Lazy puzzle reader over CSV or JSON-lines input.
//!
//! The reader yields one `Result` per input row. `MalformedRecord` items can be
//! skipped; `Read` means the stream itself broke and iteration stops after it.

use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, PuzzleResult};
use crate::io::{open_reader, strip_compression_ext};
use crate::record::{raw_from_json, CsvRow, PuzzleRecord, RawFields};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Jsonl,
}

impl InputFormat {
    /// Guesses from the extension once `.gz` / `.zst` is stripped. Defaults to CSV.
    pub fn detect(path: &Path) -> Self {
        let name = strip_compression_ext(path);
        if [".jsonl", ".ndjson", ".json"].iter().any(|ext| name.ends_with(ext)) {
            InputFormat::Jsonl
        } else {
            InputFormat::Csv
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "jsonl" | "ndjson" | "json" => Ok(InputFormat::Jsonl),
            other => Err(format!("unknown input format '{other}' (expected csv or jsonl)")),
        }
    }
}

enum Source {
    Csv {
        reader: csv::Reader<Box<dyn BufRead>>,
        headers: csv::StringRecord,
        row: csv::StringRecord,
    },
    Jsonl {
        input: Box<dyn BufRead>,
        buf: Vec<u8>,
        line_no: u64,
    },
}

/// Finite, single-pass record stream. Re-open to read again.
pub struct PuzzleReader {
    source: Source,
    done: bool,
}

impl PuzzleReader {
    /// Opens `path` (`-` for stdin). `format` overrides extension detection.
    pub fn open<P: AsRef<Path>>(path: P, format: Option<InputFormat>) -> PuzzleResult<Self> {
        let path = path.as_ref();
        let input = open_reader(path).map_err(|source| PuzzleError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let format = format.unwrap_or_else(|| InputFormat::detect(path));
        log::debug!("reading {} as {:?}", path.display(), format);
        Self::from_buf_read(input, format)
    }

    /// Wraps an already opened stream.
    pub fn from_buf_read(input: Box<dyn BufRead>, format: InputFormat) -> PuzzleResult<Self> {
        let source = match format {
            InputFormat::Csv => {
                let mut reader = csv::ReaderBuilder::new()
                    .flexible(true)
                    .trim(csv::Trim::Headers)
                    .from_reader(input);
                let headers = reader.headers().map_err(csv_fatal)?.clone();
                Source::Csv {
                    reader,
                    headers,
                    row: csv::StringRecord::new(),
                }
            }
            InputFormat::Jsonl => Source::Jsonl {
                input,
                buf: Vec::new(),
                line_no: 0,
            },
        };
        Ok(Self { source, done: false })
    }

    fn next_csv(
        reader: &mut csv::Reader<Box<dyn BufRead>>,
        headers: &csv::StringRecord,
        row: &mut csv::StringRecord,
    ) -> Option<PuzzleResult<PuzzleRecord>> {
        match reader.read_record(row) {
            Ok(false) => None,
            Ok(true) => {
                let line = row.position().map(|p| p.line()).unwrap_or(0);
                let parsed = row
                    .deserialize::<CsvRow>(Some(headers))
                    .map_err(|e| PuzzleError::malformed(line, e.to_string()))
                    .and_then(|r| RawFields::from(r).into_record(line));
                Some(parsed)
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                let message = e.to_string();
                match e.into_kind() {
                    csv::ErrorKind::Io(source) => Some(Err(PuzzleError::Read { source })),
                    _ => Some(Err(PuzzleError::malformed(line, message))),
                }
            }
        }
    }

    fn next_jsonl(
        input: &mut dyn BufRead,
        buf: &mut Vec<u8>,
        line_no: &mut u64,
    ) -> Option<PuzzleResult<PuzzleRecord>> {
        loop {
            buf.clear();
            match input.read_until(b'\n', buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => return Some(Err(PuzzleError::Read { source })),
            }
            *line_no += 1;
            let n = *line_no;
            // Invalid UTF-8 is a bad row, not a broken stream
            let line = match std::str::from_utf8(&buf[..]) {
                Ok(l) => l,
                Err(e) => return Some(Err(PuzzleError::malformed(n, format!("invalid UTF-8: {e}")))),
            };
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<serde_json::Value>(line)
                .map_err(|e| PuzzleError::malformed(n, e.to_string()))
                .and_then(|v| raw_from_json(&v, n))
                .and_then(|raw| raw.into_record(n));
            return Some(parsed);
        }
    }
}

impl Iterator for PuzzleReader {
    type Item = PuzzleResult<PuzzleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match &mut self.source {
            Source::Csv { reader, headers, row } => Self::next_csv(reader, headers, row),
            Source::Jsonl { input, buf, line_no } => Self::next_jsonl(input.as_mut(), buf, line_no),
        };
        match &item {
            None | Some(Err(PuzzleError::Read { .. })) => self.done = true,
            _ => {}
        }
        item
    }
}

fn csv_fatal(e: csv::Error) -> PuzzleError {
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => PuzzleError::Read { source },
        _ => PuzzleError::malformed(1, format!("unreadable header: {message}")),
    }
}
