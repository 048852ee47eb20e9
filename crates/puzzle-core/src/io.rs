//! Compression-aware file I/O (plain, gzip and zstd).

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

#[cfg(feature = "zstd")]
use zstd::Decoder as ZstdDecoder;

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB

/// Compression applied to output files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    /// Suffix appended after `.csv`.
    pub fn suffix(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
        }
    }
}

/// Returns the lowercase file name with a trailing `.gz` / `.zst` removed.
pub fn strip_compression_ext(path: &Path) -> String {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default().to_ascii_lowercase();
    if let Some(stripped) = name.strip_suffix(".gz") {
        return stripped.to_owned();
    }
    if let Some(stripped) = name.strip_suffix(".zst") {
        return stripped.to_owned();
    }
    name
}

/// Opens `path` for buffered reading, decompressing by extension. `-` reads stdin.
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if p.to_string_lossy() == "-" {
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, io::stdin())));
    }
    let f = File::open(p)?;
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();

    if ext == "gz" {
        let dec = flate2::read::MultiGzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    if ext == "zst" {
        #[cfg(feature = "zstd")]
        {
            let dec = ZstdDecoder::new(f)?;
            return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
        }
        #[cfg(not(feature = "zstd"))]
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "zstd input requires the `zstd` feature",
        ));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

/// Writer wrapper to propagate finish/close errors for compressed outputs.
#[must_use = "call .close() to propagate compression/IO errors"]
pub enum Writer {
    Plain(BufWriter<File>),
    Gz(flate2::write::GzEncoder<BufWriter<File>>),
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Plain(f) => f.write(buf),
            Writer::Gz(e) => e.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Gz(e) => e.flush(),
        }
    }
}

impl Writer {
    /// Finalize the stream and flush the underlying file.
    pub fn close(self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => {
                // into_inner() flushes the buffer; surface the error if that fails
                let mut file = f.into_inner().map_err(|e| e.into_error())?;
                file.flush()
            }
            Writer::Gz(e) => {
                let f = e.finish()?;
                let mut file = f.into_inner().map_err(|e| e.into_error())?;
                file.flush()
            }
        }
    }
}

/// Creates (truncating) or appends to `path`. Compression is chosen by the
/// caller, not by extension.
pub fn open_writer<P: AsRef<Path>>(path: P, compression: Compression, append: bool) -> io::Result<Writer> {
    let file = if append {
        File::options().create(true).append(true).open(path.as_ref())?
    } else {
        File::create(path.as_ref())?
    };
    let buffered = BufWriter::new(file);
    match compression {
        Compression::None => Ok(Writer::Plain(buffered)),
        Compression::Gzip => {
            let enc = flate2::write::GzEncoder::new(buffered, flate2::Compression::default());
            Ok(Writer::Gz(enc))
        }
    }
}
