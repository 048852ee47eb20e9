//! Chess puzzle dataset partitioning
//!
//! Reads Lichess-style puzzle records and files them into
//! `datasets/<low>-<high>/{train,test}.csv` (rating ranges with a stable
//! hash-based split) and `sorted/<bin>/<theme>.csv` (rating bin and tactical
//! theme), optionally also `puzzles/puzzles_<bin>.csv`.

pub mod bucket;
pub mod classify;
pub mod config;
pub mod error;
pub mod io;
pub mod partition;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod split;
pub mod theme;
pub mod writer;

pub use bucket::{Destination, RatingBin, RatingRange, RatingScheme};
pub use classify::{Classification, Classifier};
pub use config::PipelineConfig;
pub use error::{PuzzleError, PuzzleResult};
pub use io::Compression;
pub use partition::Partition;
pub use pipeline::{Pipeline, SplitCounts, Summary, WriteFailure};
pub use reader::{InputFormat, PuzzleReader};
pub use record::PuzzleRecord;
pub use split::{Split, Splitter};
pub use theme::{Theme, ThemeCatalog};
pub use writer::{BucketWriter, WriteMode};
