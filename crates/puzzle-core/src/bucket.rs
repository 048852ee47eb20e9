//! Rating ranges, rating bins and output destinations.

use std::fmt;
use std::path::PathBuf;

use crate::error::{PuzzleError, PuzzleResult};
use crate::split::Split;
use crate::theme::Theme;

pub const DATASETS_DIR: &str = "datasets";
pub const SORTED_DIR: &str = "sorted";
pub const FLAT_DIR: &str = "puzzles";

/// Half-open rating interval `[low, high)`. `high` is wider than a rating so
/// the top range still contains `u32::MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatingRange {
    pub low: u32,
    pub high: u64,
}

impl RatingRange {
    pub fn contains(&self, rating: u32) -> bool {
        self.low <= rating && u64::from(rating) < self.high
    }
}

impl fmt::Display for RatingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Fixed-width, floor-aligned rating ranges. Ranges never overlap and every
/// rating falls in exactly one.
#[derive(Clone, Copy, Debug)]
pub struct RatingScheme {
    width: u32,
}

impl RatingScheme {
    pub fn new(width: u32) -> PuzzleResult<Self> {
        if width == 0 {
            return Err(PuzzleError::Config("range width must be positive".into()));
        }
        Ok(Self { width })
    }

    pub fn range_for(&self, rating: u32) -> RatingRange {
        let low = rating / self.width * self.width;
        RatingRange {
            low,
            high: u64::from(low) + u64::from(self.width),
        }
    }
}

/// Floor-rounded rating bin (`1150` with step 100 is bin `1100`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatingBin(pub u32);

impl RatingBin {
    pub fn of(rating: u32, step: u32) -> Self {
        debug_assert!(step > 0);
        RatingBin(rating / step * step)
    }
}

impl fmt::Display for RatingBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a record goes. Ordering is the write order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Destination {
    /// `datasets/<low>-<high>/<split>.csv`
    Dataset { range: RatingRange, split: Split },
    /// `sorted/<bin>/<theme>.csv`
    Sorted { bin: RatingBin, theme: Theme },
    /// `puzzles/puzzles_<bin>.csv`
    Flat { bin: RatingBin },
}

impl Destination {
    /// Path relative to the output root, without compression suffix.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Destination::Dataset { range, split } => {
                PathBuf::from(DATASETS_DIR).join(range.to_string()).join(format!("{split}.csv"))
            }
            Destination::Sorted { bin, theme } => {
                PathBuf::from(SORTED_DIR).join(bin.to_string()).join(format!("{theme}.csv"))
            }
            Destination::Flat { bin } => PathBuf::from(FLAT_DIR).join(format!("puzzles_{bin}.csv")),
        }
    }

    pub fn layout(&self) -> &'static str {
        match self {
            Destination::Dataset { .. } => DATASETS_DIR,
            Destination::Sorted { .. } => SORTED_DIR,
            Destination::Flat { .. } => FLAT_DIR,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative_path().display())
    }
}
