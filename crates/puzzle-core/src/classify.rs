//! Maps a record to its rating range, split, rating bin and themes.

use crate::bucket::{Destination, RatingBin, RatingRange, RatingScheme};
use crate::record::PuzzleRecord;
use crate::split::{Split, Splitter};
use crate::theme::{Theme, ThemeCatalog};

/// Everything the partitioner needs to know about one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub range: RatingRange,
    pub split: Split,
    pub bin: RatingBin,
    pub themes: Vec<Theme>,
    /// Tags that are not in the catalog; the record keeps its rating buckets.
    pub dropped_themes: Vec<String>,
}

impl Classification {
    /// Dataset destination first, then one per theme, then the flat bin.
    pub fn destinations(&self, flat_layout: bool) -> Vec<Destination> {
        let mut out = Vec::with_capacity(self.themes.len() + 2);
        out.push(Destination::Dataset {
            range: self.range,
            split: self.split,
        });
        for theme in &self.themes {
            out.push(Destination::Sorted {
                bin: self.bin,
                theme: theme.clone(),
            });
        }
        if flat_layout {
            out.push(Destination::Flat { bin: self.bin });
        }
        out
    }
}

/// Pure classification: the result depends only on the record and settings.
#[derive(Debug, Clone)]
pub struct Classifier {
    scheme: RatingScheme,
    bin_step: u32,
    splitter: Splitter,
    catalog: ThemeCatalog,
}

impl Classifier {
    pub fn new(scheme: RatingScheme, bin_step: u32, splitter: Splitter, catalog: ThemeCatalog) -> Self {
        Self {
            scheme,
            bin_step: bin_step.max(1),
            splitter,
            catalog,
        }
    }

    pub fn classify(&self, record: &PuzzleRecord) -> Classification {
        let mut themes: Vec<Theme> = Vec::with_capacity(record.themes.len());
        let mut dropped_themes = Vec::new();
        for tag in &record.themes {
            match self.catalog.resolve(tag) {
                Some(theme) if !themes.contains(theme) => themes.push(theme.clone()),
                Some(_) => {}
                None => dropped_themes.push(tag.clone()),
            }
        }
        Classification {
            range: self.scheme.range_for(record.rating),
            split: self.splitter.assign(&record.id),
            bin: RatingBin::of(record.rating, self.bin_step),
            themes,
            dropped_themes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classifier() -> Classifier {
        Classifier::new(
            RatingScheme::new(200).unwrap(),
            100,
            Splitter::new(0.8).unwrap(),
            ThemeCatalog::lichess(),
        )
    }

    fn record(id: &str, rating: u32, themes: &[&str]) -> PuzzleRecord {
        PuzzleRecord {
            id: id.into(),
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".into(),
            moves: vec!["e2e4".into()],
            rating,
            themes: themes.iter().map(|s| s.to_string()).collect(),
            popularity: 0,
            rating_deviation: None,
            nb_plays: None,
            game_url: None,
            opening_tags: Vec::new(),
        }
    }

    #[test]
    fn example_record_destinations() {
        let c = classifier().classify(&record("abc123", 1150, &["fork"]));
        assert_eq!(c.range, RatingRange { low: 1000, high: 1200 });
        assert_eq!(c.bin, RatingBin(1100));
        let paths: Vec<PathBuf> = c.destinations(false).iter().map(Destination::relative_path).collect();
        assert_eq!(paths.len(), 2);
        let split_file = PathBuf::from(format!("datasets/1000-1200/{}.csv", c.split));
        assert_eq!(paths[0], split_file);
        assert_eq!(paths[1], PathBuf::from("sorted/1100/fork.csv"));
    }

    #[test]
    fn multiple_themes_give_multiple_destinations() {
        let c = classifier().classify(&record("x", 1500, &["fork", "pin"]));
        let paths: Vec<PathBuf> = c.destinations(false).iter().map(Destination::relative_path).collect();
        assert!(paths.contains(&PathBuf::from("sorted/1500/fork.csv")));
        assert!(paths.contains(&PathBuf::from("sorted/1500/pin.csv")));
    }

    #[test]
    fn unknown_theme_is_dropped_but_record_kept() {
        let c = classifier().classify(&record("y", 900, &["fork", "madeUp"]));
        assert_eq!(c.dropped_themes, vec!["madeUp".to_string()]);
        assert_eq!(c.themes.len(), 1);
        assert_eq!(c.destinations(false).len(), 2);
    }

    #[test]
    fn case_variants_collapse_to_one_theme() {
        let c = classifier().classify(&record("z", 900, &["fork", "Fork"]));
        assert_eq!(c.themes.len(), 1);
    }

    #[test]
    fn flat_layout_adds_bin_destination() {
        let c = classifier().classify(&record("w", 650, &[]));
        let dests = c.destinations(true);
        assert_eq!(dests.len(), 2);
        assert_eq!(dests[1].relative_path(), PathBuf::from("puzzles/puzzles_600.csv"));
    }

    #[test]
    fn classification_is_deterministic() {
        let rec = record("repeat", 2210, &["mateIn2", "short"]);
        assert_eq!(classifier().classify(&rec), classifier().classify(&rec));
    }
}
