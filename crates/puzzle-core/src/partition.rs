//! In-memory grouping of records by destination.

use std::collections::BTreeMap;

use crate::bucket::Destination;
use crate::record::PuzzleRecord;

/// Holds every record once and, per destination, the indices of its records
/// in input order.
#[derive(Debug, Default)]
pub struct Partition {
    records: Vec<PuzzleRecord>,
    buckets: BTreeMap<Destination, Vec<usize>>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` and files it under every destination.
    pub fn insert(&mut self, record: PuzzleRecord, destinations: Vec<Destination>) {
        let idx = self.records.len();
        self.records.push(record);
        for dest in destinations {
            let members = self.buckets.entry(dest).or_default();
            if members.last() != Some(&idx) {
                members.push(idx);
            }
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Destinations in write order.
    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.buckets.keys()
    }

    /// Records of one bucket in input order.
    pub fn members(&self, dest: &Destination) -> Vec<&PuzzleRecord> {
        self.buckets
            .get(dest)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Records of one bucket, stably sorted by their theme string.
    pub fn members_sorted_by_themes(&self, dest: &Destination) -> Vec<&PuzzleRecord> {
        let mut members = self.members(dest);
        members.sort_by_cached_key(|r| r.themes_field());
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{RatingBin, RatingRange};
    use crate::split::Split;

    fn record(id: &str, themes: &str) -> PuzzleRecord {
        PuzzleRecord {
            id: id.into(),
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".into(),
            moves: vec!["e2e4".into()],
            rating: 1500,
            themes: themes.split_whitespace().map(str::to_owned).collect(),
            popularity: 0,
            rating_deviation: None,
            nb_plays: None,
            game_url: None,
            opening_tags: Vec::new(),
        }
    }

    #[test]
    fn record_is_stored_once_and_listed_per_destination() {
        let flat = Destination::Flat { bin: RatingBin(1500) };
        let ds = Destination::Dataset {
            range: RatingRange { low: 1400, high: 1600 },
            split: Split::Train,
        };
        let mut p = Partition::new();
        p.insert(record("a", "pin"), vec![ds.clone(), flat.clone()]);
        p.insert(record("b", "fork"), vec![ds.clone(), flat.clone(), flat.clone()]);
        assert_eq!(p.record_count(), 2);
        assert_eq!(p.bucket_count(), 2);
        let ids: Vec<&str> = p.members(&flat).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn destinations_are_ordered() {
        let mut p = Partition::new();
        let later = Destination::Flat { bin: RatingBin(900) };
        let earlier = Destination::Dataset {
            range: RatingRange { low: 2000, high: 2200 },
            split: Split::Test,
        };
        p.insert(record("a", ""), vec![later.clone(), earlier.clone()]);
        let order: Vec<&Destination> = p.destinations().collect();
        assert_eq!(order, vec![&earlier, &later]);
    }

    #[test]
    fn theme_sort_is_stable() {
        let flat = Destination::Flat { bin: RatingBin(1500) };
        let mut p = Partition::new();
        p.insert(record("1", "pin short"), vec![flat.clone()]);
        p.insert(record("2", "fork"), vec![flat.clone()]);
        p.insert(record("3", "pin short"), vec![flat.clone()]);
        let ids: Vec<&str> = p.members_sorted_by_themes(&flat).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn unknown_destination_is_empty() {
        let p = Partition::new();
        assert!(p.members(&Destination::Flat { bin: RatingBin(0) }).is_empty());
    }
}
