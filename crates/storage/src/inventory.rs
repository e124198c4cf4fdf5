//! Chunk inventory: grouping a station's chunk keys into scans.
//!
//! Keys look like `KTLX/585/20250129-150000-001-S`. The third segment holds
//! the scan time (first two `-` parts) and the last character of the key is
//! the chunk type marker (`S` start, `I` intermediate, `E` end).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use radar_common::ScanTimestamp;
use tracing::{debug, instrument};

use crate::error::ListingError;
use crate::object_store::ChunkSource;

/// Number of distinct scan timestamps kept per listing.
const KEPT_SCANS: usize = 2;

/// One remote chunk object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Extract the scan timestamp and chunk type marker from a key.
///
/// Returns `None` for keys with fewer than three segments or an unparsable
/// timestamp.
pub fn parse_key(key: &str) -> Option<(ScanTimestamp, char)> {
    let segment = key.split('/').nth(2)?;
    let timestamp = ScanTimestamp::from_key_segment(segment).ok()?;
    let marker = key.chars().last()?;
    Some((timestamp, marker))
}

/// All chunks sharing one scan timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanGroup {
    pub station: String,
    pub timestamp: ScanTimestamp,
    pub chunks: Vec<ChunkObject>,
    /// Distinct chunk type markers present
    pub markers: BTreeSet<char>,
}

impl ScanGroup {
    pub fn new(station: impl Into<String>, timestamp: ScanTimestamp) -> Self {
        Self {
            station: station.into(),
            timestamp,
            chunks: Vec::new(),
            markers: BTreeSet::new(),
        }
    }

    pub fn push(&mut self, chunk: ChunkObject, marker: char) {
        self.markers.insert(marker);
        self.chunks.push(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk keys in ascending order (the assembly order).
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.chunks.iter().map(|c| c.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

/// The newest and second-newest scans of a station.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanInventory {
    pub latest: Option<ScanGroup>,
    pub previous: Option<ScanGroup>,
}

impl ScanInventory {
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

/// Running fold of listed objects into the two newest scan groups.
///
/// Objects whose keys do not parse are skipped. Only the two highest
/// distinct timestamps are held at any time; objects with an equal
/// timestamp join the same group.
#[derive(Debug)]
pub struct ScanFold {
    station: String,
    groups: BTreeMap<ScanTimestamp, ScanGroup>,
}

impl ScanFold {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            groups: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, object: ChunkObject) {
        let Some((timestamp, marker)) = parse_key(&object.key) else {
            debug!(key = %object.key, "Skipping unparsable chunk key");
            return;
        };

        if self.groups.len() == KEPT_SCANS
            && !self.groups.contains_key(&timestamp)
            && self.groups.keys().next().is_some_and(|oldest| &timestamp < oldest)
        {
            return;
        }

        let station = &self.station;
        self.groups
            .entry(timestamp.clone())
            .or_insert_with(|| ScanGroup::new(station.as_str(), timestamp))
            .push(object, marker);

        if self.groups.len() > KEPT_SCANS {
            self.groups.pop_first();
        }
    }

    /// Number of scan groups currently held.
    pub fn held(&self) -> usize {
        self.groups.len()
    }

    pub fn finish(self) -> ScanInventory {
        let mut newest_first = self.groups.into_values().rev();
        ScanInventory {
            latest: newest_first.next(),
            previous: newest_first.next(),
        }
    }
}

/// Fold listed objects into the two newest scan groups.
pub fn group_chunks(station: &str, objects: impl IntoIterator<Item = ChunkObject>) -> ScanInventory {
    let mut fold = ScanFold::new(station);
    for object in objects {
        fold.insert(object);
    }
    fold.finish()
}

/// List a station's chunks and group them into the two newest scans.
///
/// Objects are folded as they arrive. A listing error at any point discards
/// the partial fold.
#[instrument(skip(source))]
pub async fn list_groups(source: &dyn ChunkSource, station: &str) -> Result<ScanInventory, ListingError> {
    let listing_error = |source| ListingError {
        station: station.to_string(),
        source,
    };

    let mut listing = source.list(station);
    let mut fold = ScanFold::new(station);
    let mut listed = 0usize;
    while let Some(object) = listing.try_next().await.map_err(listing_error)? {
        listed += 1;
        fold.insert(object);
    }

    let inventory = fold.finish();
    debug!(
        listed,
        latest = ?inventory.latest.as_ref().map(|g| g.timestamp.as_str()),
        previous = ?inventory.previous.as_ref().map(|g| g.timestamp.as_str()),
        "Grouped chunks"
    );
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(key: &str) -> ChunkObject {
        ChunkObject {
            key: key.to_string(),
            size: 100,
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_parse_key() {
        let (ts, marker) = parse_key("KTLX/585/20250129-150000-001-S").unwrap();
        assert_eq!(ts.as_str(), "20250129150000");
        assert_eq!(marker, 'S');
    }

    #[test]
    fn test_parse_key_rejects_malformed() {
        assert!(parse_key("KTLX/585").is_none());
        assert!(parse_key("KTLX/585/garbage").is_none());
        assert!(parse_key("KTLX/585/2025012-150000-001-S").is_none());
    }

    #[test]
    fn test_keeps_two_newest_timestamps() {
        let inventory = group_chunks(
            "KTLX",
            vec![
                object("KTLX/583/20250129-144000-001-S"),
                object("KTLX/585/20250129-150000-001-S"),
                object("KTLX/584/20250129-145000-001-S"),
                object("KTLX/585/20250129-150000-002-I"),
                object("KTLX/583/20250129-144000-002-E"),
            ],
        );

        let latest = inventory.latest.unwrap();
        let previous = inventory.previous.unwrap();
        assert_eq!(latest.timestamp.as_str(), "20250129150000");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest.markers, BTreeSet::from(['S', 'I']));
        assert_eq!(previous.timestamp.as_str(), "20250129145000");
        assert_eq!(previous.len(), 1);
    }

    #[test]
    fn test_single_scan_has_no_previous() {
        let inventory = group_chunks(
            "KTLX",
            vec![
                object("KTLX/585/20250129-150000-001-S"),
                object("KTLX/bogus"),
            ],
        );
        assert!(inventory.latest.is_some());
        assert!(inventory.previous.is_none());
    }

    #[test]
    fn test_fold_never_holds_more_than_two_scans() {
        let mut fold = ScanFold::new("KTLX");
        for minute in 0..30 {
            fold.insert(object(&format!("KTLX/1/20250129-15{:02}00-001-S", minute)));
            assert!(fold.held() <= KEPT_SCANS);
        }
        let inventory = fold.finish();
        assert_eq!(inventory.latest.unwrap().timestamp.as_str(), "20250129152900");
        assert_eq!(inventory.previous.unwrap().timestamp.as_str(), "20250129152800");
    }

    #[test]
    fn test_empty_listing() {
        assert!(group_chunks("KTLX", Vec::new()).is_empty());
    }

    #[test]
    fn test_sorted_keys() {
        let mut group = ScanGroup::new("KTLX", ScanTimestamp::parse("20250129150000").unwrap());
        group.push(object("KTLX/585/20250129-150000-003-E"), 'E');
        group.push(object("KTLX/585/20250129-150000-001-S"), 'S');
        assert_eq!(
            group.sorted_keys(),
            vec![
                "KTLX/585/20250129-150000-001-S",
                "KTLX/585/20250129-150000-003-E"
            ]
        );
    }
}
