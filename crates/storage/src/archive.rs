//! The local archive directory.
//!
//! Archives are stored as `{station}_{YYYYMMDD}-{HHMMSS}.bin`, one per scan.
//! The name is the cache key: a present file means the scan was already
//! assembled.

use std::path::{Component, Path, PathBuf};

use radar_common::{RadarError, RadarResult, ScanTimestamp};
use tokio::fs;
use tracing::{debug, instrument};

use crate::assembler::ScanAssembler;
use crate::error::AssemblyError;
use crate::inventory::ScanGroup;
use crate::locks::ScanLocks;

const EXTENSION: &str = "bin";

/// A persisted scan archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadarArchive {
    pub station: String,
    pub timestamp: ScanTimestamp,
    pub path: PathBuf,
}

impl RadarArchive {
    pub fn file_name(&self) -> String {
        ArchiveStore::file_name(&self.station, &self.timestamp)
    }

    /// Read the whole archive.
    pub async fn bytes(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.path).await
    }
}

/// Result of an assembly request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub archive: RadarArchive,
    /// `false` when the archive already existed
    pub created: bool,
}

/// Directory of assembled archives.
#[derive(Debug)]
pub struct ArchiveStore {
    data_dir: PathBuf,
    locks: ScanLocks,
}

impl ArchiveStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: ScanLocks::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn locks(&self) -> &ScanLocks {
        &self.locks
    }

    /// `KTLX_20250129-150000.bin`
    pub fn file_name(station: &str, timestamp: &ScanTimestamp) -> String {
        format!("{}_{}.{}", station, timestamp.file_component(), EXTENSION)
    }

    /// Inverse of [`ArchiveStore::file_name`].
    pub fn parse_file_name(name: &str) -> Option<(String, ScanTimestamp)> {
        let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
        let (station, component) = stem.split_once('_')?;
        if station.is_empty() {
            return None;
        }
        let timestamp = ScanTimestamp::from_file_component(component).ok()?;
        Some((station.to_string(), timestamp))
    }

    pub fn archive_path(&self, station: &str, timestamp: &ScanTimestamp) -> PathBuf {
        self.data_dir.join(Self::file_name(station, timestamp))
    }

    pub fn exists(&self, station: &str, timestamp: &ScanTimestamp) -> bool {
        self.archive_path(station, timestamp).is_file()
    }

    /// Newest persisted archive of `station`, if any.
    #[instrument(skip(self))]
    pub async fn latest_local(&self, station: &str) -> std::io::Result<Option<RadarArchive>> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut latest: Option<RadarArchive> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some((found_station, timestamp)) =
                name.to_str().and_then(Self::parse_file_name)
            else {
                continue;
            };
            if found_station != station {
                continue;
            }
            if latest.as_ref().map_or(true, |l| timestamp > l.timestamp) {
                latest = Some(RadarArchive {
                    station: found_station,
                    timestamp,
                    path: entry.path(),
                });
            }
        }

        debug!(found = latest.is_some(), "Looked up latest local archive");
        Ok(latest)
    }

    /// Resolve an explicitly requested archive file name.
    ///
    /// Only plain file names inside the data directory are accepted.
    pub fn resolve_target(&self, name: &str) -> RadarResult<PathBuf> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !name.contains(['/', '\\']);

        if !plain {
            return Err(RadarError::invalid_argument(format!(
                "target_file must be a plain file name: {}",
                name
            )));
        }

        let path = self.data_dir.join(name);
        if !path.is_file() {
            return Err(RadarError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Assemble a scan into this directory, at most once concurrently per
    /// `(station, timestamp)`.
    pub async fn assemble_scan(
        &self,
        group: &ScanGroup,
        assembler: &ScanAssembler,
    ) -> Result<AssemblyOutcome, AssemblyError> {
        let lock = self.locks.lock_for(&group.station, &group.timestamp);
        let _guard = lock.lock().await;

        let target = self.archive_path(&group.station, &group.timestamp);
        assembler.assemble(group, &target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> ScanTimestamp {
        ScanTimestamp::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_round_trip() {
        let name = ArchiveStore::file_name("KTLX", &ts("20250129150000"));
        assert_eq!(name, "KTLX_20250129-150000.bin");
        assert_eq!(
            ArchiveStore::parse_file_name(&name),
            Some(("KTLX".to_string(), ts("20250129150000")))
        );
    }

    #[test]
    fn test_parse_file_name_rejects_others() {
        assert!(ArchiveStore::parse_file_name("KTLX_20250129-150000.bin.partial").is_none());
        assert!(ArchiveStore::parse_file_name("notes.txt").is_none());
        assert!(ArchiveStore::parse_file_name("_20250129-150000.bin").is_none());
        assert!(ArchiveStore::parse_file_name("KTLX_2025-150000.bin").is_none());
    }

    #[test]
    fn test_resolve_target_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        for bad in ["../etc/passwd", "a/b.bin", "..", ".", "", "/abs.bin", "a\\b.bin"] {
            let err = store.resolve_target(bad).unwrap_err();
            assert_eq!(err.http_status_code(), 400, "{}", bad);
        }
    }

    #[test]
    fn test_resolve_target_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let err = store.resolve_target("KTLX_20250129-150000.bin").unwrap_err();
        assert!(matches!(err, RadarError::NotFound(_)));

        std::fs::write(dir.path().join("KTLX_20250129-150000.bin"), b"x").unwrap();
        assert!(store.resolve_target("KTLX_20250129-150000.bin").is_ok());
    }
}
