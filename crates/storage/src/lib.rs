//! Storage for the radar services.
//!
//! Provides:
//! - Remote chunk access (the public real-time S3 bucket, or any `ObjectStore`)
//! - Chunk inventory: grouping keys into scans by timestamp
//! - Scan completeness and the latest/previous fallback policy
//! - Archive assembly into the local archive directory, single flight per scan

pub mod archive;
pub mod assembler;
pub mod error;
pub mod inventory;
pub mod locks;
pub mod object_store;
pub mod scan;

pub use self::object_store::{ChunkSource, ChunkStore, ChunkStoreConfig};
pub use archive::{ArchiveStore, AssemblyOutcome, RadarArchive};
pub use assembler::ScanAssembler;
pub use error::{AssemblyError, ListingError, StorageError};
pub use inventory::{
    group_chunks, list_groups, parse_key, ChunkObject, ScanFold, ScanGroup, ScanInventory,
};
pub use locks::ScanLocks;
pub use scan::{is_complete, select_scan, ScanChoice, SelectionReason};
