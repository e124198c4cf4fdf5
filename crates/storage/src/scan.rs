//! Scan completeness and the latest/previous fallback policy.

use radar_common::ScanTimestamp;

use crate::inventory::ScanGroup;

/// A scan is complete when it has a start and an end chunk and more than
/// two distinct chunk types.
pub fn is_complete(group: &ScanGroup) -> bool {
    group.markers.contains(&'S') && group.markers.contains(&'E') && group.markers.len() > 2
}

/// Why a scan was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// The newest scan is complete.
    LatestComplete,
    /// The newest scan is partial; the previous one is already on disk.
    PreviousCached,
    /// The newest scan is partial; the previous one will be assembled.
    PreviousRemote,
    /// Nothing better is available; serve the partial newest scan.
    LatestPartial,
}

/// The selected scan and the rule that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanChoice {
    pub group: ScanGroup,
    pub reason: SelectionReason,
}

/// Decide which scan to serve.
///
/// `exists_locally(station, timestamp)` reports whether an archive for the
/// scan is already persisted. Returns `None` only when both inputs are
/// absent.
pub fn select_scan<F>(
    latest: Option<&ScanGroup>,
    previous: Option<&ScanGroup>,
    exists_locally: F,
) -> Option<ScanChoice>
where
    F: Fn(&str, &ScanTimestamp) -> bool,
{
    let choice = |group: &ScanGroup, reason| {
        Some(ScanChoice {
            group: group.clone(),
            reason,
        })
    };

    if let Some(latest) = latest.filter(|g| is_complete(g)) {
        return choice(latest, SelectionReason::LatestComplete);
    }

    if let Some(previous) = previous.filter(|g| !g.is_empty()) {
        if exists_locally(&previous.station, &previous.timestamp) {
            return choice(previous, SelectionReason::PreviousCached);
        }
        return choice(previous, SelectionReason::PreviousRemote);
    }

    latest.and_then(|g| choice(g, SelectionReason::LatestPartial))
}
