//! Scan assembly: download a scan's chunks and concatenate them in key order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{future, stream, StreamExt};
use metrics::counter;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::archive::{AssemblyOutcome, RadarArchive};
use crate::error::AssemblyError;
use crate::inventory::ScanGroup;
use crate::object_store::ChunkSource;

/// Default number of concurrent chunk downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Downloads and concatenates scan chunks.
#[derive(Clone)]
pub struct ScanAssembler {
    source: Arc<dyn ChunkSource>,
    max_concurrent: usize,
}

impl ScanAssembler {
    pub fn new(source: Arc<dyn ChunkSource>, max_concurrent: usize) -> Self {
        Self {
            source,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Assemble `group` into `target`.
    ///
    /// An existing target is returned untouched. Chunks download
    /// concurrently into a temporary directory; failed chunks are logged and
    /// left out. The result is written to a `.partial` sibling and renamed
    /// into place, so `target` is either absent or complete.
    #[instrument(skip(self, group), fields(station = %group.station, timestamp = %group.timestamp))]
    pub async fn assemble(
        &self,
        group: &ScanGroup,
        target: &Path,
    ) -> Result<AssemblyOutcome, AssemblyError> {
        let archive = RadarArchive {
            station: group.station.clone(),
            timestamp: group.timestamp.clone(),
            path: target.to_path_buf(),
        };

        if fs::try_exists(target).await? {
            debug!(path = %target.display(), "Archive already present");
            return Ok(AssemblyOutcome {
                archive,
                created: false,
            });
        }

        let workdir = tempfile::Builder::new().prefix("radar-chunks-").tempdir()?;

        let downloads: Vec<_> = group
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let dest = workdir.path().join(format!("{:05}.chunk", index));
                self.download_chunk(&chunk.key, dest)
            })
            .collect();
        let mut downloaded: Vec<(String, PathBuf)> = stream::iter(downloads)
            .buffer_unordered(self.max_concurrent)
            .filter_map(future::ready)
            .collect()
            .await;

        let failed = group.chunks.len() - downloaded.len();
        if downloaded.is_empty() {
            return Err(AssemblyError::NoChunks {
                station: group.station.clone(),
                timestamp: group.timestamp.to_string(),
            });
        }

        downloaded.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(target);
        let written = async {
            let size = concatenate(&downloaded, &partial).await?;
            fs::rename(&partial, target).await?;
            Ok::<u64, std::io::Error>(size)
        }
        .await;

        let size = match written {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e.into());
            }
        };

        counter!("scans_assembled_total").increment(1);
        info!(
            path = %target.display(),
            chunks = downloaded.len(),
            failed = failed,
            size = size,
            "Assembled scan archive"
        );

        Ok(AssemblyOutcome {
            archive,
            created: true,
        })
    }

    async fn download_chunk(&self, key: &str, dest: PathBuf) -> Option<(String, PathBuf)> {
        let result = match self.source.fetch(key).await {
            Ok(bytes) => fs::write(&dest, &bytes).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => Some((key.to_string(), dest)),
            Err(error) => {
                counter!("chunk_download_failures_total").increment(1);
                warn!(key = %key, error = %error, "Chunk download failed, skipping");
                None
            }
        }
    }
}

async fn concatenate(chunks: &[(String, PathBuf)], dest: &Path) -> std::io::Result<u64> {
    let mut out = fs::File::create(dest).await?;
    let mut total = 0u64;
    for (_, path) in chunks {
        let bytes = fs::read(path).await?;
        out.write_all(&bytes).await?;
        total += bytes.len() as u64;
    }
    out.flush().await?;
    Ok(total)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_is_sibling() {
        let partial = partial_path(Path::new("/data/KTLX_20250129-150000.bin"));
        assert_eq!(partial, PathBuf::from("/data/KTLX_20250129-150000.bin.partial"));
    }
}
