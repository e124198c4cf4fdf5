//! Application state and shared resources.

use anyhow::Result;
use level2_parser::Level2Decoder;
use radar_common::{ColorConfig, VolumeDecoder};
use std::sync::Arc;
use storage::{ArchiveStore, ChunkSource, ChunkStore};
use tracing::info;

use crate::config::ServiceConfig;
use crate::pipeline::ScanService;

/// Shared application state.
pub struct AppState {
    pub scans: ScanService,
}

impl AppState {
    /// Build from configuration: S3 chunk store, Level II decoder.
    pub async fn new(config: &ServiceConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let store = ChunkStore::new(&config.chunk_store)?;
        info!(
            bucket = %store.bucket(),
            data_dir = %config.data_dir.display(),
            "Chunk store ready"
        );

        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(Level2Decoder::new()),
            config.load_colors()?,
        ))
    }

    /// Build from explicit parts (tests use an in-memory source).
    pub fn with_parts(
        config: &ServiceConfig,
        source: Arc<dyn ChunkSource>,
        decoder: Arc<dyn VolumeDecoder>,
        colors: ColorConfig,
    ) -> Self {
        Self {
            scans: ScanService::new(
                source,
                decoder,
                ArchiveStore::new(&config.data_dir),
                colors,
                config.max_concurrent_downloads,
            ),
        }
    }
}
