//! Service configuration.

use anyhow::{Context, Result};
use radar_common::ColorConfig;
use std::path::{Path, PathBuf};
use storage::ChunkStoreConfig;

/// Runtime configuration assembled from CLI arguments and environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding assembled archives
    pub data_dir: PathBuf,
    /// Remote chunk bucket
    pub chunk_store: ChunkStoreConfig,
    /// Upper bound on concurrent chunk downloads per scan
    pub max_concurrent_downloads: usize,
    /// Optional JSON colour table overriding the built-in one
    pub color_config: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chunk_store: ChunkStoreConfig::default(),
            max_concurrent_downloads: storage::assembler::DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            color_config: None,
        }
    }
}

impl ServiceConfig {
    /// The colour table: the configured file if any, else the built-in one.
    pub fn load_colors(&self) -> Result<ColorConfig> {
        match &self.color_config {
            Some(path) => load_color_file(path),
            None => Ok(ColorConfig::default()),
        }
    }
}

fn load_color_file(path: &Path) -> Result<ColorConfig> {
    let colors = ColorConfig::from_file(path)
        .with_context(|| format!("Failed to load colour config {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        fields = colors.fields.len(),
        "Loaded colour config"
    );
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.chunk_store.bucket, "unidata-nexrad-level2-chunks");
        assert!(config.max_concurrent_downloads > 0);
        assert!(config.load_colors().is_ok());
    }

    #[test]
    fn test_missing_color_file_is_error() {
        let config = ServiceConfig {
            color_config: Some(PathBuf::from("/nonexistent/colors.json")),
            ..ServiceConfig::default()
        };
        assert!(config.load_colors().is_err());
    }
}
