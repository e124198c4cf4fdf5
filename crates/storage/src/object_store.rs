//! Remote chunk access (S3 compatible).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use object_store::{aws::AmazonS3Builder, path::Path, ClientOptions, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::inventory::ChunkObject;

/// Public bucket holding NEXRAD Level II real-time chunks.
pub const DEFAULT_BUCKET: &str = "unidata-nexrad-level2-chunks";

/// Read-only access to chunk objects.
///
/// The assembler and inventory only need listing and whole-object reads, so
/// tests can substitute any implementation.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Every object under `prefix`, yielded page by page as the listing
    /// proceeds.
    fn list<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<ChunkObject, StorageError>>;

    /// Whole object body.
    async fn fetch(&self, key: &str) -> Result<Bytes, StorageError>;
}

/// Configuration for the chunk bucket connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStoreConfig {
    /// Bucket name
    pub bucket: String,
    /// AWS region of the bucket
    pub region: String,
    /// Custom endpoint (e.g. a local MinIO mirror)
    pub endpoint: Option<String>,
    /// Send unsigned requests (public buckets)
    pub skip_signature: bool,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ChunkStoreConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            skip_signature: true,
            timeout_secs: 30,
        }
    }
}

/// Chunk store client backed by `object_store`.
pub struct ChunkStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ChunkStore {
    /// Create an S3 client from config.
    pub fn new(config: &ChunkStoreConfig) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_skip_signature(config.skip_signature)
            .with_client_options(
                ClientOptions::new().with_timeout(Duration::from_secs(config.timeout_secs)),
            );

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Client(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Wrap an existing store (e.g. `InMemory` in tests).
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ChunkSource for ChunkStore {
    fn list<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<ChunkObject, StorageError>> {
        debug!(bucket = %self.bucket, prefix = %prefix, "Listing chunk objects");
        let prefix_path = Path::from(prefix);
        let prefix = prefix.to_string();

        self.store
            .list(Some(&prefix_path))
            .map(move |item| {
                item.map(|meta| ChunkObject {
                    key: meta.location.to_string(),
                    size: meta.size as u64,
                    last_modified: meta.last_modified,
                })
                .map_err(|e| StorageError::List {
                    prefix: prefix.clone(),
                    message: e.to_string(),
                })
            })
            .boxed()
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn fetch(&self, key: &str) -> Result<Bytes, StorageError> {
        let location = Path::from(key);
        let read_err = |e: object_store::Error| StorageError::Read {
            key: key.to_string(),
            message: e.to_string(),
        };

        let bytes = self
            .store
            .get(&location)
            .await
            .map_err(read_err)?
            .bytes()
            .await
            .map_err(read_err)?;

        debug!(size = bytes.len(), "Fetched chunk");
        Ok(bytes)
    }
}
