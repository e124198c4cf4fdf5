//! Radar scan API service.
//!
//! HTTP server that assembles NEXRAD Level II real-time scans and serves
//! their elevations, fields and colorized field overlays.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use radar_api::{build_router, config::ServiceConfig, state::AppState};
use storage::ChunkStoreConfig;

#[derive(Parser, Debug)]
#[command(name = "radar-api")]
#[command(about = "NEXRAD real-time scan and field rendering API")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Directory for assembled archives
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Chunk bucket
    #[arg(long, env = "CHUNK_BUCKET", default_value = "unidata-nexrad-level2-chunks")]
    bucket: String,

    /// Bucket region
    #[arg(long, env = "CHUNK_REGION", default_value = "us-east-1")]
    region: String,

    /// Custom S3 endpoint (e.g. a local mirror)
    #[arg(long, env = "CHUNK_ENDPOINT")]
    endpoint: Option<String>,

    /// Sign requests with ambient AWS credentials instead of anonymous access
    #[arg(long, env = "CHUNK_SIGNED")]
    signed: bool,

    /// Per-request timeout for the chunk store (seconds)
    #[arg(long, env = "CHUNK_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Concurrent chunk downloads per scan
    #[arg(long, env = "MAX_CONCURRENT_DOWNLOADS", default_value_t = 8)]
    max_concurrent_downloads: usize,

    /// JSON colour table overriding the built-in one
    #[arg(long, env = "COLOR_CONFIG")]
    color_config: Option<PathBuf>,
}

impl Args {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            data_dir: self.data_dir.clone(),
            chunk_store: ChunkStoreConfig {
                bucket: self.bucket.clone(),
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
                skip_signature: !self.signed,
                timeout_secs: self.timeout_secs,
            },
            max_concurrent_downloads: self.max_concurrent_downloads,
            color_config: self.color_config.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting radar API server");

    let config = args.service_config();
    let state = Arc::new(AppState::new(&config).await?);
    let app = build_router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
