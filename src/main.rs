//! Image operations service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ dispatch ──▶ multipart decode
//!                                        │
//!                                        ▼
//!                                  operation builder
//!                                        │
//!                                        ▼
//!                        transform strategies (blocking pool)
//!                    compress │ edit │ remove-background │ upscale
//!                                        │                 │
//!                                        │          model backends
//!                                        ▼          (external programs)
//!     Client Response
//!     ◀────────────── response shaping ◀─┘
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use imgops_service::config::{load_config, ConfigWatcher, ServiceConfig};
use imgops_service::observability::{logging, metrics};
use imgops_service::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "imgops-service")]
#[command(
    about = "HTTP service for image compression, editing, background removal and upscaling",
    long_about = None
)]
struct Args {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "imgops-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        config_file = ?args.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let _signal_listener = shutdown.trigger_on_signal();
    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
