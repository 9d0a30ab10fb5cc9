//! Certificate webhook relay
//!
//! Accepts certificate add/reject requests, answers immediately with a
//! request id, forwards the work to the certificate API in the background
//! and reports the outcome to the caller's webhook.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──POST /api/v1.0/cert/{add,reject}──▶ http::server
//!        ▲                                            │
//!        │ 202 {request_id}                           ▼
//!        └──────────────────────────────────── relay::orchestrator
//!                                                     │ tracker.create
//!                                                     ▼
//!                                              relay::pool (bounded)
//!                                                     │
//!                               ┌─────────────────────┴──────────────┐
//!                               ▼                                    ▼
//!                      relay::upstream ──▶ cert API        relay::delivery ──▶ callback_url
//!                               │                                    │
//!                               └──────────▶ relay::tracker ◀────────┘
//!                                                     ▲
//!     Client ──GET /status/{id}───────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cert_webhook_relay::config::load_config;
use cert_webhook_relay::lifecycle::signals;
use cert_webhook_relay::observability::{logging, metrics};
use cert_webhook_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "cert-webhook-relay")]
#[command(about = "Asynchronous relay between clients and the certificate API", long_about = None)]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "cert-webhook-relay starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cert_api = %config.upstream.base_url,
        auth_key_set = !config.upstream.auth_key.is_empty(),
        webhook_timeout_secs = config.webhook.timeout_secs,
        webhook_retry_count = config.webhook.retry_count,
        webhook_retry_delay_secs = config.webhook.retry_delay_secs,
        max_concurrent = config.workers.max_concurrent,
        "Configuration loaded"
    );

    if config.upstream.auth_key.is_empty() {
        tracing::warn!("CERT_API_AUTH_KEY is not set, cert API calls will be unauthenticated");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
