//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Build the relay (upstream client, delivery, tracker, worker pool)
//! - Run background tasks (tracker sweeper)
//! - Serve until shutdown, then drain background jobs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::handlers::{cert_add, cert_reject, get_status, health};
use crate::relay::{
    DeliveryPolicy, Relay, RequestTracker, TrackerSweeper, UpstreamClient, WebhookDelivery,
    WorkerPool,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

/// HTTP server for the webhook relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    relay: Relay,
    pool: WorkerPool,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        // One connection pool for upstream and callback traffic
        let http = reqwest::Client::builder()
            .user_agent(concat!("cert-webhook-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let pool = WorkerPool::new(config.workers.max_concurrent);
        let relay = Relay::new(
            RequestTracker::new(),
            UpstreamClient::new(http.clone(), &config.upstream),
            WebhookDelivery::new(http, DeliveryPolicy::from(&config.webhook)),
            Arc::new(pool.clone()),
        );

        Ok(Self::with_relay(config, relay, pool))
    }

    /// Create a server around an already built relay. `pool` must be the
    /// runner the relay schedules on, so shutdown can drain it.
    pub fn with_relay(config: RelayConfig, relay: Relay, pool: WorkerPool) -> Self {
        let state = AppState {
            relay: relay.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            relay,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/v1.0/cert/add", post(cert_add))
            .route("/api/v1.0/cert/reject", post(cert_reject))
            .route("/status/{request_id}", get(get_status))
            .route("/health", get(health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router with state and middleware applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            workers = self.pool.capacity(),
            "HTTP server starting"
        );

        if let Some(sweeper) =
            TrackerSweeper::from_config(self.relay.tracker().clone(), &self.config.tracker)
        {
            tokio::spawn(sweeper.run(shutdown.resubscribe()));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(
            pending = self.pool.in_flight(),
            "HTTP server stopped, draining background jobs"
        );
        let drain_timeout = Duration::from_secs(self.config.workers.drain_timeout_secs);
        if self.pool.drain(drain_timeout).await {
            tracing::info!("Background jobs drained");
        }

        Ok(())
    }
}
