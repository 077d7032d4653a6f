//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Hand requests to the dispatcher held in shared state
//! - Swap the dispatcher when a new configuration arrives
//! - Stop on the shutdown broadcast (signals arrive through it too)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, map_response_body::MapResponseBodyLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::config::ServiceConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{
    inbound_request, propagate_request_id_layer, set_request_id_layer, RequestIdExt,
};
use crate::lifecycle::ShutdownReason;

/// Per-configuration state. Replaced as a whole on reload.
pub struct InnerState {
    pub config: ServiceConfig,
    pub dispatcher: Dispatcher,
}

impl InnerState {
    pub fn new(config: ServiceConfig) -> Self {
        let dispatcher = Dispatcher::from_config(&config);
        Self { config, dispatcher }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(InnerState::new(config))),
        }
    }

    /// Replace the dispatcher. In-flight requests finish on the old one.
    pub fn reload(&self, config: ServiceConfig) {
        let previous = self.inner.load_full();
        let pending = restart_required(&previous.config, &config);
        if !pending.is_empty() {
            tracing::warn!(
                sections = ?pending,
                "Listener, timeout and limit changes take effect after a restart"
            );
        }

        self.inner.store(Arc::new(InnerState::new(config)));
        tracing::info!("Configuration reloaded");
    }
}

/// Config sections baked into the listener and middleware stack at startup.
fn restart_required(previous: &ServiceConfig, next: &ServiceConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if previous.listener != next.listener {
        sections.push("listener");
    }
    if previous.timeouts != next.timeouts {
        sections.push("timeouts");
    }
    if previous.limits != next.limits {
        sections.push("limits");
    }
    sections
}

/// HTTP server for the image operations service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let router = Self::build_router(&config);
        let state = AppState::new(config);
        Self {
            router: router.with_state(state.clone()),
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig) -> Router<AppState> {
        Router::new()
            .route("/health", get(health_handler))
            .route("/", post(operation_handler))
            .route("/{*path}", post(operation_handler))
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes)),
            )
    }

    /// The fully layered router, e.g. for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state handle.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Applies configurations received on `config_updates` and stops when
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<ShutdownReason>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                reload_state.reload(config);
            }
        });

        let stop = async move {
            match shutdown.recv().await {
                Ok(reason) => tracing::info!(?reason, "Stopping HTTP server"),
                Err(_) => tracing::info!("Shutdown coordinator dropped, stopping HTTP server"),
            }
        };

        axum::serve(listener, self.router)
            .with_graceful_shutdown(stop)
            .await?;

        reload_task.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Single entry point for every operation.
async fn operation_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = headers.request_id().unwrap_or("unknown").to_string();
    let inbound = inbound_request(uri.path(), query, &headers, body);

    tracing::debug!(
        request_id = %request_id,
        path = %inbound.path,
        bytes = inbound.body.len(),
        "Operation request received"
    );

    let inner = state.inner.load_full();
    let span = tracing::info_span!("dispatch", request_id = %request_id);

    inner
        .dispatcher
        .dispatch(inbound)
        .instrument(span)
        .await
        .into_response()
}
