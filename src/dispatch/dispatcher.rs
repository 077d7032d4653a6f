//! Request dispatcher: the single error boundary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;

use crate::backends::{
    CommandSegmentationBackend, CommandSuperResolutionBackend, ModelLocator, SegmentationBackend,
    SuperResolutionBackend, Unconfigured,
};
use crate::config::ServiceConfig;
use crate::dispatch::{OperationError, OperationOutcome, OperationResult};
use crate::multipart;
use crate::observability::metrics;
use crate::operation::{OperationHints, OperationKind, OperationRequest};
use crate::transform::{BackgroundRemover, Compressor, Editor, Strategies, Upscaler};

/// Everything the dispatcher needs from the transport.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Raw `Content-Type` header value.
    pub content_type: String,
    pub body: Bytes,
    pub path: String,
    pub query: HashMap<String, String>,
}

/// Runs one request through decode, build and strategy.
#[derive(Clone)]
pub struct Dispatcher {
    strategies: Arc<Strategies>,
}

impl Dispatcher {
    pub fn new(strategies: Strategies) -> Self {
        Self {
            strategies: Arc::new(strategies),
        }
    }

    /// Wire strategies and backends from configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let locator = Arc::new(ModelLocator::from_config(&config.models));
        let deadline = Duration::from_secs(config.timeouts.request_secs);

        let segmentation: Arc<dyn SegmentationBackend> = match &config.backends.segmentation {
            Some(backend) => Arc::new(
                CommandSegmentationBackend::new(backend.clone()).with_deadline(deadline),
            ),
            None => Arc::new(Unconfigured),
        };

        let super_resolution: Arc<dyn SuperResolutionBackend> =
            match &config.backends.super_resolution {
                Some(backend) => Arc::new(
                    CommandSuperResolutionBackend::new(backend.clone()).with_deadline(deadline),
                ),
                None => Arc::new(Unconfigured),
            };

        tracing::debug!(
            segmentation = ?config.backends.segmentation.as_ref().map(|b| &b.program),
            super_resolution = ?config.backends.super_resolution.as_ref().map(|b| &b.program),
            "Dispatcher configured"
        );

        Self::new(Strategies {
            compressor: Compressor::new(),
            editor: Editor::new(),
            background_remover: BackgroundRemover::new(segmentation, locator.clone()),
            upscaler: Upscaler::new(super_resolution, locator),
        })
    }

    /// Handle one request. Never fails: errors become `Error` outcomes here
    /// and nowhere else.
    pub async fn dispatch(&self, inbound: InboundRequest) -> OperationOutcome {
        let start = Instant::now();
        let mut operation = None;

        let outcome = match self.try_dispatch(inbound, &mut operation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.status().is_server_error() {
                    tracing::error!(kind = err.kind(), error = %err, "Operation failed");
                } else {
                    tracing::warn!(kind = err.kind(), error = %err, "Request rejected");
                }
                OperationOutcome::from(err)
            }
        };

        let label = operation.map(|kind| kind.as_str()).unwrap_or("unknown");
        let status = outcome.status();

        tracing::info!(
            operation = label,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        metrics::record_operation(label, status, start);

        outcome
    }

    async fn try_dispatch(
        &self,
        inbound: InboundRequest,
        operation: &mut Option<OperationKind>,
    ) -> OperationResult<OperationOutcome> {
        let decoded = multipart::decode(&inbound.content_type, inbound.body).await?;
        let hints = OperationHints::new(inbound.path, inbound.query);

        if let Some(name) = hints.explicit_operation(&decoded) {
            if name.parse::<OperationKind>().is_err() {
                return Err(OperationError::UnknownOperation(name.to_string()));
            }
        }

        let request = OperationRequest::build(decoded, &hints);
        *operation = Some(request.kind());

        let strategies = Arc::clone(&self.strategies);
        tokio::task::spawn_blocking(move || strategies.run(&request))
            .await
            .map_err(|e| OperationError::Internal(format!("Operation worker failed: {}", e)))?
    }
}
