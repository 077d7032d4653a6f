//! Uniform result contract shared by every strategy.

use axum::http::StatusCode;
use serde::Serialize;

use crate::dispatch::error::OperationError;

/// What a request produced. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Transformed image returned as an attachment.
    Binary {
        bytes: Vec<u8>,
        mime: &'static str,
        filename: String,
    },
    /// JSON document, e.g. a compression estimate.
    Json {
        payload: serde_json::Value,
        status: StatusCode,
    },
    /// Failure reported as `{"error": message}`.
    Error { message: String, status: StatusCode },
}

impl OperationOutcome {
    pub fn binary(bytes: Vec<u8>, mime: &'static str, filename: impl Into<String>) -> Self {
        Self::Binary {
            bytes,
            mime,
            filename: filename.into(),
        }
    }

    /// JSON outcome with status 200.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, OperationError> {
        let payload = serde_json::to_value(value)
            .map_err(|e| OperationError::Internal(format!("Failed to serialize response: {}", e)))?;
        Ok(Self::Json {
            payload,
            status: StatusCode::OK,
        })
    }

    /// HTTP status the outcome will be sent with.
    pub fn status(&self) -> StatusCode {
        match self {
            OperationOutcome::Binary { .. } => StatusCode::OK,
            OperationOutcome::Json { status, .. } | OperationOutcome::Error { status, .. } => {
                *status
            }
        }
    }
}

impl From<OperationError> for OperationOutcome {
    fn from(err: OperationError) -> Self {
        Self::Error {
            status: err.status(),
            message: err.to_string(),
        }
    }
}
