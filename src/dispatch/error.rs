//! Operation error taxonomy and HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

use crate::backends::BackendError;
use crate::multipart::DecodeError;

/// Errors that can occur anywhere in the operation pipeline.
///
/// Client-input errors map to 400, everything else to 500. Messages are
/// returned to the caller verbatim.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Request body is not `multipart/form-data`.
    #[error("Expected multipart/form-data, got '{0}'")]
    UnsupportedContentType(String),

    /// Multipart content type without a boundary parameter.
    #[error("Malformed content type: missing multipart boundary")]
    MalformedContentType,

    /// Body could not be read as multipart at all.
    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// No JPEG/PNG file part in an otherwise readable body.
    #[error("No image found in request")]
    NoImageFound,

    /// Explicit operation name that matches no strategy.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Uploaded bytes are not a decodable JPEG or PNG.
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    /// Edit adjustment value that is not a number.
    #[error("Invalid value for '{name}': could not convert '{value}' to float")]
    InvalidSetting { name: String, value: String },

    /// No model file for the requested operation.
    #[error("Model file {0} not found")]
    ModelNotFound(String),

    /// Segmentation or super-resolution backend failed.
    #[error(transparent)]
    BackendFailure(#[from] BackendError),

    /// Output image could not be encoded.
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: &'static str, reason: String },

    /// Anything else, e.g. a worker that panicked.
    #[error("{0}")]
    Internal(String),
}

impl OperationError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            OperationError::UnsupportedContentType(_)
            | OperationError::MalformedContentType
            | OperationError::MalformedMultipart(_)
            | OperationError::NoImageFound
            | OperationError::UnknownOperation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::UnsupportedContentType(_) => "unsupported_content_type",
            OperationError::MalformedContentType => "malformed_content_type",
            OperationError::MalformedMultipart(_) => "malformed_multipart",
            OperationError::NoImageFound => "no_image_found",
            OperationError::UnknownOperation(_) => "unknown_operation",
            OperationError::UnreadableImage(_) => "unreadable_image",
            OperationError::InvalidSetting { .. } => "invalid_setting",
            OperationError::ModelNotFound(_) => "model_not_found",
            OperationError::BackendFailure(_) => "backend_failure",
            OperationError::Encode { .. } => "encode",
            OperationError::Internal(_) => "internal",
        }
    }
}

impl From<DecodeError> for OperationError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedContentType(ct) => OperationError::UnsupportedContentType(ct),
            DecodeError::MalformedContentType => OperationError::MalformedContentType,
            DecodeError::Malformed(e) => OperationError::MalformedMultipart(e.to_string()),
            DecodeError::NoImageFound => OperationError::NoImageFound,
        }
    }
}

/// Result type for pipeline stages.
pub type OperationResult<T> = Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_request() {
        assert_eq!(OperationError::NoImageFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            OperationError::UnknownOperation("resize".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OperationError::UnsupportedContentType("application/json".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(OperationError::MalformedContentType.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn everything_else_is_internal() {
        let err = OperationError::InvalidSetting {
            name: "blur".into(),
            value: "soft".into(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            OperationError::ModelNotFound("ESRGAN_x4.pb".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OperationError::BackendFailure(BackendError::NotConfigured("segmentation")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_verbatim() {
        assert_eq!(OperationError::NoImageFound.to_string(), "No image found in request");
        assert_eq!(
            OperationError::ModelNotFound("ESRGAN_x8.pb".into()).to_string(),
            "Model file ESRGAN_x8.pb not found"
        );
        assert_eq!(
            OperationError::UnknownOperation("resize".into()).to_string(),
            "Unknown operation: resize"
        );
    }
}
