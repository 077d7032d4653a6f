//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check the bind addresses parse
//! - Check backend program definitions are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use tracing::Level;

use crate::config::schema::{CommandBackendConfig, ServiceConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `listener.bind_address`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.models.ancestor_depth > 32 {
        errors.push(ValidationError::new("models.ancestor_depth", "must be at most 32"));
    }

    if let Some(backend) = &config.backends.segmentation {
        validate_backend("backends.segmentation", backend, &mut errors);
    }
    if let Some(backend) = &config.backends.super_resolution {
        validate_backend("backends.super_resolution", backend, &mut errors);
    }

    if config.observability.log_level.parse::<Level>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backend(
    field: &str,
    backend: &CommandBackendConfig,
    errors: &mut Vec<ValidationError>,
) {
    if backend.program.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.program", field), "must not be empty"));
    }

    let io_placeholders = ["{input}", "{output}"];
    for placeholder in io_placeholders {
        if !backend.args.iter().any(|arg| arg.contains(placeholder)) {
            errors.push(ValidationError::new(
                format!("{}.args", field),
                format!("missing {} placeholder", placeholder),
            ));
        }
    }

    if let Some(var) = &backend.model_home_env {
        if var.is_empty() || var.contains('=') || var.contains('\0') {
            errors.push(ValidationError::new(
                format!("{}.model_home_env", field),
                format!("'{}' is not a valid environment variable name", var),
            ));
        }
    }
}
