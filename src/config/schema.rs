//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the image operations service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upload size limits.
    pub limits: LimitsConfig,

    /// Model file search locations.
    pub models: ModelsConfig,

    /// External model backends.
    pub backends: BackendsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed per request, including the transform, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Where model files are looked up.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Checked first.
    pub local_dir: PathBuf,

    /// Shared model cache. `None` means the user cache directory.
    pub shared_dir: Option<PathBuf>,

    /// Starting point for the ancestor `models/` search.
    pub base_dir: PathBuf,

    /// How many ancestors of `base_dir` to search.
    pub ancestor_depth: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("models"),
            shared_dir: None,
            base_dir: PathBuf::from("."),
            ancestor_depth: 3,
        }
    }
}

/// External programs backing the model-driven operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendsConfig {
    /// Background segmentation program.
    pub segmentation: Option<CommandBackendConfig>,

    /// Super-resolution program.
    pub super_resolution: Option<CommandBackendConfig>,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            segmentation: Some(CommandBackendConfig {
                program: "rembg".to_string(),
                args: ["i", "-m", "u2net", "{input}", "{output}"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                model_home_env: Some("U2NET_HOME".to_string()),
            }),
            super_resolution: None,
        }
    }
}

/// An external program invoked once per operation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CommandBackendConfig {
    /// Executable name or path.
    pub program: String,

    /// Argument templates, see `backends::command` for placeholders.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variable set on the child to the model directory.
    #[serde(default)]
    pub model_home_env: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
