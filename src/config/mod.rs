//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → Dispatcher::from_config (backends, model locator)
//!
//! On file change:
//!     watcher.rs detects change (one reload per save burst)
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server builds a new Dispatcher and swaps it in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener, request timeout and body limit changes need a restart; model
//!   and backend changes apply to the next request

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendsConfig, CommandBackendConfig, LimitsConfig, ListenerConfig, ModelsConfig,
    ObservabilityConfig, ServiceConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{ConfigWatcher, WatchGuard};
