//! Image operations service library.
//!
//! Accepts a multipart upload with one JPEG/PNG image and a few form fields,
//! runs one of four operations (compress, remove-background, upscale, edit)
//! and returns the result as an image attachment or JSON.

pub mod backends;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod multipart;
pub mod observability;
pub mod operation;
pub mod transform;

pub use config::ServiceConfig;
pub use dispatch::{Dispatcher, InboundRequest, OperationError, OperationOutcome};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownReason};
