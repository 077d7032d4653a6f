//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT ──┐
//!                  ├─▶ Shutdown broadcast
//! trigger() ───────┘      → server stops accepting → in-flight requests drain
//! ```

pub mod signals;

pub use signals::{shutdown_signal, Shutdown, ShutdownReason};
