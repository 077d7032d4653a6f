//! Request dispatch and the response contract.
//!
//! # Data Flow
//! ```text
//! InboundRequest (content type, body, path, query)
//!     → multipart::decode
//!     → explicit operation check (unknown name → 400)
//!     → OperationRequest::build
//!     → Strategies::run on the blocking pool
//!     → OperationOutcome (binary | JSON | error)
//! ```
//!
//! # Design Decisions
//! - One catch-all boundary: every `OperationError` is converted to an
//!   outcome in `Dispatcher::dispatch` and nowhere else
//! - The dispatcher is immutable; a config reload builds a new one

pub mod dispatcher;
pub mod error;
pub mod outcome;

pub use dispatcher::{Dispatcher, InboundRequest};
pub use error::{OperationError, OperationResult};
pub use outcome::OperationOutcome;
