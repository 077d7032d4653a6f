//! Operation request building.
//!
//! # Data Flow
//! ```text
//! DecodedUpload + OperationHints (path, query)
//!     → builder.rs (kind resolution, lenient field parsing)
//!     → OperationRequest (immutable, one per request)
//! ```
//!
//! # Kind Resolution
//! 1. `operation` query parameter or form field, if it names a kind
//! 2. Final path segment, if it names a kind
//! 3. `edit`

pub mod builder;
pub mod types;

pub use builder::{resolve_kind, OperationHints};
pub use types::{
    Adjustment, CompressParams, EditSettings, OperationKind, OperationParams, OperationRequest,
    ScaleFactor, UpscaleParams,
};
