//! Multipart upload decoding.
//!
//! # Data Flow
//! ```text
//! Content-Type header + raw body
//!     → decoder.rs (boundary, part scan)
//!     → DecodedUpload { image bytes, image mime, scalar fields }
//! ```
//!
//! # Selection Rules
//! - File part: has a `filename` and declares `image/jpeg` or `image/png`
//! - The first non-empty file part wins, later ones are ignored
//! - Every other named part is a text field, trimmed, last duplicate wins

pub mod decoder;

use std::collections::HashMap;

use axum::body::Bytes;
use thiserror::Error;

pub use decoder::decode;

/// Image types accepted as the file part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    /// Match a MIME essence such as `image/png`.
    pub fn from_essence(essence: &str) -> Option<Self> {
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }
}

/// A decoded upload: one image plus named scalar fields.
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    pub image_bytes: Bytes,
    pub content_type: ImageMime,
    pub fields: HashMap<String, String>,
}

impl DecodedUpload {
    /// Value of a scalar field, if it was sent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether a field was sent at all, regardless of its value.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// Errors produced while decoding a multipart body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Expected multipart/form-data, got '{0}'")]
    UnsupportedContentType(String),

    #[error("Malformed content type: missing multipart boundary")]
    MalformedContentType,

    #[error("Malformed multipart body: {0}")]
    Malformed(#[from] multer::Error),

    #[error("No image found in request")]
    NoImageFound,
}
