//! External model backends.
//!
//! Background segmentation and super-resolution are opaque capabilities. The
//! strategies talk to them through the traits below; the pixel algorithms
//! live outside this crate.
//!
//! # Data Flow
//! ```text
//! Strategy
//!     → locator.rs (find model file on disk)
//!     → SegmentationBackend / SuperResolutionBackend (trait object)
//!     → command.rs (default: external program, per-call staging directory)
//! ```
//!
//! # Design Decisions
//! - Backend configuration travels with each call, never through process-wide
//!   environment variables
//! - Backends are synchronous; callers run them on the blocking pool

pub mod command;
pub mod locator;

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use thiserror::Error;

use crate::operation::ScaleFactor;

pub use command::{CommandSegmentationBackend, CommandSuperResolutionBackend};
pub use locator::ModelLocator;

/// Errors raised by a model backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend configured for this capability.
    #[error("No {0} backend configured")]
    NotConfigured(&'static str),

    /// Staging files could not be written or read.
    #[error("Backend staging failed: {0}")]
    Staging(#[from] std::io::Error),

    /// The backend program could not be started.
    #[error("Failed to start backend program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend program exited unsuccessfully.
    #[error("Backend program '{program}' failed with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// The backend program ran past its deadline and was killed.
    #[error("Backend program '{program}' timed out after {deadline:?}")]
    TimedOut { program: String, deadline: Duration },

    /// The backend produced no usable image.
    #[error("Backend output unreadable: {0}")]
    Output(String),
}

/// Per-call configuration for the segmentation backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationSettings {
    /// Directory holding the segmentation model, if one was located.
    pub model_home: Option<PathBuf>,
}

/// Removes the background from an image.
pub trait SegmentationBackend: Send + Sync {
    /// Returns the image with an alpha channel masking out the background.
    fn segment(
        &self,
        image: &DynamicImage,
        settings: &SegmentationSettings,
    ) -> Result<DynamicImage, BackendError>;
}

/// A loaded super-resolution model.
pub trait SuperResolutionModel: Send {
    fn upsample(&self, image: &DynamicImage) -> Result<DynamicImage, BackendError>;
}

/// Loads super-resolution models.
pub trait SuperResolutionBackend: Send + Sync {
    fn load_model(
        &self,
        path: &Path,
        algorithm: &str,
        scale: ScaleFactor,
    ) -> Result<Box<dyn SuperResolutionModel>, BackendError>;
}

/// Placeholder used when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl SegmentationBackend for Unconfigured {
    fn segment(
        &self,
        _image: &DynamicImage,
        _settings: &SegmentationSettings,
    ) -> Result<DynamicImage, BackendError> {
        Err(BackendError::NotConfigured("segmentation"))
    }
}

impl SuperResolutionBackend for Unconfigured {
    fn load_model(
        &self,
        _path: &Path,
        _algorithm: &str,
        _scale: ScaleFactor,
    ) -> Result<Box<dyn SuperResolutionModel>, BackendError> {
        Err(BackendError::NotConfigured("super-resolution"))
    }
}
