//! Per-operation transform strategies.
//!
//! # Data Flow
//! ```text
//! OperationRequest
//!     → decode_image (JPEG/PNG bytes → DynamicImage)
//!     → compress.rs | edit.rs | remove_background.rs | upscale.rs
//!     → OperationOutcome (binary image or JSON)
//! ```
//!
//! Strategies are synchronous and CPU-bound; the dispatcher runs them on the
//! blocking pool.

pub mod adjustments;
pub mod compress;
pub mod edit;
pub mod remove_background;
pub mod rotation;
pub mod upscale;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::dispatch::{OperationError, OperationOutcome, OperationResult};
use crate::operation::{OperationParams, OperationRequest};

pub use compress::{Compressor, EstimateResult};
pub use edit::Editor;
pub use remove_background::BackgroundRemover;
pub use upscale::Upscaler;

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";

/// A transformation applied to a decoded bitmap.
pub trait Transform {
    type Params;

    fn apply(
        &self,
        image: DynamicImage,
        params: &Self::Params,
    ) -> OperationResult<OperationOutcome>;
}

/// The full set of strategies, one per operation kind.
pub struct Strategies {
    pub compressor: Compressor,
    pub editor: Editor,
    pub background_remover: BackgroundRemover,
    pub upscaler: Upscaler,
}

impl Strategies {
    /// Decode the uploaded image and run the strategy matching the request.
    pub fn run(&self, request: &OperationRequest) -> OperationResult<OperationOutcome> {
        let image = decode_image(&request.image.image_bytes)?;

        tracing::debug!(
            operation = %request.kind(),
            width = image.width(),
            height = image.height(),
            "Applying strategy"
        );

        match &request.params {
            OperationParams::Compress(params) => self.compressor.apply(image, params),
            OperationParams::Edit(settings) => self.editor.apply(image, settings),
            OperationParams::RemoveBackground => self.background_remover.apply(image, &()),
            OperationParams::Upscale(params) => self.upscaler.apply(image, params),
        }
    }
}

/// Decode JPEG or PNG bytes. Anything else is unreadable.
pub fn decode_image(bytes: &[u8]) -> OperationResult<DynamicImage> {
    let format = image::guess_format(bytes)
        .map_err(|e| OperationError::UnreadableImage(e.to_string()))?;

    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(OperationError::UnreadableImage(format!(
            "unsupported image format {:?}",
            format
        )));
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| OperationError::UnreadableImage(e.to_string()))
}

/// Encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> OperationResult<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| OperationError::Encode {
            format: "PNG",
            reason: e.to_string(),
        })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn decodes_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
        let png = encode_png(&image).unwrap();
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, OperationError::UnreadableImage(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([1, 2, 3])));
        let png = encode_png(&image).unwrap();
        let err = decode_image(&png[..png.len() / 2]).unwrap_err();
        assert!(matches!(err, OperationError::UnreadableImage(_)));
    }
}
