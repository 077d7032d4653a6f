//! Ordered adjustment pipeline.
//!
//! # Pipeline
//! ```text
//! brightness → contrast → saturation → blur → rotation → sepia
//! ```
//!
//! Each step runs only when its setting is present. The order is fixed and
//! independent of the order fields arrived in.
//!
//! # Design Decisions
//! - Every setting is parsed before any pixel is touched, so a bad value
//!   fails the request without partial work
//! - Work happens on an RGBA buffer; the output keeps alpha only if the
//!   source had it and sepia did not run
//! - Blur sigma is capped at the longer canvas side; the kernel grows with
//!   sigma and a wider blur looks the same

use image::imageops;
use image::{DynamicImage, RgbaImage};

use crate::dispatch::{OperationError, OperationOutcome, OperationResult};
use crate::operation::{Adjustment, EditSettings};
use crate::transform::{adjustments, encode_png, rotation, Transform, MIME_PNG};

pub const EDITED_FILENAME: &str = "edited.png";

/// Strict numeric parse for an adjustment value.
pub fn parse_setting(name: &str, raw: &str) -> OperationResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| OperationError::InvalidSetting {
            name: name.to_string(),
            value: raw.to_string(),
        })
}

/// A parsed adjustment, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Brightness(f64),
    Contrast(f64),
    Saturation(f64),
    Blur(f64),
    Rotation(f64),
    Sepia(f64),
}

impl Step {
    fn parse(adjustment: Adjustment, raw: &str) -> OperationResult<Option<Step>> {
        let value = parse_setting(adjustment.as_str(), raw)?;

        let step = match adjustment {
            Adjustment::Brightness => Some(Step::Brightness(value / 100.0)),
            Adjustment::Contrast => Some(Step::Contrast(value / 100.0)),
            Adjustment::Saturation => Some(Step::Saturation(value / 100.0)),
            Adjustment::Blur => (value > 0.0).then_some(Step::Blur(value)),
            Adjustment::Rotation => (value != 0.0).then_some(Step::Rotation(value)),
            Adjustment::Sepia => (value > 0.0).then_some(Step::Sepia(value / 100.0)),
        };

        Ok(step)
    }
}

/// Gaussian sigma for a blur radius, bounded by the canvas. `None` when the
/// radius rounds to nothing at `f32` precision.
fn blur_sigma(radius: f64, pixels: &RgbaImage) -> Option<f32> {
    let longest = pixels.width().max(pixels.height()).max(1);
    let sigma = radius.min(f64::from(longest)) as f32;
    sigma.is_normal().then_some(sigma)
}

/// Working state carried through the pipeline.
struct Canvas {
    pixels: RgbaImage,
    keep_alpha: bool,
}

impl Canvas {
    fn apply(&mut self, step: Step) {
        match step {
            Step::Brightness(factor) => adjustments::brightness(&mut self.pixels, factor),
            Step::Contrast(factor) => adjustments::contrast(&mut self.pixels, factor),
            Step::Saturation(factor) => adjustments::saturation(&mut self.pixels, factor),
            Step::Blur(radius) => {
                if let Some(sigma) = blur_sigma(radius, &self.pixels) {
                    self.pixels = imageops::blur(&self.pixels, sigma);
                }
            }
            Step::Rotation(degrees) => {
                self.pixels = rotation::rotate_expand(&self.pixels, degrees)
            }
            Step::Sepia(intensity) => {
                let toned = adjustments::sepia(&self.pixels, intensity);
                self.pixels = DynamicImage::ImageRgb8(toned).to_rgba8();
                self.keep_alpha = false;
            }
        }
    }

    fn finish(self) -> DynamicImage {
        let image = DynamicImage::ImageRgba8(self.pixels);
        if self.keep_alpha {
            image
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
    }
}

/// Applies edit settings in the fixed pipeline order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Editor;

impl Editor {
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline and return the edited bitmap.
    pub fn edit(
        &self,
        image: DynamicImage,
        settings: &EditSettings,
    ) -> OperationResult<DynamicImage> {
        let steps = settings
            .ordered()
            .map(|(adjustment, raw)| Step::parse(adjustment, raw))
            .collect::<OperationResult<Vec<_>>>()?;

        let mut canvas = Canvas {
            keep_alpha: image.color().has_alpha(),
            pixels: image.to_rgba8(),
        };

        for step in steps.into_iter().flatten() {
            tracing::trace!(?step, "Applying adjustment");
            canvas.apply(step);
        }

        Ok(canvas.finish())
    }
}

impl Transform for Editor {
    type Params = EditSettings;

    fn apply(
        &self,
        image: DynamicImage,
        settings: &EditSettings,
    ) -> OperationResult<OperationOutcome> {
        let edited = self.edit(image, settings)?;
        let png = encode_png(&edited)?;
        Ok(OperationOutcome::binary(png, MIME_PNG, EDITED_FILENAME))
    }
}
