//! JPEG re-encoding and compression estimates.

use image::{DynamicImage, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use serde::{Deserialize, Serialize};

use crate::dispatch::{OperationError, OperationOutcome, OperationResult};
use crate::operation::CompressParams;
use crate::transform::{encode_png, Transform, MIME_JPEG};

pub const COMPRESSED_FILENAME: &str = "compressed.jpg";

/// Sizes reported instead of image bytes when an estimate is requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    #[serde(rename = "savings")]
    pub savings_percent: f64,
}

impl EstimateResult {
    /// Compute ratio and savings, both rounded to two decimals.
    pub fn new(original_size: u64, compressed_size: u64) -> Self {
        let compression_ratio = if compressed_size > 0 {
            round2(original_size as f64 / compressed_size as f64)
        } else {
            0.0
        };

        let savings_percent = if original_size > 0 {
            round2((original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            original_size,
            compressed_size,
            compression_ratio,
            savings_percent,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn encode_rgb(rgb: &RgbImage, quality: u8, optimize: bool) -> OperationResult<Vec<u8>> {
    let encode_error = |reason: String| OperationError::Encode {
        format: "JPEG",
        reason,
    };

    let (width, height) = match (u16::try_from(rgb.width()), u16::try_from(rgb.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(encode_error(format!(
                "{}x{} exceeds the 65535 pixel JPEG limit",
                rgb.width(),
                rgb.height()
            )))
        }
    };

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, quality);
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| encode_error(e.to_string()))?;

    Ok(buffer)
}

/// Re-encodes images as JPEG at a requested quality.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor;

impl Compressor {
    pub fn new() -> Self {
        Self
    }

    /// Encode as JPEG with optimized Huffman tables. Alpha is dropped, JPEG
    /// has no transparency.
    pub fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> OperationResult<Vec<u8>> {
        encode_rgb(&image.to_rgb8(), quality, true)
    }

    /// Compare a lossless PNG copy against the JPEG at `quality`.
    pub fn estimate(&self, image: &DynamicImage, quality: u8) -> OperationResult<EstimateResult> {
        let original_size = encode_png(image)?.len() as u64;
        let compressed_size = self.encode_jpeg(image, quality)?.len() as u64;
        Ok(EstimateResult::new(original_size, compressed_size))
    }
}

impl Transform for Compressor {
    type Params = CompressParams;

    fn apply(
        &self,
        image: DynamicImage,
        params: &CompressParams,
    ) -> OperationResult<OperationOutcome> {
        if params.estimate_only {
            let estimate = self.estimate(&image, params.quality)?;
            tracing::debug!(
                quality = params.quality,
                original_size = estimate.original_size,
                compressed_size = estimate.compressed_size,
                "Compression estimated"
            );
            return OperationOutcome::json(&estimate);
        }

        let jpeg = self.encode_jpeg(&image, params.quality)?;
        tracing::debug!(quality = params.quality, bytes = jpeg.len(), "Image compressed");

        Ok(OperationOutcome::binary(jpeg, MIME_JPEG, COMPRESSED_FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) * 3 % 256) as u8])
        }))
    }

    #[test]
    fn estimate_rounding() {
        let estimate = EstimateResult::new(1000, 300);
        assert_eq!(estimate.compression_ratio, 3.33);
        assert_eq!(estimate.savings_percent, 70.0);

        let estimate = EstimateResult::new(100, 300);
        assert_eq!(estimate.compression_ratio, 0.33);
        assert_eq!(estimate.savings_percent, -200.0);
    }

    #[test]
    fn estimate_zero_guard() {
        let estimate = EstimateResult::new(1000, 0);
        assert_eq!(estimate.compression_ratio, 0.0);
        assert_eq!(estimate.savings_percent, 100.0);

        let estimate = EstimateResult::new(0, 0);
        assert_eq!(estimate.savings_percent, 0.0);
    }

    #[test]
    fn estimate_json_shape() {
        let value = serde_json::to_value(EstimateResult::new(2000, 1000)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "originalSize": 2000,
                "compressedSize": 1000,
                "compressionRatio": 2.0,
                "savings": 50.0
            })
        );
    }

    #[test]
    fn compress_returns_jpeg_with_same_dimensions() {
        let outcome = Compressor::new()
            .apply(
                gradient(64, 48),
                &CompressParams {
                    quality: 50,
                    estimate_only: false,
                },
            )
            .unwrap();

        match outcome {
            OperationOutcome::Binary { bytes, mime, filename } => {
                assert_eq!(mime, "image/jpeg");
                assert_eq!(filename, "compressed.jpg");
                assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
                let decoded = image::load_from_memory(&bytes).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (64, 48));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn quality_changes_output_size() {
        let compressor = Compressor::new();
        let image = gradient(128, 128);
        let low = compressor.encode_jpeg(&image, 5).unwrap();
        let high = compressor.encode_jpeg(&image, 95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn optimized_tables_never_grow_the_file() {
        let rgb = gradient(96, 64).to_rgb8();
        for quality in [10, 50, 85, 100] {
            let baseline = encode_rgb(&rgb, quality, false).unwrap();
            let optimized = Compressor::new()
                .encode_jpeg(&DynamicImage::ImageRgb8(rgb.clone()), quality)
                .unwrap();
            assert!(
                optimized.len() <= baseline.len(),
                "quality {}: optimized {} > baseline {}",
                quality,
                optimized.len(),
                baseline.len()
            );
        }
    }

    #[test]
    fn alpha_is_flattened() {
        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 128])));
        let jpeg = Compressor::new().encode_jpeg(&image, 80).unwrap();
        assert!(image::load_from_memory(&jpeg).is_ok());
    }

    #[test]
    fn estimate_returns_json() {
        let outcome = Compressor::new()
            .apply(
                gradient(32, 32),
                &CompressParams {
                    quality: 10,
                    estimate_only: true,
                },
            )
            .unwrap();

        match outcome {
            OperationOutcome::Json { payload, status } => {
                assert_eq!(status, axum::http::StatusCode::OK);
                let estimate: EstimateResult = serde_json::from_value(payload).unwrap();
                assert!(estimate.original_size > 0);
                assert!(estimate.compressed_size > 0);
                assert_eq!(
                    estimate.compression_ratio,
                    round2(estimate.original_size as f64 / estimate.compressed_size as f64)
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
