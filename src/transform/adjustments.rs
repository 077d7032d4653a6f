//! Per-pixel color adjustments.
//!
//! Brightness, contrast and saturation blend each channel between a
//! degenerate image and the source:
//!
//! ```text
//! out = degenerate + factor * (source - degenerate)
//! ```
//!
//! | Adjustment | Degenerate image                  |
//! |------------|-----------------------------------|
//! | brightness | black                             |
//! | contrast   | solid gray at the mean luminance  |
//! | saturation | per-pixel grayscale               |
//!
//! Alpha is never touched. Results are rounded and clamped to `0..=255`.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// ITU-R 601-2 luma in 16.16 fixed point.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

#[inline]
fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn blend(degenerate: f64, source: u8, factor: f64) -> u8 {
    clamp_channel(degenerate + factor * (source as f64 - degenerate))
}

/// Scale every color channel by `factor`.
pub fn brightness(image: &mut RgbaImage, factor: f64) {
    for Rgba([r, g, b, _]) in image.pixels_mut() {
        *r = blend(0.0, *r, factor);
        *g = blend(0.0, *g, factor);
        *b = blend(0.0, *b, factor);
    }
}

/// Rounded mean luminance over the whole image.
pub fn mean_luma(image: &RgbaImage) -> u8 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0;
    }

    let total: u64 = image
        .pixels()
        .map(|Rgba([r, g, b, _])| luma(*r, *g, *b) as u64)
        .sum();

    ((total as f64 / count as f64) + 0.5) as u8
}

/// Push channels away from (or toward) the mean luminance.
pub fn contrast(image: &mut RgbaImage, factor: f64) {
    let mean = mean_luma(image) as f64;
    for Rgba([r, g, b, _]) in image.pixels_mut() {
        *r = blend(mean, *r, factor);
        *g = blend(mean, *g, factor);
        *b = blend(mean, *b, factor);
    }
}

/// Blend each pixel with its own grayscale value.
pub fn saturation(image: &mut RgbaImage, factor: f64) {
    for Rgba([r, g, b, _]) in image.pixels_mut() {
        let gray = luma(*r, *g, *b) as f64;
        *r = blend(gray, *r, factor);
        *g = blend(gray, *g, factor);
        *b = blend(gray, *b, factor);
    }
}

/// Sepia color-mixing matrix for intensity `s`. Rows are output R, G, B.
pub fn sepia_matrix(s: f64) -> [[f64; 3]; 3] {
    let k = 1.0 - s;
    [
        [0.393 + 0.607 * k, 0.769 * k, 0.189 * k],
        [0.349 * k, 0.686 + 0.314 * k, 0.168 * k],
        [0.272 * k, 0.534 * k, 0.131 + 0.869 * k],
    ]
}

/// Apply the sepia matrix, producing a three-channel image.
pub fn sepia(image: &RgbaImage, intensity: f64) -> RgbImage {
    let m = sepia_matrix(intensity);

    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
        let (r, g, b) = (r as f64, g as f64, b as f64);
        Rgb([
            clamp_channel(m[0][0] * r + m[0][1] * g + m[0][2] * b),
            clamp_channel(m[1][0] * r + m[1][1] * g + m[1][2] * b),
            clamp_channel(m[2][0] * r + m[2][1] * g + m[2][2] * b),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    #[test]
    fn luma_extremes() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let mut image = single([100, 200, 10, 77]);
        brightness(&mut image, 1.5);
        assert_eq!(image.get_pixel(0, 0).0, [150, 255, 15, 77]);

        let mut image = single([100, 200, 10, 77]);
        brightness(&mut image, 0.0);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 77]);
    }

    #[test]
    fn unit_factor_is_identity() {
        let original =
            RgbaImage::from_fn(5, 4, |x, y| Rgba([(x * 40) as u8, (y * 60) as u8, 90, 255]));

        for adjust in [brightness, contrast, saturation] {
            let mut image = original.clone();
            adjust(&mut image, 1.0);
            assert_eq!(image, original);
        }
    }

    #[test]
    fn zero_contrast_is_flat_mean() {
        let mut image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        contrast(&mut image, 0.0);
        assert_eq!(image.get_pixel(0, 0).0, [128, 128, 128, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn zero_saturation_is_grayscale() {
        let mut image = single([255, 0, 0, 255]);
        saturation(&mut image, 0.0);
        assert_eq!(image.get_pixel(0, 0).0, [76, 76, 76, 255]);
    }

    #[test]
    fn full_sepia_coefficients() {
        let m = sepia_matrix(1.0);
        assert_eq!(m, [[0.393, 0.0, 0.0], [0.0, 0.686, 0.0], [0.0, 0.0, 0.131]]);

        let toned = sepia(&single([200, 100, 50, 255]), 1.0);
        // 0.393*200 = 78.6, 0.686*100 = 68.6, 0.131*50 = 6.55
        assert_eq!(toned.get_pixel(0, 0).0, [79, 69, 7]);
    }

    #[test]
    fn partial_sepia_mixes_channels() {
        let toned = sepia(&single([100, 100, 100, 255]), 0.5);
        // Row sums at s=0.5: 1.1755, 1.1015, 0.9685
        assert_eq!(toned.get_pixel(0, 0).0, [118, 110, 97]);
    }

    #[test]
    fn sepia_drops_alpha() {
        let toned = sepia(&RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 0])), 1.0);
        assert_eq!(toned.dimensions(), (3, 2));
    }
}
