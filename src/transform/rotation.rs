//! Counter-clockwise rotation with an expanded canvas.
//!
//! Quarter turns are exact pixel permutations. Other angles use inverse
//! mapping: every output pixel is traced back to its nearest source pixel,
//! and pixels falling outside the source are transparent black.
//!
//! ```text
//! src_x = (dst_x - dst_cx) * cos(θ) - (dst_y - dst_cy) * sin(θ) + src_cx
//! src_y = (dst_x - dst_cx) * sin(θ) + (dst_y - dst_cy) * cos(θ) + src_cy
//! ```
//!
//! With the y axis pointing down, this turns the picture counter-clockwise
//! on screen for positive θ.

use image::imageops;
use image::{Rgba, RgbaImage};

const EPSILON: f64 = 1e-9;

/// Bounding box of a `width × height` rectangle rotated by `angle_degrees`.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    match quarter_turns(angle_degrees) {
        Some(0) | Some(2) => return (width, height),
        Some(_) => return (height, width),
        None => {}
    }

    let radians = angle_degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let (w, h) = (width as f64, height as f64);

    let new_w = (w * cos + h * sin).round() as u32;
    let new_h = (w * sin + h * cos).round() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Number of counter-clockwise quarter turns, if the angle is a multiple of 90.
fn quarter_turns(angle_degrees: f64) -> Option<u32> {
    // Reduced first so huge angles cannot saturate the integer cast.
    let turns = angle_degrees.rem_euclid(360.0) / 90.0;
    if (turns - turns.round()).abs() > EPSILON {
        return None;
    }
    Some((turns.round() as i64).rem_euclid(4) as u32)
}

/// Rotate counter-clockwise by `angle_degrees`, growing the canvas to fit.
pub fn rotate_expand(image: &RgbaImage, angle_degrees: f64) -> RgbaImage {
    match quarter_turns(angle_degrees) {
        Some(0) => return image.clone(),
        Some(1) => return imageops::rotate270(image),
        Some(2) => return imageops::rotate180(image),
        Some(3) => return imageops::rotate90(image),
        _ => {}
    }

    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = compute_rotated_bounds(src_w, src_h, angle_degrees);

    let radians = angle_degrees.rem_euclid(360.0).to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_cx = src_w as f64 / 2.0;
    let src_cy = src_h as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    RgbaImage::from_fn(dst_w, dst_h, |x, y| {
        // Sample at pixel centers.
        let dx = x as f64 + 0.5 - dst_cx;
        let dy = y as f64 + 0.5 - dst_cy;

        let sx = (dx * cos - dy * sin + src_cx).floor();
        let sy = (dx * sin + dy * cos + src_cy).floor();

        if sx >= 0.0 && sy >= 0.0 && sx < src_w as f64 && sy < src_h as f64 {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3×2 image with a distinct value per pixel.
    fn numbered() -> RgbaImage {
        RgbaImage::from_fn(3, 2, |x, y| Rgba([(y * 3 + x) as u8, 0, 0, 255]))
    }

    fn reds(image: &RgbaImage) -> Vec<Vec<u8>> {
        (0..image.height())
            .map(|y| (0..image.width()).map(|x| image.get_pixel(x, y)[0]).collect())
            .collect()
    }

    #[test]
    fn bounds_for_quarter_turns() {
        assert_eq!(compute_rotated_bounds(100, 50, 0.0), (100, 50));
        assert_eq!(compute_rotated_bounds(100, 50, 90.0), (50, 100));
        assert_eq!(compute_rotated_bounds(100, 50, -90.0), (50, 100));
        assert_eq!(compute_rotated_bounds(100, 50, 180.0), (100, 50));
        assert_eq!(compute_rotated_bounds(100, 50, 450.0), (50, 100));
    }

    #[test]
    fn huge_angles_reduce_before_classifying() {
        // 90 · 2^70 is a whole number of full turns.
        let full_turns = 90.0 * 2f64.powi(70);
        assert_eq!(quarter_turns(full_turns), Some(0));
        assert_eq!(quarter_turns(-full_turns), Some(0));
        assert_eq!(rotate_expand(&numbered(), full_turns), numbered());

        let rotated = rotate_expand(&numbered(), 1e300);
        assert!(rotated.width() <= 4 && rotated.height() <= 4);
    }

    #[test]
    fn bounds_for_diagonal() {
        let (w, h) = compute_rotated_bounds(100, 100, 45.0);
        assert_eq!((w, h), (141, 141));
    }

    #[test]
    fn ninety_is_counter_clockwise() {
        // 0 1 2        2 5
        // 3 4 5   →    1 4
        //              0 3
        let rotated = rotate_expand(&numbered(), 90.0);
        assert_eq!(reds(&rotated), vec![vec![2, 5], vec![1, 4], vec![0, 3]]);
    }

    #[test]
    fn negative_ninety_is_clockwise() {
        let rotated = rotate_expand(&numbered(), -90.0);
        assert_eq!(reds(&rotated), vec![vec![3, 0], vec![4, 1], vec![5, 2]]);
    }

    #[test]
    fn half_turn() {
        let rotated = rotate_expand(&numbered(), 180.0);
        assert_eq!(reds(&rotated), vec![vec![5, 4, 3], vec![2, 1, 0]]);
    }

    #[test]
    fn full_turn_is_identity() {
        assert_eq!(rotate_expand(&numbered(), 360.0), numbered());
    }

    #[test]
    fn arbitrary_angle_expands_with_transparent_corners() {
        let image = RgbaImage::from_pixel(20, 10, Rgba([200, 100, 50, 255]));
        let rotated = rotate_expand(&image, 30.0);

        assert_eq!(rotated.dimensions(), compute_rotated_bounds(20, 10, 30.0));
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 0, 0, 0]);

        let (w, h) = rotated.dimensions();
        assert_eq!(rotated.get_pixel(w / 2, h / 2).0, [200, 100, 50, 255]);
    }
}
