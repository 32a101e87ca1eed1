//! Test utilities for icon-flatten
//!
//! This module provides common fixtures for testing pixel operations.
//! It is only compiled when running tests.

use image::{Pixel, Rgba};
use imageproc::definitions::Image;

/// Creates a test RGBA image with predefined pixel values for testing.
///
/// - (0,0): [200, 150, 100, 255] (opaque)
/// - (1,0): [100, 200, 150, 128] (semi-transparent)
/// - (0,1): [150, 100, 200, 64]  (more transparent)
/// - (1,1): [50, 75, 25, 0]      (fully transparent)
pub fn create_test_rgba_image() -> Image<Rgba<u8>> {
    let mut image: Image<Rgba<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgba([200, 150, 100, 255]));
    image.put_pixel(1, 0, Rgba([100, 200, 150, 128]));
    image.put_pixel(0, 1, Rgba([150, 100, 200, 64]));
    image.put_pixel(1, 1, Rgba([50, 75, 25, 0]));
    image
}

/// Creates an image filled with a single pixel value.
pub fn solid_rgba_image(width: u32, height: u32, pixel: Rgba<u8>) -> Image<Rgba<u8>> {
    Image::from_pixel(width, height, pixel)
}

/// Composites a known foreground over an opaque background the way a
/// renderer would, rounding each channel to the nearest integer.
pub fn composite_opaque(foreground: [u8; 3], alpha: f64, background: [u8; 3]) -> [u8; 3] {
    [0, 1, 2].map(|channel| {
        let value = alpha * f64::from(foreground[channel])
            + (1.0 - alpha) * f64::from(background[channel]);
        value.round() as u8
    })
}

/// Compares two pixels channel by channel with a tolerance.
pub fn pixels_approx_equal<P>(expected: P, actual: P, tolerance: u8) -> bool
where
    P: Pixel<Subpixel = u8>,
{
    expected
        .channels()
        .iter()
        .zip(actual.channels())
        .all(|(e, a)| e.abs_diff(*a) <= tolerance)
}

/// Compares two images pixel by pixel with a tolerance.
pub fn images_approx_equal<P>(expected: &Image<P>, actual: &Image<P>, tolerance: u8) -> bool
where
    P: Pixel<Subpixel = u8>,
{
    expected.dimensions() == actual.dimensions()
        && expected
            .pixels()
            .zip(actual.pixels())
            .all(|(e, a)| pixels_approx_equal(*e, *a, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_opaque_matches_hand_computed_values() {
        assert_eq!(composite_opaque([200, 50, 100], 0.6, [255, 255, 255]), [222, 132, 162]);
        assert_eq!(composite_opaque([255, 0, 0], 0.6, [0, 0, 255]), [153, 0, 102]);
    }

    #[test]
    fn pixels_approx_equal_with_tolerant_comparison_returns_true() {
        let pixel1 = Rgba([100u8, 150, 200, 255]);
        let pixel2 = Rgba([101u8, 149, 201, 255]);
        let pixel3 = Rgba([105u8, 145, 205, 255]);

        assert!(pixels_approx_equal(pixel1, pixel2, 1));
        assert!(!pixels_approx_equal(pixel1, pixel3, 1));
    }

    #[test]
    fn images_approx_equal_with_tolerant_comparison_returns_true() {
        let image1 = create_test_rgba_image();
        let mut image2 = create_test_rgba_image();
        image2.put_pixel(0, 0, Rgba([201, 150, 100, 255]));

        assert!(images_approx_equal(&image1, &image2, 1));
        assert!(!images_approx_equal(&image1, &image2, 0));
        assert!(!images_approx_equal(&image1, &solid_rgba_image(3, 2, Rgba([0; 4])), 255));
    }
}
