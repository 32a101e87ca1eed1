//! Internal utility functions for icon-flatten.
//!
//! This module contains common functionality used across the pixel operations.

use imageproc::definitions::Clamp;

/// Largest value of an 8-bit channel as a float.
pub const CHANNEL_MAX: f32 = 255.0;

/// Rounds a floating-point channel value to the nearest `u8`, saturating
/// at the ends of the range.
///
/// Halfway cases round away from zero.
#[inline]
pub fn round_to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Rounds an `f32` channel value to the nearest `u8` using imageproc's
/// saturating conversion.
#[inline]
pub fn round_f32_to_u8(value: f32) -> u8 {
    <u8 as Clamp<f32>>::clamp(value.round())
}

/// Normalizes an 8-bit alpha value to the range [0, 1].
#[inline]
pub fn normalize_alpha(alpha: u8) -> f32 {
    f32::from(alpha) / CHANNEL_MAX
}

/// Largest absolute per-channel difference between two equally sized
/// channel slices.
#[inline]
pub fn max_abs_difference(first: &[u8], second: &[u8]) -> u8 {
    first
        .iter()
        .zip(second)
        .map(|(&a, &b)| a.abs_diff(b))
        .max()
        .unwrap_or(0)
}

/// Validates that two images have matching dimensions.
///
/// # Arguments
///
/// * `first` - Dimensions (width, height) of the first image
/// * `second` - Dimensions (width, height) of the second image
/// * `on_mismatch` - Builds the caller's error from both dimension pairs
///
/// # Returns
///
/// `Ok(())` if the dimensions match, otherwise the error built by `on_mismatch`
pub fn validate_matching_dimensions<E>(
    first: (u32, u32),
    second: (u32, u32),
    on_mismatch: impl FnOnce((u32, u32), (u32, u32)) -> E,
) -> Result<(), E> {
    if first == second {
        Ok(())
    } else {
        Err(on_mismatch(first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_u8() {
        assert_eq!(round_to_u8(-10.0), 0);
        assert_eq!(round_to_u8(0.49), 0);
        assert_eq!(round_to_u8(127.5), 128);
        assert_eq!(round_to_u8(254.6), 255);
        assert_eq!(round_to_u8(300.0), 255);
    }

    #[test]
    fn test_round_f32_to_u8() {
        assert_eq!(round_f32_to_u8(-3.2), 0);
        assert_eq!(round_f32_to_u8(99.5), 100);
        assert_eq!(round_f32_to_u8(1000.0), 255);
    }

    #[test]
    fn test_normalize_alpha() {
        assert_eq!(normalize_alpha(0), 0.0);
        assert_eq!(normalize_alpha(127), 127.0 / 255.0);
        assert_eq!(normalize_alpha(255), 1.0);
    }

    #[test]
    fn test_max_abs_difference() {
        assert_eq!(max_abs_difference(&[10, 20, 30, 255], &[10, 20, 30, 255]), 0);
        assert_eq!(max_abs_difference(&[0, 200, 30, 255], &[5, 20, 30, 250]), 180);
        assert_eq!(max_abs_difference(&[], &[]), 0);
    }

    #[test]
    fn test_validate_matching_dimensions() {
        let mismatch = |a, b| (a, b);
        assert!(validate_matching_dimensions((100, 100), (100, 100), mismatch).is_ok());
        assert!(validate_matching_dimensions((50, 75), (50, 75), mismatch).is_ok());
        assert_eq!(
            validate_matching_dimensions((100, 100), (100, 50), mismatch),
            Err(((100, 100), (100, 50)))
        );
        assert!(validate_matching_dimensions((100, 100), (50, 100), mismatch).is_err());
    }
}
