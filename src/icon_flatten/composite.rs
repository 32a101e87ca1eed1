use image::Rgba;
use imageproc::{definitions::Image, map::map_colors2};

use crate::{
    error::CompositeError,
    utils::{
        max_abs_difference, normalize_alpha, round_f32_to_u8, validate_matching_dimensions,
        CHANNEL_MAX,
    },
};

/// Trait for compositing a straight-alpha foreground over a background
///
/// This is the forward direction of foreground extraction and is used to
/// check that an extracted layer recomposes the original render.
pub trait CompositeOverExt {
    /// Composites `self` over `background` (Porter-Duff source-over).
    ///
    /// # Errors
    ///
    /// * `CompositeError::DimensionMismatch` - When the images differ in size
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use icon_flatten::{CompositeOverExt, Image};
    /// use image::Rgba;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let foreground: Image<Rgba<u8>> = Image::new(10, 10);
    /// let background: Image<Rgba<u8>> = Image::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    ///
    /// let flattened = foreground.composite_over(&background)?;
    /// # Ok(())
    /// # }
    /// ```
    fn composite_over(&self, background: &Self) -> Result<Self, CompositeError>
    where
        Self: Sized;
}

impl CompositeOverExt for Image<Rgba<u8>> {
    fn composite_over(&self, background: &Self) -> Result<Self, CompositeError> {
        composite_over(self, background)
    }
}

/// Composites a straight-alpha foreground image over a background image
pub fn composite_over(
    foreground: &Image<Rgba<u8>>,
    background: &Image<Rgba<u8>>,
) -> Result<Image<Rgba<u8>>, CompositeError> {
    validate_dimensions(foreground, background)?;
    Ok(map_colors2(foreground, background, composite_pixel))
}

/// Composites a single straight-alpha pixel over another
///
/// Over an opaque background this reduces to
/// `C = α * C_fg + (1 - α) * C_bg` per RGB channel.
pub fn composite_pixel(foreground: Rgba<u8>, background: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = normalize_alpha(foreground[3]);
    let bg_weight = normalize_alpha(background[3]) * (1.0 - fg_alpha);
    let out_alpha = fg_alpha + bg_weight;

    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |channel: usize| {
        let value = f32::from(foreground[channel])
            .mul_add(fg_alpha, f32::from(background[channel]) * bg_weight);
        round_f32_to_u8(value / out_alpha)
    };

    Rgba([
        blend(0),
        blend(1),
        blend(2),
        round_f32_to_u8(out_alpha * CHANNEL_MAX),
    ])
}

/// Largest absolute RGB difference between two equally sized images
///
/// The alpha channel is ignored; this measures how far a recomposed image
/// drifts from the render it should reproduce.
///
/// # Errors
///
/// * `CompositeError::DimensionMismatch` - When the images differ in size
pub fn max_channel_difference(
    first: &Image<Rgba<u8>>,
    second: &Image<Rgba<u8>>,
) -> Result<u8, CompositeError> {
    validate_dimensions(first, second)?;

    Ok(first
        .pixels()
        .zip(second.pixels())
        .map(|(a, b)| max_abs_difference(&a.0[..3], &b.0[..3]))
        .max()
        .unwrap_or(0))
}

fn validate_dimensions(
    foreground: &Image<Rgba<u8>>,
    background: &Image<Rgba<u8>>,
) -> Result<(), CompositeError> {
    validate_matching_dimensions(
        foreground.dimensions(),
        background.dimensions(),
        |foreground, background| CompositeError::DimensionMismatch {
            foreground,
            background,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::solid_rgba_image;

    #[test]
    fn transparent_foreground_keeps_background() {
        let background = Rgba([10, 20, 30, 255]);
        assert_eq!(composite_pixel(Rgba([0, 0, 0, 0]), background), background);
    }

    #[test]
    fn opaque_foreground_replaces_background() {
        let foreground = Rgba([200, 100, 50, 255]);
        assert_eq!(composite_pixel(foreground, Rgba([1, 2, 3, 255])), foreground);
    }

    #[test]
    fn half_alpha_blends_over_opaque_background() {
        let result = composite_pixel(Rgba([0, 0, 0, 128]), Rgba([255, 255, 255, 255]));
        // 255 * (1 - 128/255) = 127
        assert_eq!(result, Rgba([127, 127, 127, 255]));
    }

    #[test]
    fn both_transparent_yields_zeroed_pixel() {
        assert_eq!(
            composite_pixel(Rgba([9, 9, 9, 0]), Rgba([200, 200, 200, 0])),
            Rgba([0, 0, 0, 0])
        );
    }

    #[test]
    fn composite_over_transparent_background_keeps_foreground() {
        let result = composite_pixel(Rgba([40, 80, 120, 100]), Rgba([0, 0, 0, 0]));
        assert_eq!(result, Rgba([40, 80, 120, 100]));
    }

    #[test]
    fn composite_over_rejects_mismatched_sizes() {
        let foreground = solid_rgba_image(2, 2, Rgba([0, 0, 0, 0]));
        let background = solid_rgba_image(2, 3, Rgba([0, 0, 0, 255]));
        assert_eq!(
            composite_over(&foreground, &background),
            Err(CompositeError::DimensionMismatch {
                foreground: (2, 2),
                background: (2, 3),
            })
        );
    }

    #[test]
    fn max_channel_difference_ignores_alpha() {
        let first = solid_rgba_image(2, 1, Rgba([10, 10, 10, 0]));
        let mut second = solid_rgba_image(2, 1, Rgba([10, 10, 10, 255]));
        assert_eq!(max_channel_difference(&first, &second), Ok(0));

        second.put_pixel(1, 0, Rgba([10, 17, 10, 255]));
        assert_eq!(max_channel_difference(&first, &second), Ok(7));
    }
}
