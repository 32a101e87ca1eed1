use image::Rgba;
use imageproc::definitions::Image;

/// Trait for converting RGBA images between straight and premultiplied alpha.
///
/// Resampling straight-alpha pixels lets the color of fully transparent
/// neighbours bleed into edges. Premultiplying before a resize and
/// unpremultiplying afterwards keeps transparent regions from tinting the
/// visible content.
///
/// # Alpha Premultiplication
///
/// - Red' = Red × Alpha
/// - Green' = Green × Alpha
/// - Blue' = Blue × Alpha
///
/// The alpha channel is kept unchanged in both directions.
pub trait PremultiplyAlphaExt {
    /// Premultiplies color channels by alpha, consuming the image.
    ///
    /// # Examples
    /// ```no_run
    /// use icon_flatten::{Image, PremultiplyAlphaExt};
    /// use image::Rgba;
    ///
    /// let rgba_image: Image<Rgba<u8>> = Image::new(100, 100);
    /// let premultiplied = rgba_image.premultiply_alpha();
    /// ```
    fn premultiply_alpha(self) -> Self;

    /// Premultiplies color channels by alpha in-place.
    fn premultiply_alpha_mut(&mut self) -> &mut Self;

    /// Divides premultiplied color channels by alpha, consuming the image.
    ///
    /// Pixels with zero alpha become `(0, 0, 0, 0)`.
    fn unpremultiply_alpha(self) -> Self;

    /// Divides premultiplied color channels by alpha in-place.
    fn unpremultiply_alpha_mut(&mut self) -> &mut Self;
}

impl PremultiplyAlphaExt for Image<Rgba<u8>> {
    fn premultiply_alpha(mut self) -> Self {
        self.premultiply_alpha_mut();
        self
    }

    fn premultiply_alpha_mut(&mut self) -> &mut Self {
        self.pixels_mut()
            .for_each(|pixel| *pixel = premultiply_pixel(*pixel));
        self
    }

    fn unpremultiply_alpha(mut self) -> Self {
        self.unpremultiply_alpha_mut();
        self
    }

    fn unpremultiply_alpha_mut(&mut self) -> &mut Self {
        self.pixels_mut()
            .for_each(|pixel| *pixel = unpremultiply_pixel(*pixel));
        self
    }
}

/// Compile-time Look-Up Table generator for u8 alpha premultiplication
const fn generate_alpha_lut() -> [[u8; 256]; 256] {
    let mut lut = [[0u8; 256]; 256];
    let mut alpha = 0;
    while alpha < 256 {
        let mut color = 0;
        while color < 256 {
            // (color * alpha) / 255 with proper rounding
            lut[alpha][color] = ((color * alpha + 127) / 255) as u8;
            color += 1;
        }
        alpha += 1;
    }
    lut
}

static ALPHA_LUT: [[u8; 256]; 256] = generate_alpha_lut();

#[inline]
const fn premultiply_u8(color: u8, alpha: u8) -> u8 {
    ALPHA_LUT[alpha as usize][color as usize]
}

#[inline]
const fn unpremultiply_u8(color: u8, alpha: u8) -> u8 {
    let alpha = alpha as u32;
    let value = (color as u32 * 255 + alpha / 2) / alpha;
    if value > 255 {
        255
    } else {
        value as u8
    }
}

#[inline]
const fn premultiply_pixel(pixel: Rgba<u8>) -> Rgba<u8> {
    let [red, green, blue, alpha] = pixel.0;
    Rgba([
        premultiply_u8(red, alpha),
        premultiply_u8(green, alpha),
        premultiply_u8(blue, alpha),
        alpha,
    ])
}

#[inline]
const fn unpremultiply_pixel(pixel: Rgba<u8>) -> Rgba<u8> {
    let [red, green, blue, alpha] = pixel.0;
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        unpremultiply_u8(red, alpha),
        unpremultiply_u8(green, alpha),
        unpremultiply_u8(blue, alpha),
        alpha,
    ])
}
