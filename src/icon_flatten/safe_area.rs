use image::{
    imageops::{self, FilterType},
    Rgba,
};
use imageproc::definitions::Image;
use tracing::debug;

use crate::error::SafeAreaError;
use crate::icon_flatten::alpha_premultiply::PremultiplyAlphaExt;

/// Canvas geometry for safe-area fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeAreaParams {
    /// Side of the square output canvas
    pub canvas_size: u32,
    /// Side of the centered square the image must fit inside
    pub safe_area_size: u32,
    /// Resampling filter used when the image has to be scaled
    pub filter: FilterType,
}

impl SafeAreaParams {
    /// Creates canvas geometry with the default Lanczos3 filter.
    ///
    /// # Errors
    ///
    /// * `SafeAreaError::InvalidCanvas` - When either size is zero or the
    ///   safe area is larger than the canvas
    pub const fn new(canvas_size: u32, safe_area_size: u32) -> Result<Self, SafeAreaError> {
        let params = Self {
            canvas_size,
            safe_area_size,
            filter: FilterType::Lanczos3,
        };
        match params.validate() {
            Ok(()) => Ok(params),
            Err(error) => Err(error),
        }
    }

    /// Replaces the resampling filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    const fn validate(&self) -> Result<(), SafeAreaError> {
        if self.canvas_size == 0
            || self.safe_area_size == 0
            || self.safe_area_size > self.canvas_size
        {
            return Err(SafeAreaError::InvalidCanvas {
                canvas_size: self.canvas_size,
                safe_area_size: self.safe_area_size,
            });
        }
        Ok(())
    }
}

/// Where a fitted image landed on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left offset of the scaled image
    pub x: u32,
    /// Top offset of the scaled image
    pub y: u32,
    /// Width of the scaled image
    pub width: u32,
    /// Height of the scaled image
    pub height: u32,
}

/// Trait for letterboxing an image into a square canvas with transparent padding
pub trait SafeAreaFitExt {
    /// Scales the image uniformly to fit `safe_area_size` and centers it on a
    /// fully transparent `canvas_size × canvas_size` canvas.
    ///
    /// # Errors
    ///
    /// * `SafeAreaError::EmptyImage` - When the image has a zero dimension
    /// * `SafeAreaError::InvalidCanvas` - When the sizes are unusable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use icon_flatten::{Image, SafeAreaFitExt};
    /// use image::Rgba;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let foreground: Image<Rgba<u8>> = Image::new(432, 432);
    /// let adaptive = foreground.fit_to_safe_area(108, 72)?;
    /// assert_eq!(adaptive.dimensions(), (108, 108));
    /// # Ok(())
    /// # }
    /// ```
    fn fit_to_safe_area(
        &self,
        canvas_size: u32,
        safe_area_size: u32,
    ) -> Result<Self, SafeAreaError>
    where
        Self: Sized;
}

impl SafeAreaFitExt for Image<Rgba<u8>> {
    fn fit_to_safe_area(
        &self,
        canvas_size: u32,
        safe_area_size: u32,
    ) -> Result<Self, SafeAreaError> {
        fit_to_safe_area(self, canvas_size, safe_area_size)
    }
}

/// Fits an image into the safe area of a square transparent canvas
pub fn fit_to_safe_area(
    image: &Image<Rgba<u8>>,
    canvas_size: u32,
    safe_area_size: u32,
) -> Result<Image<Rgba<u8>>, SafeAreaError> {
    let params = SafeAreaParams::new(canvas_size, safe_area_size)?;
    fit_to_safe_area_with_placement(image, &params).map(|(canvas, _)| canvas)
}

/// Fits an image into the safe area and reports where it was placed
///
/// Scaling happens on premultiplied alpha so transparent pixels do not
/// darken or tint the edges of the scaled content.
pub fn fit_to_safe_area_with_placement(
    image: &Image<Rgba<u8>>,
    params: &SafeAreaParams,
) -> Result<(Image<Rgba<u8>>, Placement), SafeAreaError> {
    let placement = calculate_placement(image.dimensions(), params)?;

    let scaled = if (placement.width, placement.height) == image.dimensions() {
        image.clone()
    } else {
        let premultiplied = image.clone().premultiply_alpha();
        imageops::resize(
            &premultiplied,
            placement.width,
            placement.height,
            params.filter,
        )
        .unpremultiply_alpha()
    };

    let mut canvas = Image::from_pixel(
        params.canvas_size,
        params.canvas_size,
        Rgba([0, 0, 0, 0]),
    );
    imageops::replace(
        &mut canvas,
        &scaled,
        i64::from(placement.x),
        i64::from(placement.y),
    );

    debug!(
        source_width = image.width(),
        source_height = image.height(),
        width = placement.width,
        height = placement.height,
        x = placement.x,
        y = placement.y,
        "fitted image to safe area"
    );

    Ok((canvas, placement))
}

/// Computes the scaled size and centered offset of an image on the canvas
///
/// # Arguments
///
/// * `size` - Source image size (width, height)
/// * `params` - Canvas geometry
///
/// # Errors
///
/// * `SafeAreaError::EmptyImage` - When the image has a zero dimension
/// * `SafeAreaError::InvalidCanvas` - When the sizes are unusable
pub fn calculate_placement(
    size: (u32, u32),
    params: &SafeAreaParams,
) -> Result<Placement, SafeAreaError> {
    let (width, height) = size;
    if width == 0 || height == 0 {
        return Err(SafeAreaError::EmptyImage { width, height });
    }
    params.validate()?;

    let safe = f64::from(params.safe_area_size);
    let scale = (safe / f64::from(width)).min(safe / f64::from(height));

    let scaled_width = scale_dimension(width, scale, params.safe_area_size);
    let scaled_height = scale_dimension(height, scale, params.safe_area_size);

    Ok(Placement {
        x: center_offset(params.canvas_size, scaled_width),
        y: center_offset(params.canvas_size, scaled_height),
        width: scaled_width,
        height: scaled_height,
    })
}

fn scale_dimension(dimension: u32, scale: f64, limit: u32) -> u32 {
    let scaled = (f64::from(dimension) * scale).round() as u32;
    scaled.clamp(1, limit)
}

fn center_offset(canvas: u32, size: u32) -> u32 {
    (f64::from(canvas - size) / 2.0).round() as u32
}
