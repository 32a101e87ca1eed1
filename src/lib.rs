//! # icon-flatten
//!
//! Pixel operations for flattening layered icons into platform raster layers.
//!
//! A renderer exports two flattened images of a layered icon: the full icon and
//! the background layer alone. This crate recovers the foreground layer from
//! that pair and prepares it for a fixed-size adaptive canvas:
//!
//! - **Foreground Extraction**: Recovers per-pixel color and alpha by
//!   differencing the full and background renders
//! - **Compositing**: Source-over compositing to verify that an extracted layer
//!   reproduces the full render
//! - **Alpha Premultiplication**: Conversion between straight and premultiplied
//!   alpha for edge-correct resampling
//! - **Safe-Area Fitting**: Uniform scaling and centering inside a square,
//!   transparent canvas
//!
//! ## Example Usage
//!
//! ```no_run
//! use icon_flatten::{CompositeOverExt, ForegroundExtractionExt, Image, SafeAreaFitExt};
//! use image::Rgba;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let full: Image<Rgba<u8>> = Image::new(432, 432);
//! let background: Image<Rgba<u8>> = Image::new(432, 432);
//!
//! // Recover the foreground layer
//! let foreground = full.extract_foreground(&background)?;
//!
//! // It recomposes the full render over the background
//! let recomposed = foreground.composite_over(&background)?;
//!
//! // Letterbox into a 108x108 canvas with a 72px safe area
//! let adaptive = foreground.fit_to_safe_area(108, 72)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `rayon`: Processes extraction rows in parallel

mod error;
mod icon_flatten;
mod utils;

#[cfg(test)]
mod test_utils;

pub use error::{CompositeError, ExtractionError, SafeAreaError};
pub use icon_flatten::alpha_premultiply::PremultiplyAlphaExt;
pub use icon_flatten::composite::{
    composite_over, composite_pixel, max_channel_difference, CompositeOverExt,
};
pub use icon_flatten::extract_foreground::{
    extract_foreground, extract_foreground_pixel, extract_foreground_with_params,
    extract_foreground_with_report, ExtractionParams, ExtractionReport, ForegroundExtractionExt,
    PixelClass, ALPHA_STEP, IDENTITY_THRESHOLD, MIN_ALPHA, MIN_ALPHA_STEP, NOISE_ERROR_THRESHOLD,
    NOISE_SIGNAL_THRESHOLD, PERFECT_ERROR,
};
pub use icon_flatten::safe_area::{
    calculate_placement, fit_to_safe_area, fit_to_safe_area_with_placement, Placement,
    SafeAreaFitExt, SafeAreaParams,
};

// Re-export imageproc::definitions::Image for convenience
pub use imageproc::definitions::Image;
