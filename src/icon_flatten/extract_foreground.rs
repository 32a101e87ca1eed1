//! Foreground recovery by differencing two flattened renders
//!
//! A layered icon is rendered twice: once with every layer (`full`) and once
//! with the background layer only (`background`). This module reconstructs the
//! foreground layer, color *and* alpha, from those two opaque-or-alpha raster
//! buffers.
//!
//! ## Compositing Equation
//!
//! Every output pixel is chosen so that the straight-alpha compositing model
//! holds per RGB channel:
//!
//! ```text
//! C_full = α * C_fg + (1 - α) * C_bg
//! ```
//!
//! The equation is under-determined: infinitely many `(C_fg, α)` pairs explain
//! the same composite. Because `C_fg` must be storable in `[0, 255]`, the
//! largest observable difference for a given `α` is `α * 255`, which gives a
//! lower bound on alpha:
//!
//! ```text
//! α_min = max_c |C_full - C_bg| / 255
//! ```
//!
//! ## Algorithm
//!
//! For each pixel independently:
//!
//! 1. If no channel (alpha included) differs by at least
//!    [`IDENTITY_THRESHOLD`], the pixel is background and becomes `(0, 0, 0, 0)`.
//! 2. Otherwise alpha candidates are scanned from `max(MIN_ALPHA, α_min)` up to
//!    `1.0` in steps of [`ALPHA_STEP`]. Each candidate inverts the equation,
//!    clamps and rounds the color to `u8`, recomposes it and measures the
//!    summed absolute RGB error. The first candidate with the smallest error
//!    wins; the scan stops as soon as the error drops below [`PERFECT_ERROR`].
//! 3. A weak signal (below [`NOISE_SIGNAL_THRESHOLD`]) that still reconstructs
//!    worse than [`NOISE_ERROR_THRESHOLD`] is treated as anti-aliasing noise and
//!    becomes transparent.
//!
//! Clamping makes the forward map non-linear, so the error surface is not
//! guaranteed to be unimodal and the scan is linear rather than a bisection.
//!
//! ## Usage Examples
//!
//! ```no_run
//! use icon_flatten::{ForegroundExtractionExt, Image};
//! use image::Rgba;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let background: Image<Rgba<u8>> = Image::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
//! let mut full = background.clone();
//! full.put_pixel(1, 1, Rgba([153, 0, 102, 255]));
//!
//! let foreground = full.extract_foreground(&background)?;
//! assert_eq!(foreground.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
//! assert_eq!(foreground.get_pixel(1, 1), &Rgba([255, 0, 0, 153]));
//! # Ok(())
//! # }
//! ```

use std::ops::Add;

use image::{ImageBuffer, Pixel, Rgba};
use imageproc::definitions::Image;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::error::ExtractionError;
use crate::utils::{max_abs_difference, round_to_u8, validate_matching_dimensions, CHANNEL_MAX};

/// Largest per-channel difference (exclusive) still classified as pure background.
pub const IDENTITY_THRESHOLD: u8 = 5;

/// Smallest alpha the scan ever tries.
pub const MIN_ALPHA: f64 = 0.01;

/// Distance between consecutive alpha candidates.
pub const ALPHA_STEP: f64 = 0.01;

/// Smallest accepted `alpha_step`; bounds the scan to a million candidates.
pub const MIN_ALPHA_STEP: f64 = 1e-6;

/// Reconstruction error below which a candidate is accepted immediately.
pub const PERFECT_ERROR: f64 = 0.1;

/// Reconstruction error above which a weak signal is rejected as noise.
pub const NOISE_ERROR_THRESHOLD: f64 = 30.0;

/// RGB difference (exclusive) under which a poorly reconstructed pixel is noise.
pub const NOISE_SIGNAL_THRESHOLD: u8 = 15;

/// Tolerance that keeps `1.0` inside the scan despite float rounding.
const ALPHA_EPSILON: f64 = 1e-9;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Tunables of the foreground extractor
///
/// `ExtractionParams::default()` reproduces the reference thresholds exactly.
/// Changing them trades reference parity for different noise tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionParams {
    /// Maximum channel difference (exclusive) treated as identical pixels
    pub identity_threshold: u8,
    /// Lower bound for alpha candidates, in `(0, 1]`
    pub min_alpha: f64,
    /// Step between alpha candidates, in `(0, 1]`
    pub alpha_step: f64,
    /// Error that ends the scan early
    pub perfect_error: f64,
    /// Error above which weak signals are discarded
    pub noise_error_threshold: f64,
    /// Signal strength (exclusive) under which poor fits are discarded
    pub noise_signal_threshold: u8,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            identity_threshold: IDENTITY_THRESHOLD,
            min_alpha: MIN_ALPHA,
            alpha_step: ALPHA_STEP,
            perfect_error: PERFECT_ERROR,
            noise_error_threshold: NOISE_ERROR_THRESHOLD,
            noise_signal_threshold: NOISE_SIGNAL_THRESHOLD,
        }
    }
}

impl ExtractionParams {
    /// Checks that every tunable is finite and within its range.
    ///
    /// # Errors
    ///
    /// * `ExtractionError::InvalidParameter` - naming the offending tunable
    pub fn validate(&self) -> Result<(), ExtractionError> {
        validate_unit_interval("min_alpha", self.min_alpha)?;
        validate_unit_interval("alpha_step", self.alpha_step)?;
        if self.alpha_step < MIN_ALPHA_STEP {
            return Err(ExtractionError::InvalidParameter(format!(
                "alpha_step must be at least {MIN_ALPHA_STEP}, got {}",
                self.alpha_step
            )));
        }
        validate_non_negative("perfect_error", self.perfect_error)?;
        validate_non_negative("noise_error_threshold", self.noise_error_threshold)
    }
}

fn validate_unit_interval(name: &str, value: f64) -> Result<(), ExtractionError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ExtractionError::InvalidParameter(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

fn validate_non_negative(name: &str, value: f64) -> Result<(), ExtractionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ExtractionError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

/// How a single pixel was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    /// Full and background renders agree; the pixel is fully transparent
    Background,
    /// Weak, poorly reconstructed difference discarded as rendering noise
    Noise,
    /// Foreground content with a recovered color and alpha
    Foreground,
}

/// Per-class pixel counts of one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Pixels classified as pure background
    pub background: u64,
    /// Pixels rejected as rendering noise
    pub noise_rejected: u64,
    /// Pixels emitted with foreground content
    pub foreground: u64,
    /// Foreground pixels whose alpha scan ended on a perfect reconstruction
    pub early_exits: u64,
}

impl ExtractionReport {
    /// Number of pixels accounted for by the report.
    pub const fn total(&self) -> u64 {
        self.background + self.noise_rejected + self.foreground
    }

    fn record(&mut self, outcome: &PixelOutcome) {
        match outcome.class {
            PixelClass::Background => self.background += 1,
            PixelClass::Noise => self.noise_rejected += 1,
            PixelClass::Foreground => {
                self.foreground += 1;
                if outcome.early_exit {
                    self.early_exits += 1;
                }
            }
        }
    }
}

impl Add for ExtractionReport {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            background: self.background + other.background,
            noise_rejected: self.noise_rejected + other.noise_rejected,
            foreground: self.foreground + other.foreground,
            early_exits: self.early_exits + other.early_exits,
        }
    }
}

/// Trait for recovering a foreground layer from a full render
///
/// `self` is the full render; the argument is the background-only render.
/// Inputs are never modified and a freshly allocated image is returned.
pub trait ForegroundExtractionExt {
    /// Extracts the foreground with the reference thresholds.
    ///
    /// # Errors
    ///
    /// * `ExtractionError::DimensionMismatch` - When the renders differ in size
    fn extract_foreground(&self, background: &Self) -> Result<Self, ExtractionError>
    where
        Self: Sized;

    /// Extracts the foreground with custom tunables.
    ///
    /// # Errors
    ///
    /// * `ExtractionError::DimensionMismatch` - When the renders differ in size
    /// * `ExtractionError::InvalidParameter` - When `params` fails validation
    fn extract_foreground_with_params(
        &self,
        background: &Self,
        params: &ExtractionParams,
    ) -> Result<Self, ExtractionError>
    where
        Self: Sized;
}

impl ForegroundExtractionExt for Image<Rgba<u8>> {
    fn extract_foreground(&self, background: &Self) -> Result<Self, ExtractionError> {
        extract_foreground(self, background)
    }

    fn extract_foreground_with_params(
        &self,
        background: &Self,
        params: &ExtractionParams,
    ) -> Result<Self, ExtractionError> {
        extract_foreground_with_params(self, background, params)
    }
}

/// Extracts the foreground layer using the reference thresholds
///
/// # Arguments
/// * `full` - Render of every layer
/// * `background` - Render of the background layer only
///
/// # Returns
/// * `Ok(Image<Rgba<u8>>)` - Foreground that recomposes `full` over `background`
/// * `Err(ExtractionError)` - If the renders differ in size
///
/// # Examples
/// ```no_run
/// use icon_flatten::{extract_foreground, Image};
/// use image::Rgba;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let full: Image<Rgba<u8>> = Image::new(108, 108);
/// let background: Image<Rgba<u8>> = Image::new(108, 108);
/// let foreground = extract_foreground(&full, &background)?;
/// # Ok(())
/// # }
/// ```
pub fn extract_foreground(
    full: &Image<Rgba<u8>>,
    background: &Image<Rgba<u8>>,
) -> Result<Image<Rgba<u8>>, ExtractionError> {
    extract_foreground_with_params(full, background, &ExtractionParams::default())
}

/// Extracts the foreground layer with custom tunables
pub fn extract_foreground_with_params(
    full: &Image<Rgba<u8>>,
    background: &Image<Rgba<u8>>,
    params: &ExtractionParams,
) -> Result<Image<Rgba<u8>>, ExtractionError> {
    extract_foreground_with_report(full, background, params).map(|(foreground, _)| foreground)
}

/// Extracts the foreground layer and reports how pixels were classified
///
/// # Errors
///
/// * `ExtractionError::InvalidParameter` - When `params` fails validation
/// * `ExtractionError::DimensionMismatch` - When the renders differ in size
#[instrument(level = "debug", skip_all, fields(width = full.width(), height = full.height()))]
pub fn extract_foreground_with_report(
    full: &Image<Rgba<u8>>,
    background: &Image<Rgba<u8>>,
    params: &ExtractionParams,
) -> Result<(Image<Rgba<u8>>, ExtractionReport), ExtractionError> {
    params.validate()?;
    validate_matching_dimensions(
        full.dimensions(),
        background.dimensions(),
        |full, background| ExtractionError::DimensionMismatch { full, background },
    )?;

    let (width, height) = full.dimensions();
    let mut foreground: Image<Rgba<u8>> = ImageBuffer::new(width, height);
    if width == 0 || height == 0 {
        return Ok((foreground, ExtractionReport::default()));
    }

    let row_len = width as usize * usize::from(Rgba::<u8>::CHANNEL_COUNT);
    let report = extract_rows(
        full.as_raw(),
        background.as_raw(),
        &mut foreground,
        row_len,
        params,
    );

    debug!(
        background = report.background,
        noise_rejected = report.noise_rejected,
        foreground = report.foreground,
        early_exits = report.early_exits,
        "foreground extraction finished"
    );

    Ok((foreground, report))
}

#[cfg(not(feature = "rayon"))]
fn extract_rows(
    full: &[u8],
    background: &[u8],
    output: &mut [u8],
    row_len: usize,
    params: &ExtractionParams,
) -> ExtractionReport {
    output
        .chunks_mut(row_len)
        .zip_eq(full.chunks(row_len))
        .zip_eq(background.chunks(row_len))
        .map(|((out_row, full_row), bg_row)| extract_row(full_row, bg_row, out_row, params))
        .fold(ExtractionReport::default(), Add::add)
}

#[cfg(feature = "rayon")]
fn extract_rows(
    full: &[u8],
    background: &[u8],
    output: &mut [u8],
    row_len: usize,
    params: &ExtractionParams,
) -> ExtractionReport {
    use rayon::prelude::*;

    output
        .par_chunks_mut(row_len)
        .zip(full.par_chunks(row_len))
        .zip(background.par_chunks(row_len))
        .map(|((out_row, full_row), bg_row)| extract_row(full_row, bg_row, out_row, params))
        .reduce(ExtractionReport::default, Add::add)
}

fn extract_row(
    full_row: &[u8],
    bg_row: &[u8],
    out_row: &mut [u8],
    params: &ExtractionParams,
) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for ((full, background), out) in full_row
        .chunks_exact(4)
        .zip_eq(bg_row.chunks_exact(4))
        .zip_eq(out_row.chunks_exact_mut(4))
    {
        let outcome = classify_pixel(
            *Rgba::from_slice(full),
            *Rgba::from_slice(background),
            params,
        );
        out.copy_from_slice(&outcome.pixel.0);
        report.record(&outcome);
    }

    report
}

/// Extracts the foreground color and alpha of a single pixel pair
///
/// This is the per-pixel kernel of [`extract_foreground`]; it has no
/// dependency on neighboring pixels.
///
/// # Errors
///
/// * `ExtractionError::InvalidParameter` - When `params` fails validation
pub fn extract_foreground_pixel(
    full: Rgba<u8>,
    background: Rgba<u8>,
    params: &ExtractionParams,
) -> Result<(Rgba<u8>, PixelClass), ExtractionError> {
    params.validate()?;
    let outcome = classify_pixel(full, background, params);
    Ok((outcome.pixel, outcome.class))
}

#[derive(Debug, Clone, Copy)]
struct PixelOutcome {
    pixel: Rgba<u8>,
    class: PixelClass,
    early_exit: bool,
}

impl PixelOutcome {
    const fn transparent(class: PixelClass) -> Self {
        Self {
            pixel: TRANSPARENT,
            class,
            early_exit: false,
        }
    }
}

/// Best candidate found by the alpha scan
#[derive(Debug, Clone, Copy)]
struct AlphaCandidate {
    alpha: f64,
    color: [u8; 3],
    error: f64,
}

fn classify_pixel(full: Rgba<u8>, background: Rgba<u8>, params: &ExtractionParams) -> PixelOutcome {
    if max_abs_difference(&full.0, &background.0) < params.identity_threshold {
        return PixelOutcome::transparent(PixelClass::Background);
    }

    let signal = max_abs_difference(&full.0[..3], &background.0[..3]);
    let full_rgb = [0, 1, 2].map(|channel| f64::from(full[channel]));
    let bg_rgb = [0, 1, 2].map(|channel| f64::from(background[channel]));

    let start = params.min_alpha.max(f64::from(signal) / f64::from(CHANNEL_MAX));
    let (best, early_exit) = search_alpha(full_rgb, bg_rgb, start, params);

    if is_rendering_noise(best.error, signal, params) {
        return PixelOutcome::transparent(PixelClass::Noise);
    }

    let [red, green, blue] = best.color;
    PixelOutcome {
        pixel: Rgba([red, green, blue, round_to_u8(best.alpha * 255.0)]),
        class: PixelClass::Foreground,
        early_exit,
    }
}

/// Scans alpha candidates `start, start + step, ...` up to `1.0`.
///
/// Returns the first minimum-error candidate and whether the scan stopped on a
/// perfect reconstruction.
fn search_alpha(
    full: [f64; 3],
    background: [f64; 3],
    start: f64,
    params: &ExtractionParams,
) -> (AlphaCandidate, bool) {
    let mut best = evaluate_candidate(full, background, start);
    if best.error < params.perfect_error {
        return (best, true);
    }

    let last_step = ((1.0 + ALPHA_EPSILON - start) / params.alpha_step).ceil() as u32;
    for step in 1..=last_step {
        let alpha = start + params.alpha_step * f64::from(step);
        if alpha > 1.0 + ALPHA_EPSILON {
            break;
        }

        let candidate = evaluate_candidate(full, background, alpha);
        if candidate.error < best.error {
            best = candidate;
        }
        if candidate.error < params.perfect_error {
            return (best, true);
        }
    }

    (best, false)
}

/// Inverts the compositing equation for one alpha and measures how well the
/// storable color recomposes the observed pixel.
fn evaluate_candidate(full: [f64; 3], background: [f64; 3], alpha: f64) -> AlphaCandidate {
    let beta = 1.0 - alpha;
    let mut color = [0u8; 3];
    let mut error = 0.0;

    for channel in 0..3 {
        let solved = (full[channel] - beta * background[channel]) / alpha;
        let stored = round_to_u8(solved);
        let recomposed = alpha * f64::from(stored) + beta * background[channel];

        error += (recomposed - full[channel]).abs();
        color[channel] = stored;
    }

    AlphaCandidate {
        alpha,
        color,
        error,
    }
}

#[inline]
fn is_rendering_noise(best_error: f64, signal: u8, params: &ExtractionParams) -> bool {
    best_error > params.noise_error_threshold && signal < params.noise_signal_threshold
}
