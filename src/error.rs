use thiserror::Error;

/// Error type for foreground extraction
///
/// This error type covers the failure modes of recovering a foreground
/// layer from a full render and a background-only render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Full and background renders do not have the same dimensions
    ///
    /// Extraction compares the two renders pixel by pixel, so both
    /// buffers must be exactly the same size. No output is produced.
    #[error("Full and background images must have identical dimensions: full {full:?}, background {background:?}")]
    DimensionMismatch {
        /// Dimensions of the full render (width, height)
        full: (u32, u32),
        /// Dimensions of the background render (width, height)
        background: (u32, u32),
    },

    /// Invalid tunable provided to the extractor
    ///
    /// Returned when an extraction parameter is not finite or lies
    /// outside its acceptable range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Error type for compositing operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    /// Foreground and background dimensions do not match
    #[error("Foreground and background dimensions do not match: foreground {foreground:?}, background {background:?}")]
    DimensionMismatch {
        /// Foreground dimensions (width, height)
        foreground: (u32, u32),
        /// Background dimensions (width, height)
        background: (u32, u32),
    },
}

/// Error type for safe-area fitting
///
/// This error type represents failures that can occur when placing an
/// image inside a square canvas, typically related to size constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafeAreaError {
    /// Source image has a zero dimension and cannot be scaled
    #[error("Cannot fit an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Canvas or safe area size is unusable
    ///
    /// Both sizes must be non-zero and the safe area must fit inside
    /// the canvas.
    #[error("Safe area ({safe_area_size}) must be non-zero and no larger than the canvas ({canvas_size})")]
    InvalidCanvas {
        canvas_size: u32,
        safe_area_size: u32,
    },
}
