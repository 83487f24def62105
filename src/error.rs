//! Error types for the logo-redaction crate.

use std::path::PathBuf;

/// Errors that can occur while loading the template and redacting pages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template image is missing, unreadable, or empty.
    #[error("invalid template {}: {reason}", path.display())]
    InvalidTemplate {
        /// Path the template was loaded from.
        path: PathBuf,
        /// Why the template was rejected.
        reason: String,
    },

    /// The template does not fit inside the page, so it cannot match there.
    ///
    /// Soft error: the detector reports such a page as having no matches.
    #[error(
        "template ({template_width}x{template_height}) larger than page ({page_width}x{page_height})"
    )]
    OversizedTemplate {
        /// Template width in pixels.
        template_width: u32,
        /// Template height in pixels.
        template_height: u32,
        /// Page width in pixels.
        page_width: u32,
        /// Page height in pixels.
        page_height: u32,
    },

    /// No border pixel could be sampled around a region.
    ///
    /// Soft error: the painter leaves such a region untouched.
    #[error("no border samples around region at ({x}, {y})")]
    DegenerateSample {
        /// Region top-left x.
        x: u32,
        /// Region top-left y.
        y: u32,
    },

    /// The match threshold is not a finite value in `[-1, 1]`.
    #[error("threshold must be a finite value in [-1, 1], got {0}")]
    InvalidThreshold(f32),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
