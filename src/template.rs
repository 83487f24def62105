//! The reference pattern searched for on every page.
//!
//! A [`Template`] is loaded once and then shared read-only by every detection
//! call. Loading precomputes the per-channel sums and the zero-mean energy the
//! correlation score needs, so the detector only accumulates window statistics.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{Error, Result};
use crate::geometry::CHANNELS;

/// An immutable RGB template with precomputed correlation statistics.
#[derive(Debug, Clone)]
pub struct Template {
    image: RgbImage,
    sums: [u64; CHANNELS],
    energy: u128,
}

impl Template {
    /// Load a template from an image file.
    ///
    /// Any alpha channel is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if the file is missing, cannot be
    /// decoded, or has a zero dimension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| Error::InvalidTemplate {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        Self::build(image, path.to_path_buf())
    }

    /// Build a template from an in-memory image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if the image has a zero dimension.
    pub fn from_image(image: RgbImage) -> Result<Self> {
        Self::build(image, PathBuf::from("<memory>"))
    }

    fn build(image: RgbImage, path: PathBuf) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::InvalidTemplate {
                path,
                reason: format!("empty image ({}x{})", image.width(), image.height()),
            });
        }

        let mut sums = [0u64; CHANNELS];
        let mut squares = [0u64; CHANNELS];
        for px in image.pixels() {
            for (ch, &value) in px.0.iter().enumerate() {
                let v = u64::from(value);
                sums[ch] += v;
                squares[ch] += v * v;
            }
        }

        let n = u128::from(image.width()) * u128::from(image.height());
        let energy = sums
            .iter()
            .zip(squares.iter())
            .map(|(&s, &sq)| n * u128::from(sq) - u128::from(s) * u128::from(s))
            .sum();

        Ok(Self {
            image,
            sums,
            energy,
        })
    }

    /// Template width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Template height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The underlying pixels.
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Whether every pixel has the same color.
    ///
    /// Such a template has no variance and can never produce a match.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.energy == 0
    }

    /// Per-channel sum of pixel values.
    pub(crate) fn sums(&self) -> &[u64; CHANNELS] {
        &self.sums
    }

    /// `n * Σ(T - mean(T))²`, summed over channels.
    pub(crate) fn energy(&self) -> u128 {
        self.energy
    }
}
