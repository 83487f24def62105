//! Page pipeline around the detector and the painter.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};

use crate::detection::{self, Detection, MatchRegion, DEFAULT_THRESHOLD};
use crate::error::{Error, Result};
use crate::painting::{self, DEFAULT_BORDER_DISTANCE};
use crate::template::Template;

/// Options controlling detection and redaction.
#[derive(Debug, Clone)]
pub struct RedactOptions {
    /// Minimum correlation score for a match (-1.0 to 1.0).
    pub threshold: f32,
    /// Ring distance for border sampling, in half-template steps.
    pub border_distance: u32,
    /// Detect and report only, write nothing.
    pub dry_run: bool,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            border_distance: DEFAULT_BORDER_DISTANCE,
            dry_run: false,
        }
    }
}

impl RedactOptions {
    /// Check that the options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] if the threshold is not a finite
    /// value in `[-1, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// A redacted page together with what was found on it.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// The redacted page.
    pub image: RgbImage,
    /// Regions that were painted over, in detection order.
    pub regions: Vec<MatchRegion>,
    /// Highest correlation score on the page, if the template fit at all.
    pub best_score: Option<f32>,
}

/// Result of processing one document (a page image or a directory of pages).
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed document.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Number of pages processed.
    pub pages: usize,
    /// Total number of matched regions across all pages.
    pub matches: usize,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            pages: 0,
            matches: 0,
            message,
        }
    }
}

/// The redaction engine holding the template and options.
///
/// Create once and reuse for every page; the engine is immutable and can be
/// shared across threads.
pub struct RedactionEngine {
    template: Template,
    options: RedactOptions,
}

impl RedactionEngine {
    /// Create an engine from a loaded template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] if the options are invalid.
    pub fn new(template: Template, options: RedactOptions) -> Result<Self> {
        options.validate()?;
        if template.is_uniform() {
            tracing::warn!("template has a single color and will never match");
        }
        Ok(Self { template, options })
    }

    /// Load the template from `path` and create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if the template cannot be loaded, or
    /// [`Error::InvalidThreshold`] if the options are invalid.
    pub fn from_path(path: impl AsRef<Path>, options: RedactOptions) -> Result<Self> {
        let template = Template::load(path.as_ref())?;
        tracing::info!(
            path = %path.as_ref().display(),
            width = template.width(),
            height = template.height(),
            "template loaded"
        );
        Self::new(template, options)
    }

    /// The template searched for.
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &RedactOptions {
        &self.options
    }

    /// Find the template on a page.
    #[must_use]
    pub fn detect_page(&self, page: &RgbImage) -> Detection {
        detection::detect_scored(page, &self.template, self.options.threshold)
    }

    /// Detect and paint over every match on a page.
    ///
    /// The input page is not modified.
    #[must_use]
    pub fn redact_page(&self, page: &RgbImage) -> PageOutcome {
        let Detection {
            regions,
            best_score,
        } = self.detect_page(page);
        let image = painting::redact(page, &regions, self.options.border_distance);
        PageOutcome {
            image,
            regions,
            best_score,
        }
    }

    fn load_and_redact(&self, path: &Path) -> Result<PageOutcome> {
        let page = image::open(path)?.to_rgb8();
        let outcome = self.redact_page(&page);
        tracing::debug!(
            page = %path.display(),
            matches = outcome.regions.len(),
            best_score = ?outcome.best_score,
            "page redacted"
        );
        Ok(outcome)
    }

    /// Process a single page image: load, redact, save.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        let outcome = match self.load_and_redact(input) {
            Ok(outcome) => outcome,
            Err(e) => return ProcessResult::failed(input, format!("Failed to load: {e}")),
        };

        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: true,
            pages: 1,
            matches: outcome.regions.len(),
            message: describe(1, outcome.regions.len(), outcome.best_score),
        };

        if self.options.dry_run {
            return result;
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        if let Err(e) = save_image(&outcome.image, output) {
            result.success = false;
            result.message = format!("Failed to save: {e}");
        }

        result
    }

    /// Process every supported page image in a directory as one document.
    ///
    /// Pages are redacted in parallel when the `cli` feature is enabled (via
    /// rayon) and written to `output_dir` under their original file names. If
    /// any page fails, nothing is left in `output_dir` from this document.
    #[must_use]
    pub fn process_document(&self, input_dir: &Path, output_dir: &Path) -> ProcessResult {
        let pages = match list_pages(input_dir) {
            Ok(pages) if pages.is_empty() => {
                return ProcessResult::failed(input_dir, "No page images found".to_string());
            }
            Ok(pages) => pages,
            Err(e) => {
                return ProcessResult::failed(input_dir, format!("Failed to read directory: {e}"))
            }
        };

        let outcomes = match self.redact_all(&pages) {
            Ok(outcomes) => outcomes,
            Err((path, e)) => {
                return ProcessResult::failed(
                    input_dir,
                    format!("Failed on page {}: {e}", path.display()),
                );
            }
        };

        let matches: usize = outcomes.iter().map(|o| o.regions.len()).sum();
        let best_score = outcomes
            .iter()
            .filter_map(|o| o.best_score)
            .reduce(f32::max);
        tracing::info!(
            document = %input_dir.display(),
            pages = pages.len(),
            matches,
            "document redacted"
        );

        let result = ProcessResult {
            path: input_dir.to_path_buf(),
            success: true,
            pages: pages.len(),
            matches,
            message: describe(pages.len(), matches, best_score),
        };

        if self.options.dry_run {
            return result;
        }

        if let Err(e) = write_pages(&pages, &outcomes, output_dir) {
            return ProcessResult::failed(input_dir, format!("Failed to save: {e}"));
        }

        result
    }

    /// Process a page image or a directory of pages, depending on `input`.
    #[must_use]
    pub fn process_path(&self, input: &Path, output: &Path) -> ProcessResult {
        if input.is_dir() {
            self.process_document(input, output)
        } else {
            self.process_file(input, output)
        }
    }

    #[cfg(feature = "cli")]
    fn redact_all(
        &self,
        pages: &[PathBuf],
    ) -> std::result::Result<Vec<PageOutcome>, (PathBuf, Error)> {
        use rayon::prelude::*;
        pages
            .par_iter()
            .map(|path| self.load_and_redact(path).map_err(|e| (path.clone(), e)))
            .collect()
    }

    #[cfg(not(feature = "cli"))]
    fn redact_all(
        &self,
        pages: &[PathBuf],
    ) -> std::result::Result<Vec<PageOutcome>, (PathBuf, Error)> {
        pages
            .iter()
            .map(|path| self.load_and_redact(path).map_err(|e| (path.clone(), e)))
            .collect()
    }
}

fn describe(pages: usize, matches: usize, best_score: Option<f32>) -> String {
    let page_word = if pages == 1 { "page" } else { "pages" };
    let match_word = if matches == 1 { "match" } else { "matches" };
    match best_score {
        Some(score) => format!("{matches} {match_word} on {pages} {page_word} (best score {score:.2})"),
        None => format!("{matches} {match_word} on {pages} {page_word}"),
    }
}

/// Save every page under its input file name.
///
/// Pages are first encoded to temporary files inside `output_dir` and only
/// renamed over their targets once every page encoded, so a failure leaves
/// files already present in `output_dir` untouched.
fn write_pages(pages: &[PathBuf], outcomes: &[PageOutcome], output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let mut staged = Vec::with_capacity(pages.len());
    for (input, outcome) in pages.iter().zip(outcomes) {
        let Some(name) = input.file_name() else {
            continue;
        };
        let target = output_dir.join(name);
        if target.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", target.display()),
            )));
        }
        let format = output_format(&target)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".logo-redact-")
            .tempfile_in(output_dir)?;
        encode_image(&outcome.image, format, tmp.as_file_mut())?;
        staged.push((tmp, target));
    }

    for (tmp, target) in staged {
        tmp.persist(&target).map_err(|e| e.error)?;
    }

    Ok(())
}

/// List the supported page images in a directory, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be read.
pub fn list_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_supported_image(p))
        .collect();
    pages.sort();
    Ok(pages)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn output_format(path: &Path) -> Result<ImageFormat> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => Ok(format),
        _ => Err(Error::UnsupportedFormat(format!("{format:?}"))),
    }
}

fn encode_image(img: &RgbImage, format: ImageFormat, file: &mut File) -> Result<()> {
    if format == ImageFormat::Jpeg {
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
        encoder.encode_image(img)?;
    } else {
        img.write_to(file, format)?;
    }
    Ok(())
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format = output_format(path)?;
    let mut file = File::create(path)?;
    encode_image(img, format, &mut file)
}

/// Generate a default output path from an input path.
///
/// Example: `"scan.png"` becomes `"scan_redacted.png"`; a directory `"pages"`
/// becomes `"pages_redacted"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    match input.extension() {
        Some(ext) => parent.join(format!("{stem}_redacted.{}", ext.to_string_lossy())),
        None => parent.join(format!("{stem}_redacted")),
    }
}
