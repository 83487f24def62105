//! Find a known logo or stamp on document pages and paint it over.
//!
//! Each page is scanned with normalized cross-correlation against a small
//! template image. Every position scoring at or above the threshold is painted
//! with the median color of a ring of pixels sampled around it, giving a flat
//! fill that blends into the page background.
//!
//! # Quick Start
//!
//! ```no_run
//! use logo_redaction::{RedactOptions, RedactionEngine};
//!
//! let engine = RedactionEngine::from_path("image/1.png", RedactOptions::default())
//!     .expect("failed to load template");
//! let page = image::open("page.png").unwrap().to_rgb8();
//! let outcome = engine.redact_page(&page);
//! println!("{} regions redacted", outcome.regions.len());
//! outcome.image.save("page_redacted.png").unwrap();
//! ```
//!
//! # Core functions
//!
//! The detector and the painter are plain functions over [`image::RgbImage`]
//! and can be used without the engine:
//!
//! ```no_run
//! use logo_redaction::{detect, redact, Template};
//!
//! let template = Template::load("image/1.png").unwrap();
//! let page = image::open("page.png").unwrap().to_rgb8();
//! let regions = detect(&page, &template, 0.8);
//! let cleaned = redact(&page, &regions, 5);
//! # let _ = cleaned;
//! ```

#![deny(missing_docs)]

pub mod detection;
mod engine;
pub mod error;
pub mod geometry;
pub mod painting;
pub mod template;

pub use detection::{detect, Detection, MatchRegion, DEFAULT_THRESHOLD};
pub use engine::{
    default_output_path, is_supported_image, list_pages, save_image, PageOutcome, ProcessResult,
    RedactOptions, RedactionEngine,
};
pub use error::{Error, Result};
pub use painting::{redact, DEFAULT_BORDER_DISTANCE};
pub use template::Template;
