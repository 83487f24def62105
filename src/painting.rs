//! Overpainting of detected regions with a locally sampled flat color.
//!
//! The fill color of a region is the per-channel median of a ring of probe
//! pixels around it. Probes sit at `x + dx*w/2`, `y + dy*h/2` for every
//! `(dy, dx)` on the perimeter of the `[-D, D]` grid, so the ring is measured
//! in half-template steps from the region's top-left corner rather than in
//! pixels. Probes falling outside the page are clamped to the nearest edge.
//!
//! All probes read the page as it was before any region was painted, so the
//! fill of one region never depends on the fill of another.

use image::{Rgb, RgbImage};

use crate::detection::MatchRegion;
use crate::error::{Error, Result};
use crate::geometry::{probe_coordinate, ring_offsets, CHANNELS};

/// Default ring distance, in half-template steps.
pub const DEFAULT_BORDER_DISTANCE: u32 = 5;

/// Collect the border sample set for one region.
///
/// Returns one color per ring position, in ring order. The set is empty only
/// when the page itself has no pixels.
#[must_use]
pub fn border_samples(page: &RgbImage, region: &MatchRegion, distance: u32) -> Vec<Rgb<u8>> {
    ring_offsets(distance)
        .filter_map(|(dy, dx)| {
            let px = probe_coordinate(region.x, dx, region.width, page.width())?;
            let py = probe_coordinate(region.y, dy, region.height, page.height())?;
            Some(*page.get_pixel(px, py))
        })
        .collect()
}

/// Per-channel median of a set of colors.
///
/// With an even number of samples the two middle values are averaged and the
/// result truncated. Returns `None` for an empty set.
#[must_use]
pub fn median_color(samples: &[Rgb<u8>]) -> Option<Rgb<u8>> {
    if samples.is_empty() {
        return None;
    }

    let mut color = [0u8; CHANNELS];
    let mut channel: Vec<u8> = Vec::with_capacity(samples.len());
    for (ch, out) in color.iter_mut().enumerate() {
        channel.clear();
        channel.extend(samples.iter().map(|px| px[ch]));
        channel.sort_unstable();

        let mid = channel.len() / 2;
        *out = if channel.len() % 2 == 1 {
            channel[mid]
        } else {
            let sum = u16::from(channel[mid - 1]) + u16::from(channel[mid]);
            u8::try_from(sum / 2).unwrap_or(u8::MAX)
        };
    }

    Some(Rgb(color))
}

/// Fill color for one region, sampled from `page`.
///
/// # Errors
///
/// Returns [`Error::DegenerateSample`] if no border pixel could be sampled.
pub fn fill_color(page: &RgbImage, region: &MatchRegion, distance: u32) -> Result<Rgb<u8>> {
    median_color(&border_samples(page, region, distance)).ok_or(Error::DegenerateSample {
        x: region.x,
        y: region.y,
    })
}

/// Paint the region's rectangle, clipped to the image, with a flat color.
fn paint_region(image: &mut RgbImage, region: &MatchRegion, color: Rgb<u8>) {
    let x2 = region.right().min(image.width());
    let y2 = region.bottom().min(image.height());
    for py in region.y..y2 {
        for px in region.x..x2 {
            image.put_pixel(px, py, color);
        }
    }
}

/// Redact every region of `page` and return the result as a new image.
///
/// Fill colors are computed from the untouched `page` before anything is
/// painted. Regions are then painted top to bottom, left to right, whatever
/// order they were given in, so where overlapping regions get different
/// fills the lower-right one wins. A region with no border samples is left
/// as is.
#[must_use]
pub fn redact(page: &RgbImage, regions: &[MatchRegion], distance: u32) -> RgbImage {
    let mut fills: Vec<(MatchRegion, Rgb<u8>)> = regions
        .iter()
        .filter_map(|region| match fill_color(page, region, distance) {
            Ok(color) => Some((*region, color)),
            Err(e) => {
                tracing::debug!(error = %e, "leaving region unpainted");
                None
            }
        })
        .collect();
    fills.sort_by_key(|(r, _)| (r.y, r.x, r.height, r.width));

    let mut out = page.clone();
    for (region, color) in &fills {
        paint_region(&mut out, region, *color);
    }
    out
}
