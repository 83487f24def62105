//! Template matching by normalized cross-correlation.
//!
//! Every top-left position where the template fits inside the page is scored
//! with the channel-summed correlation coefficient
//!
//! `score = Σc Σ(S-mean(S))(T-mean(T)) / sqrt(Σc Σ(S-mean(S))² * Σc Σ(T-mean(T))²)`
//!
//! with per-channel means. Window statistics are accumulated as exact
//! integers, so a constant window or template yields a zero denominator and
//! therefore a score of 0 instead of NaN.
//!
//! A full scan keeps running column sums of the page values and their squares,
//! so only the cross term with the template is recomputed per window.

use image::RgbImage;

use crate::error::{Error, Result};
use crate::geometry::{pixel_offset, window_fits, CHANNELS};
use crate::template::Template;

/// Default minimum score for a position to count as a match.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// A rectangle on a page where the template matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels (the template width).
    pub width: u32,
    /// Height in pixels (the template height).
    pub height: u32,
}

impl MatchRegion {
    /// Create a region from its top-left corner and size.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column, saturating at `u32::MAX`.
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// One past the bottom row, saturating at `u32::MAX`.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

/// Result of scanning one page.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Positions scoring at or above the threshold, row-major.
    pub regions: Vec<MatchRegion>,
    /// Highest score seen on the page, `None` if no window fits.
    pub best_score: Option<f32>,
}

/// Per-channel sums of a window's values and squared values.
#[derive(Default, Clone, Copy)]
struct WindowSums {
    sum: [u64; CHANNELS],
    square: [u64; CHANNELS],
}

impl WindowSums {
    fn add(&mut self, sum: &[u64; CHANNELS], square: &[u64; CHANNELS]) {
        for (acc, v) in self.sum.iter_mut().zip(sum) {
            *acc += v;
        }
        for (acc, v) in self.square.iter_mut().zip(square) {
            *acc += v;
        }
    }

    fn sub(&mut self, sum: &[u64; CHANNELS], square: &[u64; CHANNELS]) {
        for (acc, v) in self.sum.iter_mut().zip(sum) {
            *acc -= v;
        }
        for (acc, v) in self.square.iter_mut().zip(square) {
            *acc -= v;
        }
    }
}

/// Column sums over a band of `template height` page rows.
struct ColumnSums {
    sum: Vec<[u64; CHANNELS]>,
    square: Vec<[u64; CHANNELS]>,
}

impl ColumnSums {
    fn new(width: u32) -> Self {
        Self {
            sum: vec![[0; CHANNELS]; width as usize],
            square: vec![[0; CHANNELS]; width as usize],
        }
    }

    fn add_row(&mut self, row: &[u8]) {
        for ((sum, square), px) in self
            .sum
            .iter_mut()
            .zip(self.square.iter_mut())
            .zip(row.chunks_exact(CHANNELS))
        {
            for (ch, &v) in px.iter().enumerate() {
                let v = u64::from(v);
                sum[ch] += v;
                square[ch] += v * v;
            }
        }
    }

    fn sub_row(&mut self, row: &[u8]) {
        for ((sum, square), px) in self
            .sum
            .iter_mut()
            .zip(self.square.iter_mut())
            .zip(row.chunks_exact(CHANNELS))
        {
            for (ch, &v) in px.iter().enumerate() {
                let v = u64::from(v);
                sum[ch] -= v;
                square[ch] -= v * v;
            }
        }
    }

    fn window(&self, x: usize, width: usize) -> WindowSums {
        let mut window = WindowSums::default();
        for (sum, square) in self.sum[x..x + width].iter().zip(&self.square[x..x + width]) {
            window.add(sum, square);
        }
        window
    }
}

/// Fail with [`Error::OversizedTemplate`] if the template cannot fit on the page.
///
/// # Errors
///
/// Returns [`Error::OversizedTemplate`] when the template is wider or taller
/// than the page.
pub fn check_fits(page: &RgbImage, template: &Template) -> Result<()> {
    if window_fits(page.width(), page.height(), template.width(), template.height()) {
        Ok(())
    } else {
        Err(Error::OversizedTemplate {
            template_width: template.width(),
            template_height: template.height(),
            page_width: page.width(),
            page_height: page.height(),
        })
    }
}

fn page_row(page: &RgbImage, y: u32) -> &[u8] {
    let start = pixel_offset(page.width(), 0, y);
    let end = pixel_offset(page.width(), 0, y + 1);
    &page.as_raw()[start..end]
}

/// Per-channel `Σ S*T` of the window at `(x, y)`.
fn cross_products(page: &RgbImage, template: &Template, x: u32, y: u32) -> [u64; CHANNELS] {
    let mut cross = [0u64; CHANNELS];
    let (tw, th) = (template.width(), template.height());
    let row_len = tw as usize * CHANNELS;
    let page_raw = page.as_raw();
    let tpl_raw = template.image().as_raw();

    for ty in 0..th {
        let page_start = pixel_offset(page.width(), x, y + ty);
        let tpl_start = pixel_offset(tw, 0, ty);
        let page_row = &page_raw[page_start..page_start + row_len];
        let tpl_row = &tpl_raw[tpl_start..tpl_start + row_len];

        for (p, t) in page_row
            .chunks_exact(CHANNELS)
            .zip(tpl_row.chunks_exact(CHANNELS))
        {
            for (ch, (&pv, &tv)) in p.iter().zip(t).enumerate() {
                cross[ch] += u64::from(pv) * u64::from(tv);
            }
        }
    }

    cross
}

/// Direct window sums, for scoring a single position.
fn window_sums(page: &RgbImage, template: &Template, x: u32, y: u32) -> WindowSums {
    let mut columns = ColumnSums::new(page.width());
    for ty in y..y + template.height() {
        columns.add_row(page_row(page, ty));
    }
    columns.window(x as usize, template.width() as usize)
}

fn correlation(template: &Template, window: &WindowSums, cross: &[u64; CHANNELS]) -> f32 {
    let tpl_energy = template.energy();
    let n = i128::from(template.width()) * i128::from(template.height());

    let mut numerator = 0i128;
    let mut win_energy = 0u128;
    let channels = window
        .sum
        .iter()
        .zip(&window.square)
        .zip(cross)
        .zip(template.sums());
    for (((&sum_s, &square), &dot), &sum_t) in channels {
        let sum_s = i128::from(sum_s);
        numerator += n * i128::from(dot) - sum_s * i128::from(sum_t);
        win_energy += (n * i128::from(square) - sum_s * sum_s).unsigned_abs();
    }

    if win_energy == 0 || tpl_energy == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let denom = ((win_energy as f64) * (tpl_energy as f64)).sqrt();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let score = (numerator as f64 / denom) as f32;
    score.clamp(-1.0, 1.0)
}

/// Visit every valid window row-major with its score.
///
/// The caller guarantees the template fits on the page.
fn scan(page: &RgbImage, template: &Template, mut visit: impl FnMut(u32, u32, f32)) {
    let max_x = page.width() - template.width();
    let max_y = page.height() - template.height();
    let tw = template.width() as usize;

    if template.is_uniform() {
        for y in 0..=max_y {
            for x in 0..=max_x {
                visit(x, y, 0.0);
            }
        }
        return;
    }

    let mut columns = ColumnSums::new(page.width());
    for y in 0..template.height() {
        columns.add_row(page_row(page, y));
    }

    for y in 0..=max_y {
        let mut window = columns.window(0, tw);
        for x in 0..=max_x {
            let cross = cross_products(page, template, x, y);
            visit(x, y, correlation(template, &window, &cross));

            if x < max_x {
                let (enter, leave) = (x as usize + tw, x as usize);
                window.add(&columns.sum[enter], &columns.square[enter]);
                window.sub(&columns.sum[leave], &columns.square[leave]);
            }
        }

        if y < max_y {
            columns.add_row(page_row(page, y + template.height()));
            columns.sub_row(page_row(page, y));
        }
    }
}

/// Correlation score of the window whose top-left corner is `(x, y)`.
///
/// Returns 0 when the window would extend past the page or when either the
/// window or the template has no variance.
#[must_use]
pub fn score_at(page: &RgbImage, template: &Template, x: u32, y: u32) -> f32 {
    let fits = x.checked_add(template.width()).is_some_and(|r| r <= page.width())
        && y.checked_add(template.height()).is_some_and(|b| b <= page.height());
    if !fits {
        return 0.0;
    }
    let window = window_sums(page, template, x, y);
    let cross = cross_products(page, template, x, y);
    correlation(template, &window, &cross)
}

/// Full score surface, row-major, of size
/// `(page_w - tpl_w + 1) * (page_h - tpl_h + 1)`.
///
/// Empty when the template does not fit on the page.
#[must_use]
pub fn score_map(page: &RgbImage, template: &Template) -> Vec<f32> {
    if check_fits(page, template).is_err() {
        return Vec::new();
    }
    let mut scores = Vec::new();
    scan(page, template, |_, _, score| scores.push(score));
    scores
}

/// Scan the page and report matches together with the best score.
///
/// An oversized template is not an error here: the page simply has no matches.
#[must_use]
pub fn detect_scored(page: &RgbImage, template: &Template, threshold: f32) -> Detection {
    if let Err(e) = check_fits(page, template) {
        tracing::debug!(error = %e, "template cannot match on this page");
        return Detection::default();
    }

    let mut regions = Vec::new();
    let mut best = f32::NEG_INFINITY;
    scan(page, template, |x, y, score| {
        best = best.max(score);
        if score >= threshold {
            regions.push(MatchRegion::new(
                x,
                y,
                template.width(),
                template.height(),
            ));
        }
    });

    Detection {
        regions,
        best_score: Some(best),
    }
}

/// Find every position where the template scores at or above `threshold`.
///
/// Regions are returned row-major (top to bottom, then left to right) and
/// overlapping positions are all reported.
#[must_use]
pub fn detect(page: &RgbImage, template: &Template, threshold: f32) -> Vec<MatchRegion> {
    detect_scored(page, template, threshold).regions
}
