//! Pixel indexing and probe arithmetic shared by the detector and the painter.

/// Number of color channels in an RGB raster.
pub(crate) const CHANNELS: usize = 3;

/// Byte offset of pixel `(x, y)` in a row-major RGB buffer of the given width.
#[inline]
pub(crate) fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    (y as usize * width as usize + x as usize) * CHANNELS
}

/// Whether a `tpl_w x tpl_h` window fits inside a `page_w x page_h` raster.
#[inline]
#[must_use]
pub fn window_fits(page_w: u32, page_h: u32, tpl_w: u32, tpl_h: u32) -> bool {
    tpl_w <= page_w && tpl_h <= page_h
}

/// Positions on the perimeter of the `[-d, d] x [-d, d]` grid, as `(dy, dx)`.
///
/// Yielded row-major (`dy` outer, `dx` inner). A distance of zero yields the
/// single position `(0, 0)`.
pub fn ring_offsets(distance: u32) -> impl Iterator<Item = (i64, i64)> {
    let d = i64::from(distance);
    (-d..=d).flat_map(move |dy| {
        (-d..=d)
            .filter(move |dx| dy.abs() == d || dx.abs() == d)
            .map(move |dx| (dy, dx))
    })
}

/// Map a ring step to a pixel coordinate along one axis.
///
/// Computes `origin + floor(step * extent / 2)` and clamps the result into
/// `[0, limit - 1]`. Returns `None` for an empty axis (`limit == 0`).
#[must_use]
pub fn probe_coordinate(origin: u32, step: i64, extent: u32, limit: u32) -> Option<u32> {
    if limit == 0 {
        return None;
    }
    let offset = (step * i64::from(extent)).div_euclid(2);
    let pos = (i64::from(origin) + offset).clamp(0, i64::from(limit) - 1);
    u32::try_from(pos).ok()
}
