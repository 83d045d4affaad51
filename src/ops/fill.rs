//! Loop-close flood fill: when a freehand stroke roughly returns to its start,
//! the enclosed interior is filled so a rough scribbled circle selects its
//! whole area without pixel-perfect closure.
//!
//! The fill is seeded at the stroke centroid and runs a span-based scanline
//! algorithm over the raw RGBA buffer — whole horizontal runs are filled per
//! iteration instead of recursing pixel-by-pixel, so cost is proportional to
//! the filled area even on multi-megapixel masks.

use image::RgbaImage;

use crate::canvas::{mask_pixel, ALPHA_SELECTED_THRESHOLD};
use crate::ops::stroke;

/// Fill the area enclosed by a closed freehand stroke.
///
/// `points` is the full ordered point list of the originating stroke and
/// `brush_size` / `alpha` match how that stroke was drawn.  The outline is
/// re-stroked as a closed polyline on a scratch copy of the mask, the fill
/// runs on the scratch, and the scratch replaces the live mask — the caller's
/// buffer is never left half-filled.
///
/// Degenerate input (empty, single point, collinear points) strokes whatever
/// outline it can and finds nothing to fill; never panics.  A centroid that
/// lands on already-painted pixels skips the fill step entirely.
pub fn fill_enclosed_area(mask: &mut RgbaImage, points: &[(f32, f32)], brush_size: f32, alpha: u8) {
    if points.is_empty() {
        return;
    }
    let width = mask.width();
    let height = mask.height();
    if width == 0 || height == 0 {
        return;
    }

    // Seed: arithmetic mean of the sample points, floored to a pixel.
    let n = points.len() as f32;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(ax, ay), &(x, y)| (ax + x, ay + y));
    let seed_x = (sum_x / n).floor();
    let seed_y = (sum_y / n).floor();

    let mut scratch = mask.clone();
    stroke::draw_closed_polyline(&mut scratch, points, brush_size, alpha);

    if seed_x >= 0.0 && seed_y >= 0.0 && (seed_x as u32) < width && (seed_y as u32) < height {
        scanline_fill(&mut scratch, seed_x as u32, seed_y as u32, alpha);
    }

    *mask = scratch;
}

/// Span-based scanline flood fill (4-connected) on the raw RGBA buffer.
///
/// Fills every transparent pixel (alpha ≤ threshold) reachable from the seed
/// without crossing painted pixels.  A non-transparent seed is a no-op.
pub fn scanline_fill(mask: &mut RgbaImage, seed_x: u32, seed_y: u32, alpha: u8) {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    if width == 0 || height == 0 {
        return;
    }
    // A fill at or below the detection threshold would leave every written
    // pixel still "open", re-seeding rows endlessly.
    if alpha <= ALPHA_SELECTED_THRESHOLD {
        return;
    }
    let raw = mask.as_mut();
    let fill = mask_pixel(alpha);

    #[inline(always)]
    fn open(raw: &[u8], width: usize, x: usize, y: usize) -> bool {
        raw[(y * width + x) * 4 + 3] <= ALPHA_SELECTED_THRESHOLD
    }

    let sx = seed_x as usize;
    let sy = seed_y as usize;
    if sx >= width || sy >= height || !open(raw, width, sx, sy) {
        return;
    }

    // Seed stack of (x, y) span starting points.
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(256);
    stack.push((sx, sy));

    while let Some((x, y)) = stack.pop() {
        if !open(raw, width, x, y) {
            continue; // already filled via an overlapping span
        }

        // Expand to the full open span on this row.
        let mut x0 = x;
        while x0 > 0 && open(raw, width, x0 - 1, y) {
            x0 -= 1;
        }
        let mut x1 = x;
        while x1 + 1 < width && open(raw, width, x1 + 1, y) {
            x1 += 1;
        }

        // Fill the span.
        for cx in x0..=x1 {
            let off = (y * width + cx) * 4;
            raw[off] = fill[0];
            raw[off + 1] = fill[1];
            raw[off + 2] = fill[2];
            raw[off + 3] = fill[3];
        }

        // Queue one seed per maximal open run in the rows above and below.
        for ny in [y.wrapping_sub(1), y + 1] {
            if ny >= height {
                continue; // y == 0 wraps to usize::MAX, also caught here
            }
            let mut cx = x0;
            while cx <= x1 {
                if open(raw, width, cx, ny) {
                    stack.push((cx, ny));
                    // Skip the rest of this contiguous run.
                    while cx <= x1 && open(raw, width, cx, ny) {
                        cx += 1;
                    }
                } else {
                    cx += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::stroke::is_selected;

    /// Closed square stroke per the containment property: side 100 centered
    /// in a 500×500 mask, stroke width well below the interior size.
    fn square_points() -> Vec<(f32, f32)> {
        vec![
            (200.0, 200.0),
            (300.0, 200.0),
            (300.0, 300.0),
            (200.0, 300.0),
            (200.0, 200.0),
        ]
    }

    #[test]
    fn fill_contains_square_interior() {
        let mut mask = RgbaImage::new(500, 500);
        fill_enclosed_area(&mut mask, &square_points(), 10.0, 153);

        // Every pixel strictly inside the outline is selected.
        for y in (210..290).step_by(7) {
            for x in (210..290).step_by(7) {
                assert!(is_selected(&mask, x, y), "interior hole at ({}, {})", x, y);
            }
        }
        // Everything beyond the stroke width stays clear.
        for &(x, y) in &[(180, 250), (320, 250), (250, 180), (250, 320), (0, 0), (499, 499)] {
            assert!(!is_selected(&mask, x, y), "leak at ({}, {})", x, y);
        }
    }

    #[test]
    fn fill_skips_painted_seed() {
        let mut mask = RgbaImage::new(100, 100);
        // Pre-paint the centroid area so the seed lands on selected pixels.
        stroke::stamp_disc(&mut mask, 50.0, 50.0, 30.0, 200, stroke::BrushMode::Paint);
        let before_corner = mask.get_pixel(5, 5).0;
        fill_enclosed_area(&mut mask, &square_points_small(), 4.0, 200);
        // Interior outside the pre-painted disc must remain untouched: the
        // fill step was skipped, only the outline was stroked.
        assert_eq!(mask.get_pixel(5, 5).0, before_corner);
        assert!(!is_selected(&mask, 30, 70));
    }

    fn square_points_small() -> Vec<(f32, f32)> {
        vec![(20.0, 20.0), (80.0, 20.0), (80.0, 80.0), (20.0, 80.0)]
    }

    #[test]
    fn degenerate_collinear_stroke_does_not_panic() {
        let mut mask = RgbaImage::new(64, 64);
        fill_enclosed_area(&mut mask, &[(10.0, 32.0), (30.0, 32.0), (50.0, 32.0)], 6.0, 153);
        // The centroid lands on the stroked line itself, so nothing fills,
        // but the outline pixels are present.
        assert!(is_selected(&mask, 30, 32));
        assert!(!is_selected(&mask, 30, 10));
    }

    #[test]
    fn single_point_stroke_is_harmless() {
        let mut mask = RgbaImage::new(64, 64);
        fill_enclosed_area(&mut mask, &[(32.0, 32.0)], 6.0, 153);
        assert!(is_selected(&mask, 32, 32));
    }

    #[test]
    fn fill_region_may_touch_buffer_edge() {
        // An open "cup" against the top edge: the fill escapes the cup and
        // floods everything open, stopping naturally at the buffer bounds.
        let mut mask = RgbaImage::new(50, 50);
        scanline_fill(&mut mask, 25, 25, 200);
        assert!(is_selected(&mask, 0, 0));
        assert!(is_selected(&mask, 49, 49));
    }

    #[test]
    fn threshold_level_alpha_terminates_without_filling() {
        // Filling at the detection threshold would never mark pixels as
        // painted; the fill must bail out instead of spinning.
        let mut mask = RgbaImage::new(16, 16);
        scanline_fill(&mut mask, 8, 8, ALPHA_SELECTED_THRESHOLD);
        assert!(mask.pixels().all(|p| p.0[3] == 0));

        scanline_fill(&mut mask, 8, 8, 0);
        assert!(mask.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn seed_outside_buffer_is_noop() {
        let mut mask = RgbaImage::new(10, 10);
        scanline_fill(&mut mask, 100, 100, 200);
        assert!(mask.pixels().all(|p| p.0[3] == 0));
    }
}
