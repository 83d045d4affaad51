//! Freehand stroke rasterization into the mask layer.
//!
//! A stroke is an ordered sequence of image-space sample points captured
//! between pointer-down and pointer-up.  Each new sample draws a round-capped
//! segment from the previous point by stamping filled discs at sub-pixel
//! steps along the segment — round joins fall out of the disc stamping.

use image::RgbaImage;

use crate::canvas::{mask_pixel, ALPHA_SELECTED_THRESHOLD};

/// Strokes whose start and end points are closer than this (image pixels)
/// are treated as closed loops and flood-filled.
pub const LOOP_CLOSE_DISTANCE: f32 = 40.0;

/// Minimum number of sample points before loop closure is considered.
pub const LOOP_MIN_POINTS: usize = 3;

/// How stroke pixels composite with the existing mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushMode {
    /// Write the selection color at the mask opacity (source-over, capped at
    /// the brush alpha so overlapping stamps never stack darker).
    #[default]
    Paint,
    /// Zero out every touched pixel (destination-out at full strength).
    Erase,
}

/// An in-progress pointer drag.  Ephemeral — discarded after rasterization.
#[derive(Debug, Default)]
pub struct StrokeState {
    points: Vec<(f32, f32)>,
}

impl StrokeState {
    pub fn new(start: (f32, f32)) -> Self {
        Self { points: vec![start] }
    }

    pub fn push(&mut self, pt: (f32, f32)) {
        self.points.push(pt);
    }

    pub fn last(&self) -> Option<(f32, f32)> {
        self.points.last().copied()
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f32, f32)> {
        self.points
    }

    /// Loop-closure heuristic: > 3 points and start/end within
    /// [`LOOP_CLOSE_DISTANCE`].  Intentionally insensitive to path length or
    /// self-intersections — only start/end proximity matters.
    pub fn is_closed_loop(&self) -> bool {
        if self.points.len() <= LOOP_MIN_POINTS {
            return false;
        }
        let (x0, y0) = self.points[0];
        let (x1, y1) = self.points[self.points.len() - 1];
        let dx = x1 - x0;
        let dy = y1 - y0;
        (dx * dx + dy * dy).sqrt() < LOOP_CLOSE_DISTANCE
    }
}

/// Stamp a filled disc of diameter `brush_size` centered at `(cx, cy)`.
///
/// Paint mode writes the selection color at `alpha`, but only where the
/// existing pixel is more transparent — repeated strokes over the same spot
/// stay at the brush opacity instead of accumulating.  Erase zeroes pixels.
pub fn stamp_disc(mask: &mut RgbaImage, cx: f32, cy: f32, brush_size: f32, alpha: u8, mode: BrushMode) {
    let width = mask.width();
    let height = mask.height();
    if width == 0 || height == 0 {
        return;
    }
    let radius = brush_size / 2.0;
    let radius_sq = radius * radius;
    if radius_sq < 0.001 {
        return;
    }

    let min_x = (cx - radius).max(0.0) as u32;
    let max_x = ((cx + radius) as u32).min(width.saturating_sub(1));
    let min_y = (cy - radius).max(0.0) as u32;
    let max_y = ((cy + radius) as u32).min(height.saturating_sub(1));
    if min_x > max_x || min_y > max_y || (cx + radius) < 0.0 || (cy + radius) < 0.0 {
        return;
    }

    let stride = width as usize * 4;
    let raw = mask.as_mut();

    for y in min_y..=max_y {
        let dy = y as f32 + 0.5 - cy;
        let row = y as usize * stride;
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - cx;
            if dx * dx + dy * dy > radius_sq {
                continue;
            }
            let off = row + x as usize * 4;
            match mode {
                BrushMode::Paint => {
                    if raw[off + 3] < alpha {
                        let px = mask_pixel(alpha);
                        raw[off] = px[0];
                        raw[off + 1] = px[1];
                        raw[off + 2] = px[2];
                        raw[off + 3] = px[3];
                    }
                }
                BrushMode::Erase => {
                    raw[off] = 0;
                    raw[off + 1] = 0;
                    raw[off + 2] = 0;
                    raw[off + 3] = 0;
                }
            }
        }
    }
}

/// Draw a round-capped segment from `start` to `end` by dense disc stepping
/// (one stamp per pixel of distance, plus both endpoints).
pub fn draw_segment(
    mask: &mut RgbaImage,
    start: (f32, f32),
    end: (f32, f32),
    brush_size: f32,
    alpha: u8,
    mode: BrushMode,
) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.1 {
        stamp_disc(mask, start.0, start.1, brush_size, alpha, mode);
        return;
    }

    let steps = distance.ceil() as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp_disc(mask, start.0 + dx * t, start.1 + dy * t, brush_size, alpha, mode);
    }
}

/// Stroke a closed polyline through `points` (implicit closing segment from
/// last back to first).  Used to rasterize the loop outline before filling.
pub fn draw_closed_polyline(
    mask: &mut RgbaImage,
    points: &[(f32, f32)],
    brush_size: f32,
    alpha: u8,
) {
    if points.is_empty() {
        return;
    }
    for pair in points.windows(2) {
        draw_segment(mask, pair[0], pair[1], brush_size, alpha, BrushMode::Paint);
    }
    draw_segment(
        mask,
        points[points.len() - 1],
        points[0],
        brush_size,
        alpha,
        BrushMode::Paint,
    );
}

/// True when the pixel at `(x, y)` counts as selected (alpha above the fixed
/// detection threshold).
#[inline]
pub fn is_selected(mask: &RgbaImage, x: u32, y: u32) -> bool {
    x < mask.width() && y < mask.height() && mask.get_pixel(x, y).0[3] > ALPHA_SELECTED_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::new(w, h)
    }

    #[test]
    fn zero_length_segment_draws_single_dot() {
        let mut mask = blank(64, 64);
        draw_segment(&mut mask, (32.0, 32.0), (32.0, 32.0), 10.0, 153, BrushMode::Paint);
        assert!(is_selected(&mask, 32, 32));
        // Nothing outside the disc radius.
        assert!(!is_selected(&mask, 32, 40));
        assert!(!is_selected(&mask, 0, 0));
    }

    #[test]
    fn segment_connects_endpoints() {
        let mut mask = blank(128, 64);
        draw_segment(&mut mask, (10.0, 30.0), (110.0, 30.0), 8.0, 153, BrushMode::Paint);
        for x in (12..108).step_by(4) {
            assert!(is_selected(&mask, x, 30), "gap at x={}", x);
        }
        assert!(!is_selected(&mask, 60, 50));
    }

    #[test]
    fn paint_does_not_stack_opacity() {
        let mut mask = blank(32, 32);
        stamp_disc(&mut mask, 16.0, 16.0, 10.0, 100, BrushMode::Paint);
        stamp_disc(&mut mask, 16.0, 16.0, 10.0, 100, BrushMode::Paint);
        assert_eq!(mask.get_pixel(16, 16).0[3], 100);
    }

    #[test]
    fn erase_zeroes_pixels() {
        let mut mask = blank(32, 32);
        stamp_disc(&mut mask, 16.0, 16.0, 12.0, 200, BrushMode::Paint);
        assert!(is_selected(&mask, 16, 16));
        stamp_disc(&mut mask, 16.0, 16.0, 12.0, 200, BrushMode::Erase);
        assert_eq!(mask.get_pixel(16, 16).0, [0, 0, 0, 0]);
    }

    #[test]
    fn brush_clips_at_buffer_edges() {
        let mut mask = blank(32, 32);
        // Center far outside the buffer; must not panic and must not touch pixels.
        stamp_disc(&mut mask, -100.0, -100.0, 20.0, 200, BrushMode::Paint);
        assert!(mask.pixels().all(|p| p.0[3] == 0));
        // Partially off-screen disc still paints the in-bounds part.
        stamp_disc(&mut mask, 0.0, 16.0, 10.0, 200, BrushMode::Paint);
        assert!(is_selected(&mask, 1, 16));
    }

    #[test]
    fn zero_size_mask_is_a_silent_noop() {
        let mut empty = blank(0, 0);
        stamp_disc(&mut empty, 5.0, 5.0, 10.0, 200, BrushMode::Paint);
        stamp_disc(&mut empty, 5.0, 5.0, 10.0, 200, BrushMode::Erase);

        let mut flat = blank(16, 0);
        draw_segment(&mut flat, (0.0, 0.0), (10.0, 0.0), 10.0, 200, BrushMode::Paint);

        let mut thin = blank(0, 16);
        draw_closed_polyline(&mut thin, &[(0.0, 0.0), (5.0, 5.0)], 10.0, 200);
    }

    #[test]
    fn loop_closure_requires_proximity_and_points() {
        let mut s = StrokeState::new((0.0, 0.0));
        s.push((100.0, 0.0));
        s.push((100.0, 100.0));
        s.push((5.0, 3.0));
        assert!(s.is_closed_loop());

        let mut open = StrokeState::new((0.0, 0.0));
        open.push((100.0, 0.0));
        open.push((100.0, 100.0));
        open.push((90.0, 90.0));
        assert!(!open.is_closed_loop());

        // Too few points, even though start == end.
        let mut short = StrokeState::new((0.0, 0.0));
        short.push((10.0, 10.0));
        short.push((0.0, 0.0));
        assert!(!short.is_closed_loop());
    }
}
