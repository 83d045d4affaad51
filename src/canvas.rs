//! Raster surfaces and the mask-editing session.
//!
//! A session owns three same-sized RGBA buffers at the source image's native
//! resolution: the immutable base image, the mutable mask layer the user
//! paints into, and an annotation overlay (detection boxes).  On-screen
//! display size never affects buffer dimensions — the viewport transform maps
//! between the two.  All raster mutation runs synchronously on the event
//! thread; exactly one logical writer touches the mask at a time.

use image::{Rgba, RgbaImage};

use crate::ops::{extract, fill, stamp, stroke};
use crate::viewport::ViewportTransform;

/// RGB of painted mask pixels (green in the UI).
pub const SELECTION_COLOR: [u8; 3] = [46, 204, 113];

/// A mask pixel is "selected" iff its alpha exceeds this.  Used consistently
/// by fill seeding, extraction, and hit-testing.
pub const ALPHA_SELECTED_THRESHOLD: u8 = 10;

/// Brush diameter limits (image pixels) and the keyboard adjustment step.
pub const BRUSH_SIZE_MIN: f32 = 5.0;
pub const BRUSH_SIZE_MAX: f32 = 150.0;
pub const BRUSH_SIZE_STEP: f32 = 5.0;

/// Default translucency of painted mask pixels.
pub const DEFAULT_MASK_OPACITY: f32 = 0.6;

/// Selection-color RGBA value at the given alpha.
#[inline]
pub fn mask_pixel(alpha: u8) -> [u8; 4] {
    [SELECTION_COLOR[0], SELECTION_COLOR[1], SELECTION_COLOR[2], alpha]
}

/// Brush parameters shared by the stroke engine and the flood fill.
#[derive(Clone, Copy, Debug)]
pub struct BrushSettings {
    /// Diameter in image pixels (clamped to `[BRUSH_SIZE_MIN, BRUSH_SIZE_MAX]`).
    pub size: f32,
    pub mode: stroke::BrushMode,
    /// Alpha of painted pixels as a fraction, clamped to `[0.05, 1.0]`.
    pub opacity: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 30.0,
            mode: stroke::BrushMode::Paint,
            opacity: DEFAULT_MASK_OPACITY,
        }
    }
}

impl BrushSettings {
    /// Painted-pixel alpha as a byte.
    pub fn alpha(&self) -> u8 {
        (self.opacity * 255.0).round() as u8
    }
}

/// One mask-editing session over a loaded source image.
///
/// This is the capability set the UI layer holds a handle to: stroke
/// begin/extend/end, extraction, stamping, viewport control.  The UI
/// translates raw input events into these calls and owns nothing raster.
pub struct MaskCanvas {
    base: RgbaImage,
    mask: RgbaImage,
    overlay: RgbaImage,
    pub viewport: ViewportTransform,
    pub brush: BrushSettings,
    active_stroke: Option<stroke::StrokeState>,
    /// Bumped on every mask/overlay mutation so the UI re-uploads textures.
    generation: u64,
}

impl MaskCanvas {
    /// Start a session for a freshly decoded source image.  Mask and overlay
    /// are allocated zeroed at the image's native resolution.
    pub fn new(base: RgbaImage) -> Self {
        let (w, h) = base.dimensions();
        Self {
            base,
            mask: RgbaImage::new(w, h),
            overlay: RgbaImage::new(w, h),
            viewport: ViewportTransform::default(),
            brush: BrushSettings::default(),
            active_stroke: None,
            generation: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn mask(&self) -> &RgbaImage {
        &self.mask
    }

    pub fn overlay(&self) -> &RgbaImage {
        &self.overlay
    }

    /// Monotonic counter the UI compares to know when to re-upload textures.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ---- stroke engine ------------------------------------------------------

    /// Begin a stroke at an image-space point.  If a stroke is somehow still
    /// active (missed pointer-up), it is finalized first so the mask is never
    /// left transiently inconsistent.
    pub fn begin_stroke(&mut self, pt: (f32, f32)) {
        if self.active_stroke.is_some() {
            self.end_stroke();
        }
        stroke::stamp_disc(
            &mut self.mask,
            pt.0,
            pt.1,
            self.brush.size,
            self.brush.alpha(),
            self.brush.mode,
        );
        self.active_stroke = Some(stroke::StrokeState::new(pt));
        self.generation += 1;
    }

    /// Extend the active stroke to a new image-space point, rasterizing the
    /// connecting round-capped segment.  Without an active stroke: no-op.
    pub fn extend_stroke(&mut self, pt: (f32, f32)) {
        let Some(state) = self.active_stroke.as_mut() else {
            return;
        };
        let prev = state.last().unwrap_or(pt);
        state.push(pt);
        stroke::draw_segment(
            &mut self.mask,
            prev,
            pt,
            self.brush.size,
            self.brush.alpha(),
            self.brush.mode,
        );
        self.generation += 1;
    }

    /// Finalize the active stroke.  In paint mode, a stroke whose endpoints
    /// roughly meet is treated as a closed loop and its interior flood-filled.
    pub fn end_stroke(&mut self) {
        let Some(state) = self.active_stroke.take() else {
            return;
        };
        if self.brush.mode == stroke::BrushMode::Paint && state.is_closed_loop() {
            fill::fill_enclosed_area(
                &mut self.mask,
                state.points(),
                self.brush.size,
                self.brush.alpha(),
            );
            self.generation += 1;
        }
    }

    /// True while a pointer drag is being captured.
    pub fn stroke_active(&self) -> bool {
        self.active_stroke.is_some()
    }

    // ---- brush settings -----------------------------------------------------

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush.size = size.clamp(BRUSH_SIZE_MIN, BRUSH_SIZE_MAX);
    }

    /// Adjust the brush by whole steps (the `[` / `]` keys pass ∓1).
    pub fn adjust_brush_size(&mut self, steps: i32) {
        self.set_brush_size(self.brush.size + steps as f32 * BRUSH_SIZE_STEP);
    }

    pub fn set_mask_opacity(&mut self, opacity: f32) {
        self.brush.opacity = opacity.clamp(0.05, 1.0);
    }

    // ---- mask / overlay lifecycle -------------------------------------------

    /// Zero every mask pixel.  Any in-flight stroke is discarded with it.
    pub fn clear_mask(&mut self) {
        self.active_stroke = None;
        for px in self.mask.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.generation += 1;
    }

    pub fn clear_overlay(&mut self) {
        for px in self.overlay.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.generation += 1;
    }

    /// Draw an annotation rectangle outline (e.g. a detection box) onto the
    /// overlay layer.  Overlay pixels never participate in extraction.
    pub fn draw_box(&mut self, min_x: u32, min_y: u32, max_x: u32, max_y: u32, color: Rgba<u8>) {
        let w = self.overlay.width();
        let h = self.overlay.height();
        if w == 0 || h == 0 || min_x > max_x || min_y > max_y || min_x >= w || min_y >= h {
            return;
        }
        let max_x = max_x.min(w - 1);
        let max_y = max_y.min(h - 1);
        for x in min_x..=max_x {
            self.overlay.put_pixel(x, min_y, color);
            self.overlay.put_pixel(x, max_y, color);
        }
        for y in min_y..=max_y {
            self.overlay.put_pixel(min_x, y, color);
            self.overlay.put_pixel(max_x, y, color);
        }
        self.generation += 1;
    }

    // ---- extraction ---------------------------------------------------------

    /// Binary black/white mask for transmission, or `None` when nothing is
    /// selected.  The painted mask itself is left untouched.
    pub fn extract_binary_mask(&self) -> Option<RgbaImage> {
        extract::extract_binary_mask(&self.mask)
    }

    /// Cheap alpha-only dirty check.
    pub fn has_selection(&self) -> bool {
        extract::has_selection(&self.mask)
    }

    // ---- stamping -----------------------------------------------------------

    /// Rasterize a decoded bitmap's silhouette into the mask at a screen-space
    /// placement, converted through the current viewport.  The bitmap must
    /// already be decoded — the app shell performs decode off-thread and calls
    /// this once the pixels are available.
    pub fn stamp(&mut self, source: &RgbaImage, placement: &stamp::Placement) {
        stamp::stamp_silhouette(
            &mut self.mask,
            source,
            placement,
            self.brush.opacity,
            &self.viewport,
        );
        self.generation += 1;
    }

    // ---- viewport passthrough ----------------------------------------------

    pub fn zoom_at(&mut self, anchor_x: f32, anchor_y: f32, factor: f32) {
        self.viewport.zoom_at(anchor_x, anchor_y, factor);
    }

    pub fn zoom_to_level(&mut self, percent: f32, container_w: f32, container_h: f32) {
        self.viewport.zoom_to_level(percent, container_w, container_h);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
    }

    pub fn fit_to_container(&mut self, container_w: f32, container_h: f32) {
        self.viewport
            .fit_to_container(container_w, container_h, self.width(), self.height());
    }

    /// Convert a screen-space pointer position to image space.
    pub fn screen_to_image(&self, px: f32, py: f32) -> (f32, f32) {
        self.viewport.screen_to_image(px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::stroke::{is_selected, BrushMode};

    fn canvas(w: u32, h: u32) -> MaskCanvas {
        MaskCanvas::new(RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255])))
    }

    #[test]
    fn surfaces_share_dimensions() {
        let c = canvas(321, 123);
        assert_eq!(c.base().dimensions(), (321, 123));
        assert_eq!(c.mask().dimensions(), (321, 123));
        assert_eq!(c.overlay().dimensions(), (321, 123));
    }

    #[test]
    fn dot_stroke_never_panics_and_marks_at_most_a_dot() {
        let mut c = canvas(64, 64);
        c.begin_stroke((32.0, 32.0));
        c.end_stroke();
        assert!(is_selected(c.mask(), 32, 32));
        assert!(!is_selected(c.mask(), 10, 10));
    }

    #[test]
    fn eraser_removes_painted_selection() {
        let mut c = canvas(100, 100);
        c.begin_stroke((50.0, 50.0));
        c.extend_stroke((60.0, 50.0));
        c.end_stroke();
        assert!(c.has_selection());

        c.brush.mode = BrushMode::Erase;
        c.set_brush_size(150.0);
        c.begin_stroke((50.0, 50.0));
        c.extend_stroke((60.0, 50.0));
        c.end_stroke();
        assert!(!c.has_selection());
    }

    #[test]
    fn closed_loop_fills_interior_on_end() {
        let mut c = canvas(300, 300);
        c.set_brush_size(10.0);
        c.begin_stroke((100.0, 100.0));
        c.extend_stroke((200.0, 100.0));
        c.extend_stroke((200.0, 200.0));
        c.extend_stroke((100.0, 200.0));
        c.extend_stroke((103.0, 105.0)); // within the 40px closure threshold
        c.end_stroke();
        assert!(is_selected(c.mask(), 150, 150), "interior not filled");
    }

    #[test]
    fn open_stroke_does_not_fill() {
        let mut c = canvas(300, 300);
        c.set_brush_size(10.0);
        c.begin_stroke((100.0, 100.0));
        c.extend_stroke((200.0, 100.0));
        c.extend_stroke((200.0, 200.0));
        c.extend_stroke((150.0, 200.0));
        c.end_stroke();
        assert!(!is_selected(c.mask(), 150, 150));
    }

    #[test]
    fn eraser_loop_does_not_fill() {
        let mut c = canvas(300, 300);
        c.brush.mode = BrushMode::Erase;
        c.begin_stroke((100.0, 100.0));
        c.extend_stroke((200.0, 100.0));
        c.extend_stroke((200.0, 200.0));
        c.extend_stroke((102.0, 102.0));
        c.end_stroke();
        assert!(!c.has_selection());
    }

    #[test]
    fn begin_while_active_finalizes_previous_stroke() {
        let mut c = canvas(300, 300);
        c.set_brush_size(10.0);
        c.begin_stroke((100.0, 100.0));
        c.extend_stroke((200.0, 100.0));
        c.extend_stroke((200.0, 200.0));
        c.extend_stroke((103.0, 103.0));
        // Pointer-up was missed; the next pointer-down must finalize (and
        // therefore loop-close) the first stroke.
        c.begin_stroke((250.0, 250.0));
        c.end_stroke();
        assert!(is_selected(c.mask(), 150, 150));
    }

    #[test]
    fn zero_size_image_session_never_panics() {
        let mut c = MaskCanvas::new(RgbaImage::new(0, 0));
        c.begin_stroke((5.0, 5.0));
        c.extend_stroke((10.0, 10.0));
        c.end_stroke();
        assert!(!c.has_selection());
        assert!(c.extract_binary_mask().is_none());
    }

    #[test]
    fn brush_size_clamps_and_steps() {
        let mut c = canvas(10, 10);
        c.set_brush_size(1000.0);
        assert_eq!(c.brush.size, BRUSH_SIZE_MAX);
        c.set_brush_size(0.0);
        assert_eq!(c.brush.size, BRUSH_SIZE_MIN);
        c.adjust_brush_size(3);
        assert_eq!(c.brush.size, BRUSH_SIZE_MIN + 3.0 * BRUSH_SIZE_STEP);
        c.adjust_brush_size(-100);
        assert_eq!(c.brush.size, BRUSH_SIZE_MIN);
    }

    #[test]
    fn clear_mask_resets_selection_and_stroke() {
        let mut c = canvas(64, 64);
        c.begin_stroke((32.0, 32.0));
        c.extend_stroke((40.0, 32.0));
        c.clear_mask();
        assert!(!c.has_selection());
        assert!(!c.stroke_active());
    }

    #[test]
    fn overlay_box_does_not_affect_extraction() {
        let mut c = canvas(64, 64);
        c.draw_box(5, 5, 60, 60, Rgba([255, 0, 0, 255]));
        assert!(!c.has_selection());
        assert!(c.extract_binary_mask().is_none());
    }
}
