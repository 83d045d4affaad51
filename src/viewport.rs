//! Pan/zoom coordinate system mapping the fixed-resolution image buffers to a
//! variable-size on-screen container.
//!
//! Two scale factors compound in every conversion: the display-to-buffer ratio
//! (HiDPI point scaling of the rendering surface, independent of user zoom)
//! and the user-controlled zoom `scale`.  Pointer positions arrive in display
//! points; image coordinates are native buffer pixels.

/// Minimum user zoom (20%).
pub const MIN_ZOOM: f32 = 0.2;
/// Maximum user zoom (500%).
pub const MAX_ZOOM: f32 = 5.0;
/// Fit-to-container leaves a 5% margin around the image.
pub const FIT_MARGIN: f32 = 0.95;

/// Affine (scale + translate) mapping between screen space and image space.
///
/// Image-space point `(ix, iy)` appears on screen at
/// `((ix * scale + offset_x) / display_ratio, …)`.
#[derive(Clone, Copy, Debug)]
pub struct ViewportTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Buffer pixels per display point (1.0 on standard-DPI surfaces).
    pub display_ratio: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            display_ratio: 1.0,
        }
    }
}

impl ViewportTransform {
    /// Convert a screen-space point (display points) to image-space pixels.
    pub fn screen_to_image(&self, px: f32, py: f32) -> (f32, f32) {
        let bx = px * self.display_ratio;
        let by = py * self.display_ratio;
        (
            (bx - self.offset_x) / self.scale,
            (by - self.offset_y) / self.scale,
        )
    }

    /// Convert an image-space point to screen space.  Inverse of
    /// [`screen_to_image`](Self::screen_to_image).
    pub fn image_to_screen(&self, ix: f32, iy: f32) -> (f32, f32) {
        (
            (ix * self.scale + self.offset_x) / self.display_ratio,
            (iy * self.scale + self.offset_y) / self.display_ratio,
        )
    }

    /// Zoom while keeping the image point under `anchor` (screen space) fixed.
    ///
    /// `new_offset = anchor - (anchor - old_offset) * (new_scale / old_scale)`
    /// with the anchor expressed in buffer pixels.
    pub fn zoom_at(&mut self, anchor_x: f32, anchor_y: f32, factor: f32) {
        let old_scale = self.scale;
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let actual = self.scale / old_scale;
        let ax = anchor_x * self.display_ratio;
        let ay = anchor_y * self.display_ratio;
        self.offset_x = ax - (ax - self.offset_x) * actual;
        self.offset_y = ay - (ay - self.offset_y) * actual;
    }

    /// Set an explicit zoom percentage (e.g. 100 for 1:1), anchored at the
    /// container center.  The percentage is clamped to `[20, 500]`.
    pub fn zoom_to_level(&mut self, percent: f32, container_w: f32, container_h: f32) {
        if container_w <= 0.0 || container_h <= 0.0 {
            return;
        }
        let target = (percent / 100.0).clamp(MIN_ZOOM, MAX_ZOOM);
        let factor = target / self.scale;
        self.zoom_at(container_w / 2.0, container_h / 2.0, factor);
    }

    /// Translate the view by a screen-space delta.  Unconstrained — the image
    /// may be panned fully off-screen.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset_x += dx * self.display_ratio;
        self.offset_y += dy * self.display_ratio;
    }

    /// Scale the image to fit the container with a 5% margin and center it.
    /// Called on image load and whenever the container resizes.
    /// Zero-sized container or image is a silent no-op.
    pub fn fit_to_container(&mut self, container_w: f32, container_h: f32, image_w: u32, image_h: u32) {
        if container_w <= 0.0 || container_h <= 0.0 || image_w == 0 || image_h == 0 {
            return;
        }
        let cw = container_w * self.display_ratio;
        let ch = container_h * self.display_ratio;
        let fit = (cw / image_w as f32).min(ch / image_h as f32) * FIT_MARGIN;
        self.scale = fit.clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset_x = (cw - image_w as f32 * self.scale) / 2.0;
        self.offset_y = (ch - image_h as f32 * self.scale) / 2.0;
    }

    /// Image-space rectangle currently visible in a `container_w × container_h`
    /// container, clamped to the image bounds.  Used by the minimap.
    pub fn visible_image_rect(
        &self,
        container_w: f32,
        container_h: f32,
        image_w: u32,
        image_h: u32,
    ) -> (f32, f32, f32, f32) {
        let (x0, y0) = self.screen_to_image(0.0, 0.0);
        let (x1, y1) = self.screen_to_image(container_w, container_h);
        let x0 = x0.clamp(0.0, image_w as f32);
        let y0 = y0.clamp(0.0, image_h as f32);
        let x1 = x1.clamp(0.0, image_w as f32);
        let y1 = y1.clamp(0.0, image_h as f32);
        (x0, y0, x1 - x0, y1 - y0)
    }

    /// Re-center the view on an image-space point (minimap click-to-pan).
    pub fn center_on(&mut self, ix: f32, iy: f32, container_w: f32, container_h: f32) {
        let cw = container_w * self.display_ratio;
        let ch = container_h * self.display_ratio;
        self.offset_x = cw / 2.0 - ix * self.scale;
        self.offset_y = ch / 2.0 - iy * self.scale;
    }
}
