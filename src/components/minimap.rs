//! Mini-map — a proportional overview of the image with the visible viewport
//! region outlined.  Read-only with respect to raster data; clicking or
//! dragging inside it re-centers the viewport on the chosen image point.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, TextureHandle, Vec2};

use crate::canvas::MaskCanvas;

/// Longest edge of the minimap in screen points.
const MINIMAP_MAX_EDGE: f32 = 180.0;
/// Gap between the minimap and the canvas corner.
const MARGIN: f32 = 12.0;

/// Draw the minimap in the bottom-right corner of `canvas_rect` and handle
/// click/drag-to-pan.  Returns `true` when the viewport was moved.
pub fn show(
    ui: &mut egui::Ui,
    canvas: &mut MaskCanvas,
    base_tex: &TextureHandle,
    canvas_rect: Rect,
) -> bool {
    let iw = canvas.width() as f32;
    let ih = canvas.height() as f32;
    if iw <= 0.0 || ih <= 0.0 {
        return false;
    }

    let scale = (MINIMAP_MAX_EDGE / iw).min(MINIMAP_MAX_EDGE / ih);
    let size = Vec2::new(iw * scale, ih * scale);
    let rect = Rect::from_min_size(
        Pos2::new(
            canvas_rect.max.x - size.x - MARGIN,
            canvas_rect.max.y - size.y - MARGIN,
        ),
        size,
    );

    let response = ui.interact(rect, ui.id().with("minimap"), Sense::click_and_drag());
    let painter = ui.painter();
    let uv = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0));

    painter.rect_filled(rect.expand(2.0), 2.0, Color32::from_black_alpha(160));
    painter.image(base_tex.id(), rect, uv, Color32::WHITE);

    // Outline of the image region currently visible in the main viewport.
    let (vx, vy, vw, vh) = canvas.viewport.visible_image_rect(
        canvas_rect.width(),
        canvas_rect.height(),
        canvas.width(),
        canvas.height(),
    );
    let visible = Rect::from_min_size(
        rect.min + Vec2::new(vx * scale, vy * scale),
        Vec2::new(vw * scale, vh * scale),
    );
    painter.rect_stroke(visible, 0.0, Stroke::new(1.5, Color32::WHITE));
    painter.rect_stroke(visible.expand(1.0), 0.0, Stroke::new(1.0, Color32::from_black_alpha(120)));

    if response.clicked() || response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            let ix = (pos.x - rect.min.x) / scale;
            let iy = (pos.y - rect.min.y) / scale;
            canvas
                .viewport
                .center_on(ix, iy, canvas_rect.width(), canvas_rect.height());
            return true;
        }
    }
    false
}
