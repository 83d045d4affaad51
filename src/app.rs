//! The eframe application shell: menus, toolbar, the interactive canvas, and
//! the stamp placement dialog.  All raster work is delegated to [`MaskCanvas`];
//! this module only translates input events and keeps GPU textures in sync
//! with the CPU-side buffers.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use eframe::egui;
use egui::{
    Color32, ColorImage, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions, Vec2,
};
use image::RgbaImage;

use crate::canvas::{MaskCanvas, BRUSH_SIZE_MAX, BRUSH_SIZE_MIN};
use crate::components::minimap;
use crate::io::{self, MaskIoError};
use crate::ops::stamp::Placement;
use crate::ops::stroke::BrushMode;
use crate::viewport::{MAX_ZOOM, MIN_ZOOM};
use crate::{log_err, log_info};

/// Wheel ticks to zoom factor: 100 units of scroll is a 1.5x step.
const SCROLL_ZOOM_RATE: f32 = 0.005;

/// Per-image editor state: the raster session plus its GPU textures.
struct EditorSession {
    canvas: MaskCanvas,
    base_tex: TextureHandle,
    mask_tex: TextureHandle,
    overlay_tex: TextureHandle,
    /// Canvas generation the mask/overlay textures were last uploaded at.
    uploaded_generation: u64,
    /// Canvas panel size last frame, to detect resizes and refit.
    last_container: Vec2,
    source_path: Option<PathBuf>,
}

/// A decoded bitmap waiting for the user to confirm its placement.
struct StampJob {
    image: RgbaImage,
    placement: Placement,
}

pub struct MaskPaintApp {
    session: Option<EditorSession>,
    /// Channel from the background decode thread spawned by "Stamp Object".
    stamp_rx: Option<Receiver<Result<RgbaImage, MaskIoError>>>,
    stamp_job: Option<StampJob>,
    /// Zoom percentage mirrored into the toolbar's drag value.
    zoom_percent: f32,
    status: String,
}

impl MaskPaintApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            session: None,
            stamp_rx: None,
            stamp_job: None,
            zoom_percent: 100.0,
            status: "Open an image to start painting a mask".to_string(),
        }
    }

    // ---- file actions -------------------------------------------------------

    fn open_image_dialog(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
            .pick_file()
        else {
            return;
        };
        match io::load_source_image(&path) {
            Ok(img) => {
                log_info!("Opened {} ({}x{})", path.display(), img.width(), img.height());
                self.status = format!("Loaded {}", path.display());
                self.session = Some(EditorSession::new(ctx, img, Some(path)));
            }
            Err(e) => {
                log_err!("Open failed for {}: {}", path.display(), e);
                self.status = format!("Could not open image: {}", e);
            }
        }
    }

    fn export_mask_dialog(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(binary) = session.canvas.extract_binary_mask() else {
            self.status = "Nothing selected: paint a region before exporting".to_string();
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("mask.png")
            .save_file()
        else {
            return;
        };
        match io::write_mask_png(&binary, &path) {
            Ok(()) => {
                log_info!("Exported binary mask to {}", path.display());
                self.status = format!("Mask saved to {}", path.display());
            }
            Err(e) => {
                log_err!("Mask export failed: {}", e);
                self.status = format!("Export failed: {}", e);
            }
        }
    }

    /// Pick a bitmap and decode it off-thread; the event loop stays live and
    /// polls the channel until the pixels arrive.
    fn stamp_object_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
            .pick_file()
        else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(io::load_source_image(&path));
        });
        self.stamp_rx = Some(rx);
        self.status = "Decoding object image…".to_string();
    }

    fn poll_stamp_decode(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.stamp_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(img)) => {
                self.stamp_rx = None;
                let (cw, ch) = self
                    .session
                    .as_ref()
                    .map(|s| (s.last_container.x, s.last_container.y))
                    .unwrap_or((800.0, 600.0));
                // Default placement: centered, a third of the container wide,
                // preserving the source aspect ratio.
                let w = (cw / 3.0).max(32.0);
                let h = w * img.height() as f32 / img.width() as f32;
                self.stamp_job = Some(StampJob {
                    image: img,
                    placement: Placement {
                        x: (cw - w) / 2.0,
                        y: (ch - h) / 2.0,
                        width: w,
                        height: h,
                        rotation_degrees: 0.0,
                    },
                });
                self.status = "Adjust placement, then stamp".to_string();
            }
            Ok(Err(e)) => {
                self.stamp_rx = None;
                log_err!("Stamp decode failed: {}", e);
                self.status = format!("Could not decode object image: {}", e);
            }
            Err(TryRecvError::Empty) => {
                ctx.request_repaint();
            }
            Err(TryRecvError::Disconnected) => {
                self.stamp_rx = None;
                self.status = "Object decode was interrupted".to_string();
            }
        }
    }

    // ---- chrome -------------------------------------------------------------

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image…").clicked() {
                        ui.close_menu();
                        self.open_image_dialog(ctx);
                    }
                    let can_export = self.session.is_some();
                    if ui
                        .add_enabled(can_export, egui::Button::new("Export Mask…"))
                        .clicked()
                    {
                        ui.close_menu();
                        self.export_mask_dialog();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Mask", |ui| {
                    let enabled = self.session.is_some();
                    if ui
                        .add_enabled(enabled, egui::Button::new("Stamp Object…"))
                        .clicked()
                    {
                        ui.close_menu();
                        self.stamp_object_dialog();
                    }
                    if ui
                        .add_enabled(enabled, egui::Button::new("Clear Mask"))
                        .clicked()
                    {
                        ui.close_menu();
                        if let Some(session) = &mut self.session {
                            session.canvas.clear_mask();
                            self.status = "Mask cleared".to_string();
                        }
                    }
                });
            });
        });
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let Some(session) = &mut self.session else {
                    ui.label("No image loaded");
                    return;
                };
                let canvas = &mut session.canvas;

                ui.selectable_value(&mut canvas.brush.mode, BrushMode::Paint, "Paint");
                ui.selectable_value(&mut canvas.brush.mode, BrushMode::Erase, "Erase");
                ui.separator();

                ui.label("Size");
                ui.add(
                    egui::Slider::new(&mut canvas.brush.size, BRUSH_SIZE_MIN..=BRUSH_SIZE_MAX)
                        .step_by(5.0)
                        .fixed_decimals(0),
                );
                ui.label("Opacity");
                let mut opacity = canvas.brush.opacity;
                if ui
                    .add(egui::Slider::new(&mut opacity, 0.05..=1.0).fixed_decimals(2))
                    .changed()
                {
                    canvas.set_mask_opacity(opacity);
                }
                ui.separator();

                ui.label("Zoom");
                self.zoom_percent = canvas.viewport.scale * 100.0;
                let resp = ui.add(
                    egui::DragValue::new(&mut self.zoom_percent)
                        .clamp_range(MIN_ZOOM * 100.0..=MAX_ZOOM * 100.0)
                        .suffix("%")
                        .speed(1.0),
                );
                if resp.changed() {
                    canvas.zoom_to_level(
                        self.zoom_percent,
                        session.last_container.x,
                        session.last_container.y,
                    );
                }
                if ui.button("Fit").clicked() {
                    canvas.fit_to_container(session.last_container.x, session.last_container.y);
                }
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(session) = &self.session {
                        ui.label(format!(
                            "{}×{} px  |  {:.0}%",
                            session.canvas.width(),
                            session.canvas.height(),
                            session.canvas.viewport.scale * 100.0
                        ));
                        if let Some(name) = session
                            .source_path
                            .as_ref()
                            .and_then(|p| p.file_name())
                            .and_then(|n| n.to_str())
                        {
                            ui.separator();
                            ui.label(name);
                        }
                    }
                });
            });
        });
    }

    /// Modal-ish placement window for a pending stamp.
    fn show_stamp_window(&mut self, ctx: &egui::Context) {
        let Some(job) = &mut self.stamp_job else {
            return;
        };
        let mut do_stamp = false;
        let mut cancel = false;
        egui::Window::new("Stamp Object")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("stamp_grid").num_columns(2).show(ui, |ui| {
                    ui.label("X");
                    ui.add(egui::DragValue::new(&mut job.placement.x).speed(1.0));
                    ui.end_row();
                    ui.label("Y");
                    ui.add(egui::DragValue::new(&mut job.placement.y).speed(1.0));
                    ui.end_row();
                    ui.label("Width");
                    ui.add(
                        egui::DragValue::new(&mut job.placement.width)
                            .clamp_range(1.0..=8192.0)
                            .speed(1.0),
                    );
                    ui.end_row();
                    ui.label("Height");
                    ui.add(
                        egui::DragValue::new(&mut job.placement.height)
                            .clamp_range(1.0..=8192.0)
                            .speed(1.0),
                    );
                    ui.end_row();
                    ui.label("Rotation");
                    ui.add(
                        egui::DragValue::new(&mut job.placement.rotation_degrees)
                            .clamp_range(-360.0..=360.0)
                            .suffix("°")
                            .speed(1.0),
                    );
                    ui.end_row();
                });
                ui.horizontal(|ui| {
                    if ui.button("Stamp").clicked() {
                        do_stamp = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if do_stamp {
            if let (Some(job), Some(session)) = (self.stamp_job.take(), self.session.as_mut()) {
                session.canvas.stamp(&job.image, &job.placement);
                log_info!(
                    "Stamped object at ({:.0},{:.0}) {}x{} rot {:.0}",
                    job.placement.x,
                    job.placement.y,
                    job.placement.width,
                    job.placement.height,
                    job.placement.rotation_degrees
                );
                self.status = "Object silhouette stamped into the mask".to_string();
            }
        } else if cancel {
            self.stamp_job = None;
            self.status = "Stamp cancelled".to_string();
        }
    }

    // ---- canvas -------------------------------------------------------------

    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &mut self.session else {
                ui.centered_and_justified(|ui| {
                    ui.label("File ▸ Open Image…  to load a source image");
                });
                return;
            };

            let (response, painter) =
                ui.allocate_painter(ui.available_size(), Sense::click_and_drag().union(Sense::hover()));
            let rect = response.rect;

            session.canvas.viewport.display_ratio = ctx.pixels_per_point();

            // Refit when the panel first appears or is resized.
            if session.last_container != rect.size() {
                session.last_container = rect.size();
                session.canvas.fit_to_container(rect.width(), rect.height());
            }

            session.sync_textures(ctx);

            // Image rectangle in screen space.
            let canvas = &mut session.canvas;
            let (x0, y0) = canvas.viewport.image_to_screen(0.0, 0.0);
            let (x1, y1) = canvas
                .viewport
                .image_to_screen(canvas.width() as f32, canvas.height() as f32);
            let image_rect = Rect::from_min_max(
                rect.min + Vec2::new(x0, y0),
                rect.min + Vec2::new(x1, y1),
            );
            let uv = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0));

            painter.rect_filled(rect, 0.0, Color32::from_gray(28));
            painter.image(session.base_tex.id(), image_rect, uv, Color32::WHITE);
            painter.image(session.mask_tex.id(), image_rect, uv, Color32::WHITE);
            painter.image(session.overlay_tex.id(), image_rect, uv, Color32::WHITE);

            let space_down = ui.input(|i| i.key_down(egui::Key::Space));
            let panning = response.dragged_by(egui::PointerButton::Middle)
                || response.dragged_by(egui::PointerButton::Secondary)
                || (space_down && response.dragged_by(egui::PointerButton::Primary));

            // Wheel zoom, anchored under the pointer.
            if response.hovered() {
                let scroll = ui.input(|i| i.scroll_delta.y);
                if scroll != 0.0 {
                    if let Some(pos) = response.hover_pos() {
                        let local = pos - rect.min;
                        canvas.zoom_at(local.x, local.y, 1.0 + scroll * SCROLL_ZOOM_RATE);
                    }
                }
            }

            if panning {
                let d = response.drag_delta();
                canvas.pan_by(d.x, d.y);
            } else {
                // Painting with the primary button.
                if response.drag_started_by(egui::PointerButton::Primary) && !space_down {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let local = pos - rect.min;
                        canvas.begin_stroke(canvas.screen_to_image(local.x, local.y));
                    }
                } else if response.dragged_by(egui::PointerButton::Primary) && canvas.stroke_active()
                {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let local = pos - rect.min;
                        canvas.extend_stroke(canvas.screen_to_image(local.x, local.y));
                    }
                }
                if response.clicked() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let local = pos - rect.min;
                        canvas.begin_stroke(canvas.screen_to_image(local.x, local.y));
                        canvas.end_stroke();
                    }
                }
            }
            if response.drag_released() {
                canvas.end_stroke();
            }
            // Pointer left the window mid-stroke: finalize rather than leaving
            // the stroke dangling.
            if canvas.stroke_active() && !ui.input(|i| i.pointer.any_down()) {
                canvas.end_stroke();
            }

            // Bracket keys step the brush size.
            ui.input(|i| {
                for event in &i.events {
                    if let egui::Event::Text(t) = event {
                        match t.as_str() {
                            "[" => canvas.adjust_brush_size(-1),
                            "]" => canvas.adjust_brush_size(1),
                            _ => {}
                        }
                    }
                }
            });

            // Brush outline preview at the pointer.
            if response.hovered() && !panning {
                if let Some(pos) = response.hover_pos() {
                    let radius = canvas.brush.size / 2.0 * canvas.viewport.scale
                        / canvas.viewport.display_ratio;
                    painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::WHITE));
                    painter.circle_stroke(
                        pos,
                        radius + 1.0,
                        Stroke::new(1.0, Color32::from_black_alpha(120)),
                    );
                }
            }

            minimap::show(ui, &mut session.canvas, &session.base_tex, rect);
        });
    }
}

impl EditorSession {
    fn new(ctx: &egui::Context, base: RgbaImage, source_path: Option<PathBuf>) -> Self {
        let canvas = MaskCanvas::new(base);
        let size = [canvas.width() as usize, canvas.height() as usize];
        let base_tex = ctx.load_texture(
            "base_image",
            ColorImage::from_rgba_unmultiplied(size, canvas.base().as_raw()),
            TextureOptions::LINEAR,
        );
        let mask_tex = ctx.load_texture(
            "mask_layer",
            ColorImage::from_rgba_unmultiplied(size, canvas.mask().as_raw()),
            TextureOptions::LINEAR,
        );
        let overlay_tex = ctx.load_texture(
            "overlay_layer",
            ColorImage::from_rgba_unmultiplied(size, canvas.overlay().as_raw()),
            TextureOptions::LINEAR,
        );
        Self {
            canvas,
            base_tex,
            mask_tex,
            overlay_tex,
            uploaded_generation: 0,
            // Zero forces a fit on the first canvas frame.
            last_container: Vec2::ZERO,
            source_path,
        }
    }

    /// Re-upload mask and overlay textures when the canvas has mutated since
    /// the last upload.  The base never changes after load.
    fn sync_textures(&mut self, ctx: &egui::Context) {
        if self.canvas.generation() == self.uploaded_generation {
            return;
        }
        let size = [self.canvas.width() as usize, self.canvas.height() as usize];
        self.mask_tex = ctx.load_texture(
            "mask_layer",
            ColorImage::from_rgba_unmultiplied(size, self.canvas.mask().as_raw()),
            TextureOptions::LINEAR,
        );
        self.overlay_tex = ctx.load_texture(
            "overlay_layer",
            ColorImage::from_rgba_unmultiplied(size, self.canvas.overlay().as_raw()),
            TextureOptions::LINEAR,
        );
        self.uploaded_generation = self.canvas.generation();
    }
}

impl eframe::App for MaskPaintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_stamp_decode(ctx);
        self.show_menu_bar(ctx);
        self.show_toolbar(ctx);
        self.show_status_bar(ctx);
        self.show_canvas(ctx);
        self.show_stamp_window(ctx);
    }
}
