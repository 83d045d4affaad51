//! Affine object stamping: rasterize an external bitmap's silhouette into the
//! mask layer as a new filled selection region.
//!
//! The placement arrives in screen/viewport coordinates from the placement UI
//! and is converted to image space with the viewport transform that is current
//! at stamp time — the viewport may have moved since the placement was shown,
//! so the placement is never stored in image space.

use image::RgbaImage;

use crate::canvas::mask_pixel;
use crate::viewport::ViewportTransform;

/// Target placement of a stamped object, in screen-space pixels.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation_degrees: f32,
}

/// Rasterize `source`'s silhouette into `mask` at `placement`.
///
/// The placement rectangle is converted to image space (x/y offset-shifted
/// and scaled, width/height scaled only), the bitmap is sampled rotated about
/// the rectangle center, and every source pixel with non-zero alpha writes the
/// fixed selection color at `round(255 × opacity)`.  Composites source-over
/// with the existing selection; prior selection is preserved.
pub fn stamp_silhouette(
    mask: &mut RgbaImage,
    source: &RgbaImage,
    placement: &Placement,
    opacity: f32,
    viewport: &ViewportTransform,
) {
    let mask_w = mask.width();
    let mask_h = mask.height();
    let src_w = source.width();
    let src_h = source.height();
    if mask_w == 0 || mask_h == 0 || src_w == 0 || src_h == 0 {
        return;
    }

    // Screen → image: position through the full transform, extent by the
    // compounded scale only.
    let (ix, iy) = viewport.screen_to_image(placement.x, placement.y);
    let iw = placement.width * viewport.display_ratio / viewport.scale;
    let ih = placement.height * viewport.display_ratio / viewport.scale;
    if iw <= 0.0 || ih <= 0.0 {
        return;
    }

    let cx = ix + iw / 2.0;
    let cy = iy + ih / 2.0;
    let theta = placement.rotation_degrees.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    // Bounding box of the rotated rectangle, clamped to the mask.
    let half_w = iw / 2.0;
    let half_h = ih / 2.0;
    let ext_x = half_w * cos_t.abs() + half_h * sin_t.abs();
    let ext_y = half_w * sin_t.abs() + half_h * cos_t.abs();
    let min_x = (cx - ext_x).floor().max(0.0) as u32;
    let min_y = (cy - ext_y).floor().max(0.0) as u32;
    let max_x = ((cx + ext_x).ceil() as u32).min(mask_w.saturating_sub(1));
    let max_y = ((cy + ext_y).ceil() as u32).min(mask_h.saturating_sub(1));
    if min_x > max_x || min_y > max_y || (cx + ext_x) < 0.0 || (cy + ext_y) < 0.0 {
        return;
    }

    let alpha = (255.0 * opacity.clamp(0.0, 1.0)).round() as u8;
    let fill = mask_pixel(alpha);
    let stride = mask_w as usize * 4;
    let raw = mask.as_mut();
    let src_raw = source.as_raw();
    let src_stride = src_w as usize * 4;

    for y in min_y..=max_y {
        let py = y as f32 + 0.5 - cy;
        let row = y as usize * stride;
        for x in min_x..=max_x {
            let px = x as f32 + 0.5 - cx;
            // Inverse-rotate the destination pixel into the unrotated
            // placement rectangle's local frame.
            let lx = px * cos_t + py * sin_t + half_w;
            let ly = -px * sin_t + py * cos_t + half_h;
            if lx < 0.0 || ly < 0.0 || lx >= iw || ly >= ih {
                continue;
            }
            // Nearest-neighbor sample of the source bitmap.
            let sx = ((lx / iw * src_w as f32) as u32).min(src_w - 1);
            let sy = ((ly / ih * src_h as f32) as u32).min(src_h - 1);
            if src_raw[(sy as usize * src_stride) + sx as usize * 4 + 3] == 0 {
                continue;
            }
            let off = row + x as usize * 4;
            if raw[off + 3] < alpha {
                raw[off] = fill[0];
                raw[off + 1] = fill[1];
                raw[off + 2] = fill[2];
                raw[off + 3] = fill[3];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::SELECTION_COLOR;
    use crate::ops::stroke::is_selected;

    fn opaque_square(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, image::Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn unrotated_stamp_matches_placement_bounds() {
        let mut mask = RgbaImage::new(400, 300);
        let vp = ViewportTransform {
            scale: 2.0,
            offset_x: 40.0,
            offset_y: 20.0,
            display_ratio: 1.0,
        };
        // Screen rect (140, 120, 100×60) → image rect (50, 50, 50×30).
        let placement = Placement {
            x: 140.0,
            y: 120.0,
            width: 100.0,
            height: 60.0,
            rotation_degrees: 0.0,
        };
        stamp_silhouette(&mut mask, &opaque_square(16), &placement, 0.6, &vp);

        // Inside the expected image-space rectangle (1px rounding tolerance).
        for &(x, y) in &[(51, 51), (98, 51), (51, 78), (98, 78), (75, 65)] {
            assert!(is_selected(&mask, x, y), "hole at ({}, {})", x, y);
        }
        // Outside it.
        for &(x, y) in &[(48, 65), (102, 65), (75, 48), (75, 82)] {
            assert!(!is_selected(&mask, x, y), "spill at ({}, {})", x, y);
        }
        // Silhouette uses the selection color at the requested opacity, not
        // the source bitmap's own colors.
        let px = mask.get_pixel(75, 65).0;
        assert_eq!(&px[..3], &SELECTION_COLOR);
        assert_eq!(px[3], 153); // round(255 * 0.6)
    }

    #[test]
    fn transparent_source_pixels_are_skipped() {
        let mut src = RgbaImage::new(10, 10);
        // Only the left half of the bitmap is opaque.
        for y in 0..10 {
            for x in 0..5 {
                src.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
            }
        }
        let mut mask = RgbaImage::new(100, 100);
        let placement = Placement {
            x: 20.0,
            y: 20.0,
            width: 40.0,
            height: 40.0,
            rotation_degrees: 0.0,
        };
        stamp_silhouette(&mut mask, &src, &placement, 1.0, &ViewportTransform::default());
        assert!(is_selected(&mask, 25, 40)); // opaque half
        assert!(!is_selected(&mask, 55, 40)); // transparent half
    }

    #[test]
    fn rotated_stamp_covers_center_and_respects_corners() {
        let mut mask = RgbaImage::new(200, 200);
        let placement = Placement {
            x: 60.0,
            y: 60.0,
            width: 80.0,
            height: 80.0,
            rotation_degrees: 45.0,
        };
        stamp_silhouette(&mut mask, &opaque_square(8), &placement, 0.8, &ViewportTransform::default());
        // Center always covered.
        assert!(is_selected(&mask, 100, 100));
        // Axis-aligned corners of the unrotated rect fall outside a 45° square.
        assert!(!is_selected(&mask, 62, 62));
        assert!(!is_selected(&mask, 138, 138));
        // Rotated corners extend past the unrotated edges along the axes.
        assert!(is_selected(&mask, 100, 50));
    }

    #[test]
    fn stamp_adds_to_existing_selection() {
        let mut mask = RgbaImage::new(100, 100);
        crate::ops::stroke::stamp_disc(&mut mask, 15.0, 15.0, 10.0, 200, crate::ops::stroke::BrushMode::Paint);
        let placement = Placement {
            x: 60.0,
            y: 60.0,
            width: 20.0,
            height: 20.0,
            rotation_degrees: 0.0,
        };
        stamp_silhouette(&mut mask, &opaque_square(4), &placement, 0.7, &ViewportTransform::default());
        assert!(is_selected(&mask, 15, 15)); // prior selection intact
        assert!(is_selected(&mask, 70, 70)); // new region added
    }
}
