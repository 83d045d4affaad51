//! Conversion of the painted translucent mask layer into the strict binary
//! black/white image required by the generation API.

use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::ALPHA_SELECTED_THRESHOLD;

/// Fully-opaque white output pixel ("edit here").
const WHITE: [u8; 4] = [255, 255, 255, 255];
/// Fully-opaque black output pixel ("leave untouched").
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Convert the mask layer into an opaque binary image: any pixel with alpha
/// above the detection threshold becomes pure white, everything else pure
/// black.  Returns `None` when no pixel is selected — callers treat that the
/// same as an empty mask and fall back to an unmasked edit.
///
/// Operates on a transient output buffer; the painted mask is never mutated,
/// so the on-screen overlay is visually unchanged after a generation request.
/// Row-parallel with rayon since mask buffers can be multi-megapixel.
pub fn extract_binary_mask(mask: &RgbaImage) -> Option<RgbaImage> {
    let width = mask.width();
    let height = mask.height();
    if width == 0 || height == 0 {
        return None;
    }

    let row_bytes = width as usize * 4;
    let src = mask.as_raw();
    let mut out = vec![0u8; src.len()];

    let any_selected = out
        .par_chunks_mut(row_bytes)
        .zip(src.par_chunks(row_bytes))
        .map(|(dst_row, src_row)| {
            let mut row_has_selection = false;
            for (dst, src_px) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                if src_px[3] > ALPHA_SELECTED_THRESHOLD {
                    dst.copy_from_slice(&WHITE);
                    row_has_selection = true;
                } else {
                    dst.copy_from_slice(&BLACK);
                }
            }
            row_has_selection
        })
        .reduce(|| false, |a, b| a || b);

    if !any_selected {
        return None;
    }

    Some(RgbaImage::from_raw(width, height, out).unwrap_or_else(|| RgbaImage::new(width, height)))
}

/// Cheap dirty-state check: scans only the alpha channel, no copy, no
/// allocation.  `true` iff at least one mask pixel is selected.
pub fn has_selection(mask: &RgbaImage) -> bool {
    mask.as_raw()
        .par_chunks(4)
        .any(|px| px[3] > ALPHA_SELECTED_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::stroke::{stamp_disc, BrushMode};

    #[test]
    fn empty_mask_yields_none_and_no_selection() {
        let mask = RgbaImage::new(320, 240);
        assert!(extract_binary_mask(&mask).is_none());
        assert!(!has_selection(&mask));
    }

    #[test]
    fn threshold_is_strict() {
        let mut mask = RgbaImage::new(8, 8);
        mask.put_pixel(3, 3, image::Rgba([46, 204, 113, ALPHA_SELECTED_THRESHOLD]));
        // Exactly at the threshold does not count.
        assert!(!has_selection(&mask));
        mask.put_pixel(3, 3, image::Rgba([46, 204, 113, ALPHA_SELECTED_THRESHOLD + 1]));
        assert!(has_selection(&mask));
    }

    #[test]
    fn output_is_strictly_binary_and_opaque() {
        let mut mask = RgbaImage::new(100, 80);
        stamp_disc(&mut mask, 50.0, 40.0, 30.0, 90, BrushMode::Paint);
        let binary = extract_binary_mask(&mask).expect("mask has selection");
        assert_eq!(binary.dimensions(), (100, 80));
        for px in binary.pixels() {
            assert!(
                px.0 == [255, 255, 255, 255] || px.0 == [0, 0, 0, 255],
                "non-binary pixel {:?}",
                px.0
            );
        }
        // Disc center white, far corner black.
        assert_eq!(binary.get_pixel(50, 40).0, [255, 255, 255, 255]);
        assert_eq!(binary.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn extraction_does_not_mutate_the_mask() {
        let mut mask = RgbaImage::new(64, 64);
        stamp_disc(&mut mask, 20.0, 20.0, 16.0, 120, BrushMode::Paint);
        let before = mask.clone();
        let _ = extract_binary_mask(&mask);
        assert_eq!(before.as_raw(), mask.as_raw());
    }
}
