//! Bitmap input validation/decoding and binary-mask PNG output.
//!
//! Inputs are validated before any raster surface is touched: a rejected file
//! (oversized, unsupported format, undecodable) aborts the load with no
//! partial state.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageFormat, RgbaImage};

/// Maximum accepted encoded-file size (10 MB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Error type for bitmap input and mask output.
#[derive(Debug)]
pub enum MaskIoError {
    Io(std::io::Error),
    /// The container format is not PNG/JPEG/WebP.
    UnsupportedFormat(String),
    /// Encoded file exceeds [`MAX_UPLOAD_BYTES`].
    TooLarge(u64),
    Decode(String),
    Encode(String),
}

impl std::fmt::Display for MaskIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskIoError::Io(e) => write!(f, "I/O error: {}", e),
            MaskIoError::UnsupportedFormat(s) => {
                write!(f, "unsupported image format: {} (PNG, JPEG and WebP are accepted)", s)
            }
            MaskIoError::TooLarge(n) => write!(
                f,
                "file is {:.1} MB, over the {} MB limit",
                *n as f64 / (1024.0 * 1024.0),
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ),
            MaskIoError::Decode(s) => write!(f, "decode error: {}", s),
            MaskIoError::Encode(s) => write!(f, "encode error: {}", s),
        }
    }
}

impl std::error::Error for MaskIoError {}

impl From<std::io::Error> for MaskIoError {
    fn from(e: std::io::Error) -> Self {
        MaskIoError::Io(e)
    }
}

/// Decode an already-read encoded image, enforcing the size cap and the
/// PNG/JPEG/WebP whitelist.  Nothing is allocated at canvas scale unless the
/// input passes validation.
pub fn decode_source_bytes(bytes: &[u8]) -> Result<RgbaImage, MaskIoError> {
    if bytes.len() as u64 > MAX_UPLOAD_BYTES {
        return Err(MaskIoError::TooLarge(bytes.len() as u64));
    }
    let format = image::guess_format(bytes)
        .map_err(|e| MaskIoError::UnsupportedFormat(e.to_string()))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => {}
        other => return Err(MaskIoError::UnsupportedFormat(format!("{:?}", other))),
    }
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MaskIoError::Decode(e.to_string()))?;
    Ok(decoded.into_rgba8())
}

/// Load and validate a source image from disk.  The size cap is checked
/// against file metadata before the file is read.
pub fn load_source_image(path: &Path) -> Result<RgbaImage, MaskIoError> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(MaskIoError::TooLarge(meta.len()));
    }
    let bytes = std::fs::read(path)?;
    decode_source_bytes(&bytes)
}

/// Write a binary mask (or any RGBA buffer) to disk as PNG.
pub fn write_mask_png(mask: &RgbaImage, path: &Path) -> Result<(), MaskIoError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    PngEncoder::new(writer)
        .write_image(mask.as_raw(), mask.width(), mask.height(), image::ColorType::Rgba8)
        .map_err(|e| MaskIoError::Encode(e.to_string()))
}

/// Encode a mask to in-memory PNG bytes — the shape handed to the generation
/// API collaborator ("encoded-bytes equivalent" of `{pixels, width, height}`).
pub fn encode_mask_png(mask: &RgbaImage) -> Result<Vec<u8>, MaskIoError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(mask.as_raw(), mask.width(), mask.height(), image::ColorType::Rgba8)
        .map_err(|e| MaskIoError::Encode(e.to_string()))?;
    Ok(out)
}
