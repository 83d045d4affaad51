//! maskpaint — an interactive mask-painting engine for region-constrained
//! generative edits.
//!
//! The user loads a source image, paints a translucent selection mask with a
//! round brush (closed freehand loops are flood-filled), optionally stamps the
//! silhouette of another bitmap into the mask, and exports a binary
//! black/white mask at the image's native resolution.
//!
//! The crate is split between the raster engine (`canvas`, `viewport`, `ops`),
//! which is fully headless and exercised by the CLI trace replay, and the
//! egui shell (`app`, `components`) that drives it interactively.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod logger;
pub mod ops;
pub mod viewport;

pub use canvas::MaskCanvas;
