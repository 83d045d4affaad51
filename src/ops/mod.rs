//! Raster operations on the mask layer.

pub mod extract;
pub mod fill;
pub mod stamp;
pub mod stroke;
