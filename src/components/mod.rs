//! Reusable UI widgets for the editor shell.

pub mod minimap;
