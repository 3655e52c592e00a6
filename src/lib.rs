//! Renders terminal particle animations into looping GIFs and annotated stills.
//!
//! Data flows catalog -> [`simulation`] -> [`grid::Grid`] -> [`compositor`] ->
//! [`canvas::Canvas`] -> [`quantize`] -> [`encoding`].

pub mod builtin_font_data;
pub mod canvas;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod encoding;
pub mod error_codes;
pub mod grid;
pub mod hashing;
pub mod model;
pub mod models;
pub mod painter;
pub mod palette;
pub mod pipeline;
pub mod quantize;
pub mod simulation;
pub mod style;
