//! View layer: the editing surface contract, its text area implementation
//! and the ratatui renderer

pub mod render;
pub mod surface;
pub mod text_area;
