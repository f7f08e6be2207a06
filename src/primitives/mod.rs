//! Low-level text primitives shared by the model and the view

pub mod ansi;
pub mod encoding;
pub mod grapheme;
