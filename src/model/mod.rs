//! Core data model

pub mod buffer;
