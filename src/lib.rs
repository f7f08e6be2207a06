// Shell front-end library - exposes all core modules for testing

pub mod app;
pub mod config;
pub mod input;
pub mod model;
pub mod primitives;
pub mod services;
pub mod view;
