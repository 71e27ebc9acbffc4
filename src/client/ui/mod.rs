//! Client UI rendering.

mod quiz;
mod render;
mod status;

pub use render::render;
