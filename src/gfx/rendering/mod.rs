// src/gfx/rendering/mod.rs
//! Line rendering
//!
//! Pipeline creation, per-frame GPU uploads and draw calls for line nodes.

pub mod line_renderer;
pub mod shaders;

// Re-export main types
pub use line_renderer::{DrawLines, LineQuad, LineRenderer, QuadVertex, RendererConfig};
