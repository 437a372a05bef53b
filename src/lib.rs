// src/lib.rs
//! Thickline
//!
//! Lines with a constant on-screen width, drawn with wgpu.
//!
//! [`Line2`] is the usual entry point: a polyline node composed of a
//! [`LineGeometry`](gfx::lines::LineGeometry) and a
//! [`LineMaterial`](gfx::lines::LineMaterial), either supplied by the caller or
//! created with defaults.

pub mod error;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use error::{LineError, LineResult};
pub use gfx::lines::{Line2, LineSegments2, NodeKind};
