//! # Thickline Prelude
//!
//! Commonly used types and traits in one import.
//!
//! ```rust
//! use thickline::prelude::*;
//!
//! let line = Line2::new();
//! assert_eq!(line.kind(), NodeKind::Line2);
//! ```

// Re-export line types
pub use crate::gfx::lines::{
    shared, Line2, LineGeometry, LineMaterial, LineMaterialParameters, LineSegments2,
    LineSegmentsGeometry, NodeKind, SegmentGeometry, Shared,
};

// Re-export camera, picking and scene types
pub use crate::gfx::camera::{Camera, OrbitCamera};
pub use crate::gfx::picking::{LineIntersection, Ray, RaycastCamera, Raycaster};
pub use crate::gfx::scene::{PickResult, Scene, SceneNode};

// Re-export rendering types
pub use crate::gfx::rendering::{DrawLines, LineRenderer, RendererConfig};

pub use crate::error::{LineError, LineResult};

// Re-export common external dependencies
pub use cgmath::{InnerSpace, Vector3, Zero};
pub use wgpu::{Device, Queue};
