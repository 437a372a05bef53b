//! # Graphics Module
//!
//! Everything needed to build, pick and draw wide lines.
//!
//! ## Architecture Overview
//!
//! - **Lines** ([`lines`]) - geometry, material and the line node types
//! - **Camera System** ([`camera`]) - camera trait and an orbit camera
//! - **Picking** ([`picking`]) - rays, bounding volumes and line hit records
//! - **Rendering Pipeline** ([`rendering`]) - the instanced wide-line pipeline
//! - **Scene Management** ([`scene`]) - node container with scene-wide picking
//!
//! ## Usage
//!
//! ```no_run
//! use thickline::gfx::lines::{shared, Line2, LineGeometry};
//! use thickline::gfx::scene::Scene;
//! use cgmath::Vector3;
//!
//! let geometry = LineGeometry::from_points(&[
//!     Vector3::new(0.0, 0.0, 0.0),
//!     Vector3::new(1.0, 1.0, 0.0),
//! ]);
//! let mut scene = Scene::new();
//! scene.add(Line2::with_geometry(shared(geometry)));
//! ```

pub mod camera;
pub mod lines;
pub mod picking;
pub mod rendering;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use lines::{Line2, LineGeometry, LineMaterial, LineSegments2, NodeKind};
pub use rendering::{DrawLines, LineRenderer, RendererConfig};
pub use scene::Scene;
