//! # Scene Module
//!
//! Holds the line nodes of a frame and answers picking queries over all of
//! them.
//!
//! - [`Scene`] - flat container of [`SceneNode`]s
//! - [`SceneNode`] - one line node, tagged by variant
//! - [`PickResult`] - nearest hit of [`Scene::pick`]
//!
//! ```no_run
//! use thickline::gfx::lines::Line2;
//! use thickline::gfx::scene::Scene;
//!
//! let mut scene = Scene::new();
//! let index = scene.add(Line2::new());
//! assert!(scene.nodes()[index].is_thick_line());
//! ```

pub mod scene;

// Re-export main types
pub use scene::{PickResult, Scene, SceneNode, SceneStatistics};
