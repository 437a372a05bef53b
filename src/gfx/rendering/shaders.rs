//! Line Shaders Module
//!
//! WGSL sources compiled by the line pipeline.

pub const LINE_SHADER: &str = include_str!("shaders/line.wgsl");
