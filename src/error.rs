//! Error types shared by the line geometry, material and renderer.

use thiserror::Error;

/// Errors raised while feeding or drawing line data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// Flat segment data must contain 6 floats (two xyz endpoints) per segment.
    #[error("segment data must hold 6 floats per segment, got {len} floats")]
    InvalidSegmentData { len: usize },

    /// Flat polyline data must contain 3 floats per point.
    #[error("polyline data must hold 3 floats per point, got {len} floats")]
    InvalidPolylineData { len: usize },

    /// Color data does not line up with the positions it decorates.
    #[error("expected {expected} color floats, got {actual}")]
    ColorCountMismatch { expected: usize, actual: usize },

    /// A draw or update was attempted before GPU resources existed.
    #[error("GPU resources for {0} have not been initialized")]
    MissingGpuResources(&'static str),
}

/// Convenience alias used across the crate.
pub type LineResult<T> = Result<T, LineError>;
