//! Failure kinds surfaced by the tracking engine.

use thiserror::Error;

use crate::tracker::rect::BoundingBox;

/// Why a crop, construction, or match attempt failed.
///
/// None of these are fatal: the per-frame path converts every variant into a
/// zero score or a failed match.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    /// The box reaches outside the frame buffer.
    #[error("box {bbox:?} lies outside the {frame_width}x{frame_height} frame")]
    OutOfBounds {
        bbox: BoundingBox,
        frame_width: usize,
        frame_height: usize,
    },
    /// The box is too small (or empty) to build or compare a template.
    #[error("box {bbox:?} is degenerate: sides must be at least {min_side}px")]
    DegenerateGeometry { bbox: BoundingBox, min_side: i32 },
    /// No candidate cleared the acceptance threshold.
    #[error("no candidate scored above {threshold}")]
    NoMatch { threshold: f32 },
    /// The pixel buffer does not have a supported layout.
    #[error("unsupported frame shape {shape:?}: expected HxW or HxWx3")]
    FrameShape { shape: Vec<usize> },
}
