//! Capability trait for anything that can propose an initial target box.

use std::convert::Infallible;

use crate::tracker::{BoundingBox, Frame};

/// A proposed target with its detector confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// Trait for detection backends that can seed the tracker.
///
/// Implement this trait to hand the tracker its initial box from a model
/// instead of a manual selection.
///
/// # Example
///
/// ```ignore
/// use hybridtrack_rs::{Detection, Frame, TargetDetector};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl TargetDetector for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait TargetDetector {
    /// Error type for detection failures.
    type Error;

    /// Run inference on a frame and return candidate targets.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

/// The detector used when targets are only ever selected by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manual;

impl TargetDetector for Manual {
    type Error = Infallible;

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        Ok(Vec::new())
    }
}
