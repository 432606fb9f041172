//! Single-target hybrid tracker for live video.
//!
//! A [`TrackerHandle`] is seeded with a frame and a box (picked by hand or by
//! a [`TargetDetector`]) and then fed one frame at a time. Each update yields a
//! box, a [`Status`] and a confidence in [0, 1] within a bounded amount of
//! work, using only classical template matching and histogram cues.

pub mod integration;
pub mod tracker;

pub use integration::{Detection, DetectionBuilder, Manual, TargetDetector, TrackerPipeline};
pub use tracker::{
    BoundingBox, Frame, HandleState, HandleUpdate, HybridTracker, Status, TrackError,
    TrackResult, TrackerConfig, TrackerHandle, TrackerKind,
};
