//! Integration module for seeding the tracker from object detection backends.
//!
//! This module provides the detector capability trait and a pipeline that
//! combines any detector (or none, see [`Manual`]) with a [`TrackerHandle`].
//!
//! [`TrackerHandle`]: crate::tracker::TrackerHandle

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{Detection, Manual, TargetDetector};
pub use pipeline::TrackerPipeline;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
