//! TrackerPipeline for combining detection with tracking.

use tracing::debug;

use crate::tracker::{
    BoundingBox, Frame, HandleState, HandleUpdate, Status, TrackerConfig, TrackerHandle,
};

use super::{Manual, TargetDetector};

/// Bundles a [`TrackerHandle`] with the detector that seeds it.
///
/// While the handle is IDLE or LOST each frame is offered to the detector and
/// the best-scoring valid detection starts a new track. With [`Manual`] the
/// detector never proposes anything, so only [`select`](Self::select) starts
/// tracking.
#[derive(Debug)]
pub struct TrackerPipeline<D: TargetDetector = Manual> {
    detector: D,
    handle: TrackerHandle,
    min_seed_score: f32,
}

impl<D: TargetDetector> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Self {
        Self {
            detector,
            handle: TrackerHandle::new(config),
            min_seed_score: 0.5,
        }
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self::new(detector, TrackerConfig::default())
    }

    /// Ignore detections scoring below `score` when seeding.
    pub fn with_min_seed_score(mut self, score: f32) -> Self {
        self.min_seed_score = score;
        self
    }

    /// Start tracking a hand-picked box, superseding any current target.
    /// Always succeeds, see [`TrackerHandle::init`].
    pub fn select(&mut self, frame: &Frame, bbox: BoundingBox) -> bool {
        self.handle.init(frame, bbox)
    }

    /// Process a single frame.
    ///
    /// Seeds the tracker from the detector when no target is active,
    /// otherwise advances the current track.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<HandleUpdate, D::Error> {
        if self.handle.is_active() {
            return Ok(self.handle.update(frame));
        }

        let seed = self
            .detector
            .detect(frame)?
            .into_iter()
            .filter(|d| d.score >= self.min_seed_score)
            .filter(|d| d.bbox.is_valid_in(frame.width(), frame.height()))
            .max_by(|a, b| a.score.total_cmp(&b.score));

        let Some(seed) = seed else {
            return Ok(self.handle.update(frame));
        };
        debug!(bbox = ?seed.bbox, score = seed.score, "seeding tracker from detection");
        self.handle.init(frame, seed.bbox);
        Ok(HandleUpdate {
            tracked: true,
            bbox: Some(seed.bbox),
            status: Some(Status::Lock),
            confidence: 1.0,
            state: HandleState::Active,
        })
    }

    /// Drop the current target.
    pub fn stop(&mut self) {
        self.handle.stop();
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker handle.
    pub fn handle(&self) -> &TrackerHandle {
        &self.handle
    }

    /// Get a mutable reference to the underlying tracker handle.
    pub fn handle_mut(&mut self) -> &mut TrackerHandle {
        &mut self.handle
    }
}

impl TrackerPipeline<Manual> {
    /// A pipeline that only tracks hand-picked targets.
    pub fn manual(config: TrackerConfig) -> Self {
        Self::new(Manual, config)
    }
}
