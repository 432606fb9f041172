//! Per-target hybrid tracking engine.
//!
//! Each frame the core tracker is tried first. Every `validate_every`-th frame
//! its box is re-checked against the appearance signature; in between it is
//! trusted as is. When the core tracker fails (or validation rejects its
//! match) the engine counts a lost frame, periodically runs the recovery
//! search, and otherwise emits a motion prediction with status SEARCH.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tracker::core_tracker::CoreTracker;
use crate::tracker::error::TrackError;
use crate::tracker::frame::Frame;
use crate::tracker::motion::MotionPredictor;
use crate::tracker::recovery::RecoverySearch;
use crate::tracker::rect::BoundingBox;
use crate::tracker::signature::Signature;
use crate::tracker::smoother::Smoother;
use crate::tracker::track_state::Status;

/// Prediction horizon cap while looking for a recovery candidate.
const RECOVERY_HORIZON: u32 = 10;
/// Prediction horizon cap for SEARCH output.
const SEARCH_HORIZON: u32 = 20;

/// Which engine a handle drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Core tracker with validation, prediction and recovery.
    #[default]
    Hybrid,
    /// Bare core tracker: every match is LOCK, every miss is SEARCH.
    CoreOnly,
}

/// Configuration for the tracking engine and its handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub kind: TrackerKind,
    /// Minimum correlation for the core tracker to accept a match.
    pub match_threshold: f32,
    /// Minimum correlation for the core tracker to adapt its template.
    pub adapt_threshold: f32,
    /// Weight of the newly observed crop when adapting the template.
    pub adapt_rate: f32,
    /// Core search window half-width, in multiples of the box's longer side.
    pub search_scale: f32,
    pub validate_every: u32,
    pub accept_score: f32,
    pub lock_score: f32,
    pub recovery_every: u32,
    pub recovery_max_lost: u32,
    pub full_frame_after: u32,
    pub recovery_score: f32,
    pub smoothing_alpha: f32,
    /// EMA factor for the first steady frame after a re-acquisition.
    pub settle_alpha: f32,
    /// Frames without an accepted observation before a handle gives up.
    pub max_frames_since_lost: u32,
    pub refresh_signature_on_recovery: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: TrackerKind::Hybrid,
            match_threshold: 0.5,
            adapt_threshold: 0.7,
            adapt_rate: 0.05,
            search_scale: 2.5,
            validate_every: 3,
            accept_score: 0.50,
            lock_score: 0.65,
            recovery_every: 3,
            recovery_max_lost: 100,
            full_frame_after: 50,
            recovery_score: 0.55,
            smoothing_alpha: 0.6,
            settle_alpha: 0.45,
            max_frames_since_lost: 150,
            refresh_signature_on_recovery: true,
        }
    }
}

/// Output of one engine update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    pub bbox: BoundingBox,
    pub status: Status,
    /// In [0, 1]; always 0 for SEARCH.
    pub confidence: f32,
}

/// Counters for the engine's expensive operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    /// Signature re-checks of core tracker matches.
    pub validations: u64,
    /// Recovery searches run.
    pub recovery_attempts: u64,
    /// Recovery searches that re-acquired the target.
    pub recoveries: u64,
}

#[derive(Debug)]
pub struct HybridTracker {
    config: TrackerConfig,
    signature: Signature,
    core: CoreTracker,
    motion: MotionPredictor,
    recovery: RecoverySearch,
    smoother: Smoother,
    frame_count: u64,
    lost_frames: u32,
    confidence: f32,
    stats: TrackerStats,
}

impl HybridTracker {
    pub fn new(frame: &Frame, bbox: BoundingBox, config: TrackerConfig) -> Result<Self, TrackError> {
        let signature = Signature::new(frame, bbox)?;
        let core = CoreTracker::new(frame, bbox, &config)?;
        Ok(Self {
            recovery: RecoverySearch::new(&config),
            smoother: Smoother::new(config.smoothing_alpha),
            motion: MotionPredictor::new(bbox),
            signature,
            core,
            config,
            frame_count: 0,
            lost_frames: 0,
            confidence: 1.0,
            stats: TrackerStats::default(),
        })
    }

    /// Process one frame. Never fails: every failure degrades to a
    /// predicted box with status SEARCH.
    pub fn update(&mut self, frame: &Frame) -> TrackResult {
        self.frame_count += 1;

        if self.config.kind == TrackerKind::CoreOnly {
            return self.update_core_only(frame);
        }

        match self.core.update(frame) {
            Ok(bbox) if self.frame_count % self.config.validate_every.max(1) as u64 == 0 => {
                self.stats.validations += 1;
                let score = self.signature.quick_validate(frame, &bbox);
                self.confidence = score;
                if score > self.config.accept_score {
                    let status = if score > self.config.lock_score {
                        Status::Lock
                    } else {
                        Status::Track
                    };
                    return self.accept(bbox, status, score);
                }
                debug!(
                    frame = self.frame_count,
                    score,
                    ?bbox,
                    "signature rejected core match"
                );
            }
            Ok(bbox) => return self.accept(bbox, Status::Lock, self.confidence),
            Err(err) => {
                debug!(frame = self.frame_count, %err, "core tracker miss");
            }
        }

        self.miss(frame)
    }

    fn update_core_only(&mut self, frame: &Frame) -> TrackResult {
        match self.core.update(frame) {
            Ok(bbox) => {
                let score = self.core.last_score().clamp(0.0, 1.0);
                self.accept(bbox, Status::Lock, score)
            }
            Err(_) => {
                self.lost_frames += 1;
                TrackResult {
                    bbox: self.motion.anchor(),
                    status: Status::Search,
                    confidence: 0.0,
                }
            }
        }
    }

    fn accept(&mut self, observed: BoundingBox, status: Status, confidence: f32) -> TrackResult {
        let emitted = self.smoother.smooth(observed);
        self.motion.observe(&observed, emitted);
        self.lost_frames = 0;
        self.confidence = confidence;
        TrackResult {
            bbox: emitted,
            status,
            confidence,
        }
    }

    fn miss(&mut self, frame: &Frame) -> TrackResult {
        self.lost_frames += 1;

        if self.recovery.should_attempt(self.lost_frames) {
            self.stats.recovery_attempts += 1;
            let predicted = self.motion.predict(self.lost_frames.min(RECOVERY_HORIZON));
            let found = self
                .recovery
                .search(frame, &self.signature, &predicted, self.lost_frames);
            let recovered = match found {
                Ok(candidate) => self.reacquire(frame, candidate.bbox),
                Err(err) => Err(err),
            };
            match recovered {
                Ok(result) => return result,
                Err(err) => {
                    debug!(lost_frames = self.lost_frames, %err, "recovery failed");
                }
            }
        }

        TrackResult {
            bbox: self.motion.predict(self.lost_frames.min(SEARCH_HORIZON)),
            status: Status::Search,
            confidence: 0.0,
        }
    }

    /// Replace the core tracker (and optionally the signature) with fresh
    /// ones seeded at `bbox` and restart motion and smoothing.
    fn reacquire(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<TrackResult, TrackError> {
        let core = CoreTracker::new(frame, bbox, &self.config)?;
        if self.config.refresh_signature_on_recovery {
            self.signature = Signature::new(frame, bbox)?;
        }
        self.core = core;
        self.motion.reset(bbox);
        self.smoother.reset_settling(self.config.settle_alpha);
        let emitted = self.smoother.smooth(bbox);

        debug!(
            lost_frames = self.lost_frames,
            ?bbox,
            "target re-acquired"
        );
        self.lost_frames = 0;
        self.confidence = 1.0;
        self.stats.recoveries += 1;
        Ok(TrackResult {
            bbox: emitted,
            status: Status::Recov,
            confidence: 1.0,
        })
    }

    /// Consecutive frames without an accepted observation.
    pub fn lost_frames(&self) -> u32 {
        self.lost_frames
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Confidence carried into trusted (unvalidated) frames.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.motion.velocity()
    }

    /// Last emitted (smoothed) box of an accepted observation.
    pub fn last_box(&self) -> BoundingBox {
        self.motion.anchor()
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn motion(&self) -> &MotionPredictor {
        &self.motion
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn core(&self) -> &CoreTracker {
        &self.core
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_util::{flat_scene, gray_scene, paste_gray, textured_patch};

    fn scene_with_target(x: usize, y: usize) -> Frame {
        let mut frame = gray_scene(120, 160, 11);
        paste_gray(&mut frame, &textured_patch(20, 20, 500), x, y);
        frame
    }

    #[test]
    fn test_stationary_target_locks() {
        let frame = scene_with_target(50, 40);
        let bbox = BoundingBox::new(50, 40, 20, 20);
        let mut tracker = HybridTracker::new(&frame, bbox, TrackerConfig::default()).unwrap();

        for i in 1..=6 {
            let result = tracker.update(&frame);
            assert_eq!(result.status, Status::Lock, "frame {i}");
            assert_eq!(result.bbox, bbox);
            assert!(result.confidence > 0.65);
        }
        assert_eq!(tracker.stats().validations, 2);
        assert_eq!(tracker.lost_frames(), 0);
    }

    #[test]
    fn test_moving_target_builds_velocity() {
        let first = scene_with_target(20, 40);
        let mut tracker =
            HybridTracker::new(&first, BoundingBox::new(20, 40, 20, 20), TrackerConfig::default())
                .unwrap();

        tracker.update(&scene_with_target(28, 40));
        assert_eq!(tracker.velocity(), Vector2::new(8.0, 0.0));
    }

    #[test]
    fn test_miss_predicts_and_counts() {
        let frame = scene_with_target(50, 40);
        let bbox = BoundingBox::new(50, 40, 20, 20);
        let mut tracker = HybridTracker::new(&frame, bbox, TrackerConfig::default()).unwrap();

        let blank = flat_scene(120, 160, 30);
        for n in 1..=5 {
            let result = tracker.update(&blank);
            assert_eq!(result.status, Status::Search);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.bbox, bbox);
            assert_eq!(tracker.lost_frames(), n);
        }
        assert_eq!(tracker.stats().recovery_attempts, 1);
    }

    #[test]
    fn test_moderate_validation_score_tracks() {
        let frame = scene_with_target(50, 40);
        let bbox = BoundingBox::new(50, 40, 20, 20);
        let config = TrackerConfig {
            lock_score: 1.5,
            ..TrackerConfig::default()
        };
        let mut tracker = HybridTracker::new(&frame, bbox, config).unwrap();

        assert_eq!(tracker.update(&frame).status, Status::Lock);
        assert_eq!(tracker.update(&frame).status, Status::Lock);
        let validated = tracker.update(&frame);
        assert_eq!(validated.status, Status::Track);
        assert_eq!(validated.bbox, bbox);
        assert!(validated.confidence > 0.5);
        assert_eq!(tracker.lost_frames(), 0);

        // trusted frames carry the validated confidence
        let trusted = tracker.update(&frame);
        assert_eq!(trusted.status, Status::Lock);
        assert_eq!(trusted.confidence, validated.confidence);
    }

    #[test]
    fn test_rejected_validation_counts_one_lost_frame() {
        let first = scene_with_target(20, 40);
        let config = TrackerConfig {
            accept_score: 1.5,
            ..TrackerConfig::default()
        };
        let mut tracker =
            HybridTracker::new(&first, BoundingBox::new(20, 40, 20, 20), config).unwrap();

        tracker.update(&scene_with_target(28, 40));
        let trusted = tracker.update(&scene_with_target(36, 40));
        // 28 + 0.6 * (36 - 28)
        assert_eq!(trusted.bbox.x, 33);
        let history = tracker.motion().history_len();
        let anchor = tracker.last_box();

        let rejected = tracker.update(&scene_with_target(44, 40));
        assert_eq!(rejected.status, Status::Search);
        assert_eq!(rejected.confidence, 0.0);
        // predicted one step ahead of the last emitted box
        assert_eq!(rejected.bbox, BoundingBox::new(41, 40, 20, 20));
        assert_eq!(tracker.lost_frames(), 1);
        assert_eq!(tracker.stats().validations, 1);
        assert_eq!(tracker.motion().history_len(), history);
        assert_eq!(tracker.last_box(), anchor);
        assert_eq!(tracker.velocity(), Vector2::new(8.0, 0.0));

        // the smoother never saw x = 44: 32.8 + 0.6 * (52 - 32.8) rounds to 44
        let resumed = tracker.update(&scene_with_target(52, 40));
        assert_eq!(resumed.status, Status::Lock);
        assert_eq!(resumed.bbox.x, 44);
        assert_eq!(tracker.lost_frames(), 0);
    }

    #[test]
    fn test_rejects_degenerate_init() {
        let frame = gray_scene(50, 50, 1);
        let err = HybridTracker::new(&frame, BoundingBox::new(45, 45, 10, 10), TrackerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, TrackError::OutOfBounds { .. }));
    }

    #[test]
    fn test_core_only_kind() {
        let frame = scene_with_target(50, 40);
        let config = TrackerConfig {
            kind: TrackerKind::CoreOnly,
            ..TrackerConfig::default()
        };
        let mut tracker = HybridTracker::new(&frame, BoundingBox::new(50, 40, 20, 20), config).unwrap();

        let result = tracker.update(&frame);
        assert_eq!(result.status, Status::Lock);
        assert!(result.confidence > 0.99);

        let result = tracker.update(&flat_scene(120, 160, 0));
        assert_eq!(result.status, Status::Search);
        assert_eq!(tracker.stats(), TrackerStats::default());
    }
}
