//! Lifecycle façade over the hybrid engine.

use tracing::{info, warn};

use crate::tracker::error::TrackError;
use crate::tracker::frame::Frame;
use crate::tracker::hybrid_tracker::{HybridTracker, TrackResult, TrackerConfig};
use crate::tracker::rect::BoundingBox;
use crate::tracker::track_state::{HandleState, Status};

/// What a caller gets back from [`TrackerHandle::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleUpdate {
    /// True when this frame carried an accepted observation.
    pub tracked: bool,
    /// Accepted or predicted box; `None` when the handle is not active.
    pub bbox: Option<BoundingBox>,
    /// Engine status of this frame, if the engine ran.
    pub status: Option<Status>,
    pub confidence: f32,
    /// Handle state after this frame.
    pub state: HandleState,
}

impl HandleUpdate {
    fn inactive(state: HandleState) -> Self {
        Self {
            tracked: false,
            bbox: None,
            status: None,
            confidence: 0.0,
            state,
        }
    }
}

/// Stable init/update/stop wrapper with an IDLE -> ACTIVE -> LOST lifecycle.
///
/// LOST is terminal until the next [`init`](Self::init).
#[derive(Debug)]
pub struct TrackerHandle {
    config: TrackerConfig,
    engine: Option<HybridTracker>,
    state: HandleState,
    status: Option<Status>,
    confidence: f32,
    selection: Option<BoundingBox>,
    last_valid_bbox: Option<BoundingBox>,
    frames_since_lost: u32,
    fault: Option<TrackError>,
}

impl TrackerHandle {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            engine: None,
            state: HandleState::Idle,
            status: None,
            confidence: 0.0,
            selection: None,
            last_valid_bbox: None,
            frames_since_lost: 0,
            fault: None,
        }
    }

    /// Start tracking `bbox`, superseding any current target.
    ///
    /// Always enters ACTIVE and returns `true`. If the engine cannot be built
    /// from this selection the cause is kept in [`fault`](Self::fault) and
    /// every following update reports SEARCH at the selection until LOST.
    pub fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> bool {
        match HybridTracker::new(frame, bbox, self.config.clone()) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.fault = None;
            }
            Err(err) => {
                warn!(?bbox, %err, "tracker init failed, target will be reported as searching");
                self.engine = None;
                self.fault = Some(err);
            }
        }
        self.state = HandleState::Active;
        self.status = Some(Status::Lock);
        self.confidence = 1.0;
        self.selection = Some(bbox);
        self.last_valid_bbox = Some(bbox);
        self.frames_since_lost = 0;
        info!(?bbox, kind = ?self.config.kind, "tracking started");
        true
    }

    pub fn update(&mut self, frame: &Frame) -> HandleUpdate {
        if self.state != HandleState::Active {
            return HandleUpdate::inactive(self.state);
        }

        let result = match self.engine.as_mut() {
            Some(engine) => engine.update(frame),
            None => TrackResult {
                bbox: self.selection.unwrap_or_default(),
                status: Status::Search,
                confidence: 0.0,
            },
        };
        self.status = Some(result.status);
        self.confidence = result.confidence;

        let tracked = result.status.is_accepted();
        if tracked {
            self.last_valid_bbox = Some(result.bbox);
            self.frames_since_lost = 0;
        } else {
            self.frames_since_lost += 1;
            if self.frames_since_lost > self.config.max_frames_since_lost {
                info!(
                    frames_since_lost = self.frames_since_lost,
                    "target lost"
                );
                self.state = HandleState::Lost;
            }
        }

        HandleUpdate {
            tracked,
            bbox: Some(result.bbox),
            status: Some(result.status),
            confidence: result.confidence,
            state: self.state,
        }
    }

    /// Drop the target and return to IDLE.
    pub fn stop(&mut self) {
        if self.state != HandleState::Idle {
            info!(state = %self.state, "tracking stopped");
        }
        self.engine = None;
        self.state = HandleState::Idle;
        self.status = None;
        self.confidence = 0.0;
        self.selection = None;
        self.last_valid_bbox = None;
        self.frames_since_lost = 0;
        self.fault = None;
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HandleState::Active
    }

    /// Engine status of the most recent frame.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn last_valid_bbox(&self) -> Option<BoundingBox> {
        self.last_valid_bbox
    }

    pub fn frames_since_lost(&self) -> u32 {
        self.frames_since_lost
    }

    /// Engine lost-frame counter, for a "SEARCHING n" style overlay.
    pub fn lost_frames(&self) -> u32 {
        self.engine
            .as_ref()
            .map_or(self.frames_since_lost, HybridTracker::lost_frames)
    }

    /// Why the last `init` could not build an engine.
    pub fn fault(&self) -> Option<&TrackError> {
        self.fault.as_ref()
    }

    pub fn engine(&self) -> Option<&HybridTracker> {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Default for TrackerHandle {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
