//! Constant-velocity extrapolation over the most recent box centers.

use std::collections::VecDeque;

use nalgebra::Vector2;

use crate::tracker::rect::BoundingBox;

/// Number of recent centers kept.
pub const HISTORY_LEN: usize = 5;
/// Below this speed (px/frame) the target is treated as stationary.
pub const MIN_SPEED: f32 = 5.0;

#[derive(Debug, Clone)]
pub struct MotionPredictor {
    history: VecDeque<Vector2<f32>>,
    velocity: Vector2<f32>,
    /// Box extrapolated from; the last emitted position.
    anchor: BoundingBox,
}

impl MotionPredictor {
    pub fn new(bbox: BoundingBox) -> Self {
        let mut predictor = Self {
            history: VecDeque::with_capacity(HISTORY_LEN),
            velocity: Vector2::zeros(),
            anchor: bbox,
        };
        predictor.reset(bbox);
        predictor
    }

    /// Forget all motion and restart from `bbox`.
    pub fn reset(&mut self, bbox: BoundingBox) {
        self.history.clear();
        self.history.push_back(center_of(&bbox));
        self.velocity = Vector2::zeros();
        self.anchor = bbox;
    }

    /// Record an accepted observation and the box that was emitted for it.
    pub fn observe(&mut self, observed: &BoundingBox, emitted: BoundingBox) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(center_of(observed));
        self.anchor = emitted;
        self.velocity = self.estimate_velocity();
    }

    /// Difference of the two most recent centers; zero with fewer than two.
    pub fn estimate_velocity(&self) -> Vector2<f32> {
        let n = self.history.len();
        if n < 2 {
            return Vector2::zeros();
        }
        self.history[n - 1] - self.history[n - 2]
    }

    /// Extrapolate the anchor `steps` frames ahead; stationary targets stay put.
    pub fn predict(&self, steps: u32) -> BoundingBox {
        if self.velocity.norm() <= MIN_SPEED {
            return self.anchor;
        }
        let offset = self.velocity * steps as f32;
        BoundingBox::new(
            self.anchor.x + offset.x as i32,
            self.anchor.y + offset.y as i32,
            self.anchor.width,
            self.anchor.height,
        )
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    pub fn anchor(&self) -> BoundingBox {
        self.anchor
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

fn center_of(bbox: &BoundingBox) -> Vector2<f32> {
    let (cx, cy) = bbox.center();
    Vector2::new(cx as f32, cy as f32)
}
