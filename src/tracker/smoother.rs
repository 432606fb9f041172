//! Exponential moving average over emitted boxes.

use nalgebra::Vector4;

use crate::tracker::rect::BoundingBox;

#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f32,
    /// One-shot factor for the next blended observation.
    next_alpha: Option<f32>,
    state: Option<Vector4<f32>>,
}

impl Smoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            next_alpha: None,
            state: None,
        }
    }

    /// Blend `bbox` into the running average. The first observation after
    /// construction or [`reset`](Self::reset) passes through unchanged.
    pub fn smooth(&mut self, bbox: BoundingBox) -> BoundingBox {
        let current = Vector4::new(
            bbox.x as f32,
            bbox.y as f32,
            bbox.width as f32,
            bbox.height as f32,
        );
        let Some(prev) = self.state else {
            self.state = Some(current);
            return bbox;
        };

        let alpha = self.next_alpha.take().unwrap_or(self.alpha);
        let next = prev + (current - prev) * alpha;
        self.state = Some(next);
        BoundingBox::new(
            next.x.round() as i32,
            next.y.round() as i32,
            next.z.round() as i32,
            next.w.round() as i32,
        )
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.next_alpha = None;
    }

    /// Reset, then blend the observation after the pass-through one with `alpha`.
    pub fn reset_settling(&mut self, alpha: f32) {
        self.reset();
        self.next_alpha = Some(alpha.clamp(0.0, 1.0));
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(0.6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_passes_through() {
        let mut s = Smoother::default();
        let b = BoundingBox::new(13, 17, 29, 31);
        assert_eq!(s.smooth(b), b);
    }

    #[test]
    fn test_ema_step() {
        let mut s = Smoother::new(0.5);
        s.smooth(BoundingBox::new(0, 0, 10, 10));
        assert_eq!(s.smooth(BoundingBox::new(10, 20, 10, 30)), BoundingBox::new(5, 10, 10, 20));
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let mut s = Smoother::new(0.6);
        let b = BoundingBox::new(101, 57, 33, 47);
        for _ in 0..50 {
            assert_eq!(s.smooth(b), b);
        }
    }

    #[test]
    fn test_converges_after_reset() {
        let mut s = Smoother::new(0.6);
        s.smooth(BoundingBox::new(0, 0, 10, 10));
        s.reset();
        let b = BoundingBox::new(300, 200, 40, 40);
        assert_eq!(s.smooth(b), b);
    }

    #[test]
    fn test_settling_alpha_applies_once() {
        let mut s = Smoother::new(0.6);
        s.reset_settling(0.5);
        s.smooth(BoundingBox::new(0, 0, 10, 10));
        // settle: 0 + 0.5 * 100
        assert_eq!(s.smooth(BoundingBox::new(100, 0, 10, 10)).x, 50);
        // steady: 50 + 0.6 * 50
        assert_eq!(s.smooth(BoundingBox::new(100, 0, 10, 10)).x, 80);
    }
}
