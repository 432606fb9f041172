//! Periodic, signature-gated re-acquisition after the core tracker loses the
//! target.

use tracing::debug;

use crate::tracker::error::TrackError;
use crate::tracker::frame::Frame;
use crate::tracker::hybrid_tracker::TrackerConfig;
use crate::tracker::imgproc::SearchImage;
use crate::tracker::rect::{BoundingBox, Window};
use crate::tracker::signature::Signature;

/// Lost-frame count below which the window stays tight.
const WIDE_WINDOW_AFTER: u32 = 20;
const NEAR_WINDOW_FACTOR: i32 = 2;
const WIDE_WINDOW_FACTOR: i32 = 4;

/// A re-acquired target position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    /// Raw correlation of the winning scale variant.
    pub correlation: f32,
    /// `Signature::quick_validate` score of the candidate box.
    pub score: f32,
}

/// Trigger policy and windowed search for re-acquisition.
#[derive(Debug, Clone)]
pub struct RecoverySearch {
    every: u32,
    max_lost: u32,
    full_frame_after: u32,
    threshold: f32,
}

impl RecoverySearch {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            every: config.recovery_every.max(1),
            max_lost: config.recovery_max_lost,
            full_frame_after: config.full_frame_after,
            threshold: config.recovery_score,
        }
    }

    /// Recovery runs only on every `every`-th lost frame and below the ceiling.
    pub fn should_attempt(&self, lost_frames: u32) -> bool {
        lost_frames > 0 && lost_frames % self.every == 0 && lost_frames < self.max_lost
    }

    /// Region searched for a lost target predicted at `predicted`.
    pub fn window(
        &self,
        predicted: &BoundingBox,
        lost_frames: u32,
        frame_width: usize,
        frame_height: usize,
    ) -> Option<Window> {
        if lost_frames > self.full_frame_after {
            return Window::full(frame_width, frame_height);
        }
        let factor = if lost_frames < WIDE_WINDOW_AFTER {
            NEAR_WINDOW_FACTOR
        } else {
            WIDE_WINDOW_FACTOR
        };
        let (cx, cy) = predicted.center();
        Window::around(cx, cy, predicted.max_side() * factor, frame_width, frame_height)
    }

    /// Look for the target around `predicted`.
    ///
    /// A location qualifies only if both its raw correlation and its
    /// signature validation exceed the recovery threshold; the best
    /// validated candidate wins.
    pub fn search(
        &self,
        frame: &Frame,
        signature: &Signature,
        predicted: &BoundingBox,
        lost_frames: u32,
    ) -> Result<Candidate, TrackError> {
        let window = self
            .window(predicted, lost_frames, frame.width(), frame.height())
            .ok_or(TrackError::OutOfBounds {
                bbox: *predicted,
                frame_width: frame.width(),
                frame_height: frame.height(),
            })?;
        let mut region = SearchImage::new(&frame.gray_window(&window));

        let mut best: Option<Candidate> = None;
        for variant in signature.scales() {
            let Some(m) = region.best_match(&variant.pixels) else {
                continue;
            };
            if m.score <= self.threshold {
                continue;
            }
            let bbox = BoundingBox::new(
                (window.x1 + m.x) as i32,
                (window.y1 + m.y) as i32,
                variant.width() as i32,
                variant.height() as i32,
            );
            let score = signature.quick_validate(frame, &bbox);
            debug!(
                scale = variant.scale,
                correlation = m.score,
                score,
                "recovery candidate"
            );
            if score > self.threshold && best.is_none_or(|b| score > b.score) {
                best = Some(Candidate {
                    bbox,
                    correlation: m.score,
                    score,
                });
            }
        }

        best.ok_or(TrackError::NoMatch {
            threshold: self.threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::imgproc;
    use crate::tracker::test_util::{gray_scene, paste_gray, textured_patch};
    use ndarray::Array3;

    /// Two-colour pattern whose layout comes from the textured patch.
    fn two_tone(side: usize, seed: u32, low: [u8; 3], high: [u8; 3]) -> Array3<u8> {
        let mask = textured_patch(side, side, seed);
        Array3::from_shape_fn((side, side, 3), |(y, x, c)| {
            if mask[[y, x]] >= 128 { high[c] } else { low[c] }
        })
    }

    fn gray_canvas_with(patch: &Array3<u8>, x: usize, y: usize) -> Frame {
        let mut pixels = Array3::from_elem((120, 160, 3), 128u8);
        let (h, w, _) = patch.dim();
        pixels
            .slice_mut(ndarray::s![y..y + h, x..x + w, ..])
            .assign(patch);
        Frame::Rgb(pixels)
    }

    fn recovery() -> RecoverySearch {
        RecoverySearch::new(&TrackerConfig::default())
    }

    #[test]
    fn test_trigger_policy() {
        let r = recovery();
        let attempts: Vec<u32> = (0..120).filter(|&n| r.should_attempt(n)).collect();
        assert_eq!(attempts.first(), Some(&3));
        assert_eq!(attempts.last(), Some(&99));
        assert_eq!(attempts.len(), 33);
        assert!(attempts.iter().all(|n| n % 3 == 0));
    }

    #[test]
    fn test_window_growth() {
        let r = recovery();
        let predicted = BoundingBox::new(300, 200, 20, 10);
        let near = r.window(&predicted, 3, 640, 480).unwrap();
        assert_eq!((near.x1, near.x2), (270, 350));
        let wide = r.window(&predicted, 21, 640, 480).unwrap();
        assert_eq!((wide.x1, wide.x2), (230, 390));
        let full = r.window(&predicted, 51, 640, 480).unwrap();
        assert_eq!((full.x1, full.y1, full.x2, full.y2), (0, 0, 640, 480));
    }

    #[test]
    fn test_reacquires_displaced_target() {
        let patch = textured_patch(20, 20, 42);
        let background = gray_scene(160, 200, 6);
        let mut first = background.clone();
        paste_gray(&mut first, &patch, 60, 60);
        let signature = Signature::new(&first, BoundingBox::new(60, 60, 20, 20)).unwrap();

        let mut later = background.clone();
        paste_gray(&mut later, &patch, 85, 70);
        let found = recovery()
            .search(&later, &signature, &BoundingBox::new(60, 60, 20, 20), 3)
            .unwrap();
        assert_eq!(found.bbox, BoundingBox::new(85, 70, 20, 20));
        assert!(found.score > 0.99);
    }

    #[test]
    fn test_rejects_when_target_absent() {
        let patch = textured_patch(20, 20, 42);
        let background = gray_scene(160, 200, 6);
        let mut first = background.clone();
        paste_gray(&mut first, &patch, 60, 60);
        let signature = Signature::new(&first, BoundingBox::new(60, 60, 20, 20)).unwrap();

        let err = recovery()
            .search(&background, &signature, &BoundingBox::new(60, 60, 20, 20), 3)
            .unwrap_err();
        assert!(matches!(err, TrackError::NoMatch { .. }));
    }

    #[test]
    fn test_correlated_look_alike_fails_validation() {
        let target = two_tone(20, 42, [120, 0, 0], [200, 0, 0]);
        // same layout and brightness order, different colours and intensities
        let look_alike = two_tone(20, 42, [0, 255, 0], [100, 255, 255]);

        let first = gray_canvas_with(&target, 40, 40);
        let signature = Signature::new(&first, BoundingBox::new(40, 40, 20, 20)).unwrap();
        assert!(signature.has_color());

        let later = gray_canvas_with(&look_alike, 60, 50);
        let look_alike_box = BoundingBox::new(60, 50, 20, 20);
        let full_scale = signature
            .scales()
            .iter()
            .find(|v| v.scale == 1.0)
            .unwrap();
        let crop = later.gray_crop(&look_alike_box).unwrap();
        let raw = imgproc::match_template(&crop, &full_scale.pixels).unwrap();
        assert!(raw.score > 0.55);
        assert!(signature.quick_validate(&later, &look_alike_box) <= 0.55);

        let err = recovery()
            .search(&later, &signature, &BoundingBox::new(40, 40, 20, 20), 3)
            .unwrap_err();
        assert!(matches!(err, TrackError::NoMatch { .. }));

        let genuine = gray_canvas_with(&target, 60, 50);
        let found = recovery()
            .search(&genuine, &signature, &BoundingBox::new(40, 40, 20, 20), 3)
            .unwrap();
        assert_eq!(found.bbox, look_alike_box);
    }
}
