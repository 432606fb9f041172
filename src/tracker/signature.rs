//! Appearance signature used to decide whether a candidate box still shows
//! the originally selected target.

use ndarray::Array1;

use crate::tracker::error::TrackError;
use crate::tracker::frame::{Frame, GrayImage};
use crate::tracker::imgproc::{self, correlation, histogram_correlation};
use crate::tracker::rect::{BoundingBox, MIN_BOX_SIDE};

/// Side of the square comparison template.
pub const TEMPLATE_SIDE: usize = 32;
/// Scale factors of the recovery search variants.
pub const SEARCH_SCALES: [f32; 3] = [0.7, 1.0, 1.4];
/// A search variant is kept only if both of its sides reach this size.
pub const MIN_VARIANT_SIDE: usize = 12;

const MAX_ASPECT_DEVIATION: f32 = 0.5;
const MIN_AREA_RATIO: f32 = 0.3;
const MAX_AREA_RATIO: f32 = 4.0;
const MIN_TEMPLATE_SCORE: f32 = 0.45;

/// A pre-scaled grayscale rendition of the target crop.
#[derive(Debug, Clone)]
pub struct ScaledTemplate {
    pub scale: f32,
    pub pixels: GrayImage,
}

impl ScaledTemplate {
    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }
}

/// Multi-cue appearance descriptor built once from the selected crop.
///
/// Immutable after construction; re-acquisition builds a new one.
#[derive(Debug, Clone)]
pub struct Signature {
    template: GrayImage,
    intensity_hist: Array1<f32>,
    color_hist: Option<Array1<f32>>,
    aspect: f32,
    area: f32,
    scales: Vec<ScaledTemplate>,
}

impl Signature {
    pub fn new(frame: &Frame, bbox: BoundingBox) -> Result<Self, TrackError> {
        if bbox.width < MIN_BOX_SIDE || bbox.height < MIN_BOX_SIDE {
            return Err(TrackError::DegenerateGeometry {
                bbox,
                min_side: MIN_BOX_SIDE,
            });
        }
        let gray = frame.gray_crop(&bbox)?;

        let template = imgproc::resize(&gray, TEMPLATE_SIDE, TEMPLATE_SIDE);
        let intensity_hist = imgproc::intensity_histogram(&template);
        let color_hist = frame
            .rgb_crop(&bbox)?
            .map(|rgb| imgproc::hue_saturation_histogram(&rgb));

        let scales = SEARCH_SCALES
            .iter()
            .filter_map(|&scale| {
                let sw = (bbox.width as f32 * scale) as usize;
                let sh = (bbox.height as f32 * scale) as usize;
                (sw >= MIN_VARIANT_SIDE && sh >= MIN_VARIANT_SIDE).then(|| ScaledTemplate {
                    scale,
                    pixels: imgproc::resize(&gray, sw, sh),
                })
            })
            .collect();

        Ok(Self {
            template,
            intensity_hist,
            color_hist,
            aspect: bbox.aspect(),
            area: bbox.area() as f32,
            scales,
        })
    }

    /// Fused appearance score in [0, 1]; every failure kind scores 0.
    pub fn quick_validate(&self, frame: &Frame, candidate: &BoundingBox) -> f32 {
        self.try_validate(frame, candidate).unwrap_or(0.0)
    }

    /// Like [`quick_validate`](Self::quick_validate) but reports why a
    /// candidate was rejected.
    pub fn try_validate(&self, frame: &Frame, candidate: &BoundingBox) -> Result<f32, TrackError> {
        if !candidate.fits_within(frame.width(), frame.height()) {
            return Err(TrackError::OutOfBounds {
                bbox: *candidate,
                frame_width: frame.width(),
                frame_height: frame.height(),
            });
        }
        let degenerate = || TrackError::DegenerateGeometry {
            bbox: *candidate,
            min_side: MIN_BOX_SIDE,
        };
        if candidate.width < MIN_BOX_SIDE || candidate.height < MIN_BOX_SIDE {
            return Err(degenerate());
        }
        if (candidate.aspect() - self.aspect).abs() / self.aspect > MAX_ASPECT_DEVIATION {
            return Err(degenerate());
        }
        let area_ratio = candidate.area() as f32 / self.area;
        if !(MIN_AREA_RATIO..=MAX_AREA_RATIO).contains(&area_ratio) {
            return Err(degenerate());
        }

        let gray = frame.gray_crop(candidate)?;
        let resized = imgproc::resize(&gray, TEMPLATE_SIDE, TEMPLATE_SIDE);
        let template_score = correlation(&resized, &self.template);
        if template_score < MIN_TEMPLATE_SCORE {
            return Err(TrackError::NoMatch {
                threshold: MIN_TEMPLATE_SCORE,
            });
        }

        let hist_score =
            histogram_correlation(&imgproc::intensity_histogram(&resized), &self.intensity_hist);

        let candidate_color = frame
            .rgb_crop(candidate)?
            .map(|rgb| imgproc::hue_saturation_histogram(&rgb));
        let fused = match (&self.color_hist, candidate_color) {
            (Some(stored), Some(observed)) => {
                let color_score = histogram_correlation(&observed, stored);
                0.5 * template_score + 0.2 * hist_score + 0.3 * color_score
            }
            _ => 0.6 * template_score + 0.4 * hist_score,
        };
        Ok(fused.clamp(0.0, 1.0))
    }

    /// Grayscale variants for windowed recovery search, smallest scale first.
    pub fn scales(&self) -> &[ScaledTemplate] {
        &self.scales
    }

    pub fn has_color(&self) -> bool {
        self.color_hist.is_some()
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn area(&self) -> f32 {
        self.area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_util::{gray_scene, paste_gray, rgb_scene, textured_patch};
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_tiny_boxes() {
        let frame = gray_scene(64, 64, 1);
        let err = Signature::new(&frame, BoundingBox::new(0, 0, 7, 20)).unwrap_err();
        assert!(matches!(err, TrackError::DegenerateGeometry { .. }));

        let err = Signature::new(&frame, BoundingBox::new(60, 0, 10, 10)).unwrap_err();
        assert!(matches!(err, TrackError::OutOfBounds { .. }));
    }

    #[test]
    fn test_scale_variants_respect_min_side() {
        let frame = gray_scene(100, 100, 2);
        let sig = Signature::new(&frame, BoundingBox::new(10, 10, 16, 40)).unwrap();
        // 0.7 * 16 = 11 < 12, dropped
        let scales: Vec<f32> = sig.scales().iter().map(|s| s.scale).collect();
        assert_eq!(scales, vec![1.0, 1.4]);
        assert_eq!(sig.scales()[1].width(), 22);
        assert!((55..=56).contains(&sig.scales()[1].height()));
        assert!(!sig.has_color());
    }

    #[test]
    fn test_same_region_validates_fully() {
        let frame = gray_scene(120, 120, 3);
        let bbox = BoundingBox::new(30, 40, 24, 24);
        let sig = Signature::new(&frame, bbox).unwrap();
        assert_relative_eq!(sig.quick_validate(&frame, &bbox), 1.0, epsilon = 1e-4);

        let rgb = rgb_scene(120, 120, 3);
        let sig = Signature::new(&rgb, bbox).unwrap();
        assert!(sig.has_color());
        assert_relative_eq!(sig.quick_validate(&rgb, &bbox), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_geometry_gates() {
        let frame = gray_scene(200, 200, 4);
        let sig = Signature::new(&frame, BoundingBox::new(50, 50, 40, 40)).unwrap();

        // out of frame
        assert_eq!(sig.quick_validate(&frame, &BoundingBox::new(180, 50, 40, 40)), 0.0);
        // aspect 2.0 vs 1.0
        assert_eq!(sig.quick_validate(&frame, &BoundingBox::new(50, 50, 40, 20)), 0.0);
        // area ratio 0.25
        assert_eq!(sig.quick_validate(&frame, &BoundingBox::new(50, 50, 20, 20)), 0.0);
        // area ratio 4.41
        assert_eq!(sig.quick_validate(&frame, &BoundingBox::new(0, 0, 84, 84)), 0.0);
    }

    #[test]
    fn test_unrelated_content_fails_template_gate() {
        let frame = gray_scene(120, 120, 5);
        let bbox = BoundingBox::new(30, 30, 30, 30);
        let sig = Signature::new(&frame, bbox).unwrap();

        let mut occluded = frame.clone();
        paste_gray(&mut occluded, &textured_patch(30, 30, 99), 30, 30);
        let err = sig.try_validate(&occluded, &bbox).unwrap_err();
        assert!(matches!(err, TrackError::NoMatch { .. }));
        assert_eq!(sig.quick_validate(&occluded, &bbox), 0.0);
    }
}
