//! Fast localized multi-scale correlation tracker.

use crate::tracker::error::TrackError;
use crate::tracker::frame::{Frame, GrayImage};
use crate::tracker::hybrid_tracker::TrackerConfig;
use crate::tracker::imgproc::{self, SearchImage, TemplateMatch};
use crate::tracker::rect::{BoundingBox, Window};
use crate::tracker::signature::ScaledTemplate;

/// Scale factors searched around the last position every frame.
pub const CORE_SCALES: [f32; 3] = [0.9, 1.0, 1.1];
/// A scale variant is kept only if both of its sides reach this size.
pub const MIN_CORE_SIDE: usize = 10;

/// Follows the target frame to frame by matching a slowly adapting template
/// inside a window centered on the last accepted box.
#[derive(Debug, Clone)]
pub struct CoreTracker {
    /// Full-size grayscale template; the only state blended in place.
    template: GrayImage,
    variants: Vec<ScaledTemplate>,
    bbox: BoundingBox,
    last_score: f32,
    match_threshold: f32,
    adapt_threshold: f32,
    adapt_rate: f32,
    search_scale: f32,
}

impl CoreTracker {
    pub fn new(frame: &Frame, bbox: BoundingBox, config: &TrackerConfig) -> Result<Self, TrackError> {
        let template = frame.gray_crop(&bbox)?;
        let variants = build_variants(&template);
        if variants.is_empty() {
            return Err(TrackError::DegenerateGeometry {
                bbox,
                min_side: MIN_CORE_SIDE as i32,
            });
        }

        Ok(Self {
            template,
            variants,
            bbox,
            last_score: 1.0,
            match_threshold: config.match_threshold,
            adapt_threshold: config.adapt_threshold,
            adapt_rate: config.adapt_rate,
            search_scale: config.search_scale,
        })
    }

    /// Search around the last box and move to the best match.
    ///
    /// On failure the stored box is left untouched and `NoMatch` (or
    /// `OutOfBounds` when the window misses the frame entirely) is returned.
    pub fn update(&mut self, frame: &Frame) -> Result<BoundingBox, TrackError> {
        let (cx, cy) = self.bbox.center();
        let half = (self.bbox.max_side() as f32 * self.search_scale) as i32;
        let window = Window::around(cx, cy, half, frame.width(), frame.height()).ok_or(
            TrackError::OutOfBounds {
                bbox: self.bbox,
                frame_width: frame.width(),
                frame_height: frame.height(),
            },
        )?;
        let mut region = SearchImage::new(&frame.gray_window(&window));

        let mut best: Option<(TemplateMatch, usize, usize)> = None;
        for variant in &self.variants {
            let Some(m) = region.best_match(&variant.pixels) else {
                continue;
            };
            if best.is_none_or(|(b, _, _)| m.score > b.score) {
                best = Some((m, variant.width(), variant.height()));
            }
        }

        match best {
            Some((m, w, h)) if m.score > self.match_threshold => {
                let bbox = BoundingBox::new(
                    (window.x1 + m.x) as i32,
                    (window.y1 + m.y) as i32,
                    w as i32,
                    h as i32,
                );
                self.bbox = bbox;
                self.last_score = m.score;
                if m.score > self.adapt_threshold {
                    self.adapt(frame);
                }
                Ok(bbox)
            }
            _ => Err(TrackError::NoMatch {
                threshold: self.match_threshold,
            }),
        }
    }

    /// Blend the freshly observed crop into the template and rebuild the
    /// scale variants from the result.
    fn adapt(&mut self, frame: &Frame) {
        let Ok(observed) = frame.gray_crop(&self.bbox) else {
            return;
        };
        let (th, tw) = self.template.dim();
        let observed = imgproc::resize(&observed, tw, th);
        imgproc::blend_into(&mut self.template, &observed, self.adapt_rate);
        self.variants = build_variants(&self.template);
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Correlation score of the last accepted match.
    pub fn last_score(&self) -> f32 {
        self.last_score
    }

    pub fn template(&self) -> &GrayImage {
        &self.template
    }

    pub fn variants(&self) -> &[ScaledTemplate] {
        &self.variants
    }
}

fn build_variants(template: &GrayImage) -> Vec<ScaledTemplate> {
    let (h, w) = template.dim();
    CORE_SCALES
        .iter()
        .filter_map(|&scale| {
            let sw = (w as f32 * scale) as usize;
            let sh = (h as f32 * scale) as usize;
            (sw >= MIN_CORE_SIDE && sh >= MIN_CORE_SIDE).then(|| ScaledTemplate {
                scale,
                pixels: imgproc::resize(template, sw, sh),
            })
        })
        .collect()
}
