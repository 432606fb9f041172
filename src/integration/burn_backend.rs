//! Burn inference backend for target detection.
//!
//! This module provides a `BurnDetector` that implements `TargetDetector`
//! for running detection models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use hybridtrack_rs::integration::{BurnDetector, BurnModel, RawDetection};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection model
//! struct MyYoloModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyYoloModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         // Run inference
//!     }
//! }
//!
//! let model = MyYoloModel::load("model.bin");
//! let detector = BurnDetector::new(model, Default::default());
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use ndarray::Axis;
use thiserror::Error;

use super::{Detection, DetectionBuilder, TargetDetector};
use crate::tracker::imgproc;
use crate::tracker::{Frame, GrayImage, Window};

/// Error type for Burn detection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BurnDetectorError {
    /// The frame has no pixels.
    #[error("cannot run detection on an empty {width}x{height} frame")]
    EmptyFrame { width: usize, height: usize },
    /// The model asks for a channel count frames cannot provide.
    #[error("model expects {0} input channels, only 1 or 3 are supported")]
    UnsupportedChannels(u32),
}

/// Raw detection output from the model, in model input pixel coordinates.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    /// Confidence score
    pub score: f32,
    /// Class ID (optional, for multi-class detection)
    pub class_id: Option<usize>,
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [batch, channels, height, width]
    ///
    /// # Returns
    /// Vector of raw detections after the model's own filtering.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 640, 640) // Default YOLO input size
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        true // Most YOLO variants use XYWH
    }
}

/// Burn-based target detector implementing `TargetDetector`.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    conf_threshold: f32,
    class_filter: Option<usize>,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            conf_threshold: 0.25,
            class_filter: None,
        }
    }

    /// Set the confidence threshold for filtering detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Only keep detections of one class.
    pub fn with_class(mut self, class_id: usize) -> Self {
        self.class_filter = Some(class_id);
        self
    }

    /// Resize a frame to the model input and pack it as a `[1, C, H, W]`
    /// tensor with intensities in `[0, 1]`.
    pub fn preprocess(&self, frame: &Frame) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let (channels, target_h, target_w) = self.model.input_size();
        let (target_h, target_w) = (target_h as usize, target_w as usize);

        let planes = channel_planes(frame, channels)?;
        let mut data = Vec::with_capacity(planes.len() * target_h * target_w);
        for plane in &planes {
            let resized = imgproc::resize(plane, target_w, target_h);
            data.extend(resized.iter().map(|&v| v / 255.0));
        }

        Ok(
            Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
                1,
                planes.len(),
                target_h,
                target_w,
            ]),
        )
    }

    /// Convert raw model outputs to frame-space detections.
    fn postprocess(&self, frame: &Frame, raw_detections: Vec<RawDetection>) -> Vec<Detection> {
        let (_, model_h, model_w) = self.model.input_size();
        let (sx, sy) = (1.0 / model_w as f32, 1.0 / model_h as f32);
        raw_detections
            .into_iter()
            .filter(|d| d.score >= self.conf_threshold)
            .filter(|d| self.class_filter.is_none_or(|c| d.class_id == Some(c)))
            .map(|d| {
                let [a, b, c, e] = d.bbox;
                let builder = DetectionBuilder::new().score(d.score);
                let builder = if self.model.bbox_is_xywh() {
                    builder.xywh(a * sx, b * sy, c * sx, e * sy)
                } else {
                    builder.tlbr(a * sx, b * sy, c * sx, e * sy)
                };
                builder.denormalize(frame.width(), frame.height()).build()
            })
            .collect()
    }
}

/// Split a frame into `channels` f32 planes on the 0..=255 scale.
fn channel_planes(frame: &Frame, channels: u32) -> Result<Vec<GrayImage>, BurnDetectorError> {
    let (width, height) = (frame.width(), frame.height());
    let Some(full) = Window::full(width, height) else {
        return Err(BurnDetectorError::EmptyFrame { width, height });
    };
    match (channels, frame) {
        (1, _) => Ok(vec![frame.gray_window(&full)]),
        (3, Frame::Rgb(pixels)) => Ok(pixels
            .axis_iter(Axis(2))
            .map(|plane| plane.mapv(f32::from))
            .collect()),
        (3, Frame::Gray(pixels)) => {
            let plane = pixels.mapv(f32::from);
            Ok(vec![plane.clone(), plane.clone(), plane])
        }
        (n, _) => Err(BurnDetectorError::UnsupportedChannels(n)),
    }
}

impl<B: Backend, M: BurnModel<B>> TargetDetector for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(frame)?;
        let raw_detections = self.model.forward(tensor);
        Ok(self.postprocess(frame, raw_detections))
    }
}
