//! Owned pixel buffers handed to the tracker once per captured frame.

use ndarray::{Array2, Array3, ArrayView3, Axis, s};

use crate::tracker::error::TrackError;
use crate::tracker::rect::{BoundingBox, Window};

/// Grayscale working image; intensities stay on the 0..=255 scale.
pub type GrayImage = Array2<f32>;

/// A single captured frame, origin at the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Single channel, shape `(height, width)`.
    Gray(Array2<u8>),
    /// Interleaved RGB, shape `(height, width, 3)`.
    Rgb(Array3<u8>),
}

impl Frame {
    pub fn from_gray(pixels: Array2<u8>) -> Self {
        Self::Gray(pixels)
    }

    /// Wrap an `(height, width, 3)` RGB array.
    pub fn from_rgb(pixels: Array3<u8>) -> Result<Self, TrackError> {
        if pixels.len_of(Axis(2)) != 3 {
            return Err(TrackError::FrameShape {
                shape: pixels.shape().to_vec(),
            });
        }
        Ok(Self::Rgb(pixels))
    }

    /// Build a frame from a tightly packed row-major buffer with 1 or 3 channels.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, TrackError> {
        let shape_err = || TrackError::FrameShape {
            shape: vec![height, width, channels],
        };
        match channels {
            1 => Array2::from_shape_vec((height, width), data)
                .map(Self::Gray)
                .map_err(|_| shape_err()),
            3 => Array3::from_shape_vec((height, width, 3), data)
                .map(Self::Rgb)
                .map_err(|_| shape_err()),
            _ => Err(shape_err()),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        match self {
            Self::Gray(p) => p.ncols(),
            Self::Rgb(p) => p.len_of(Axis(1)),
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        match self {
            Self::Gray(p) => p.nrows(),
            Self::Rgb(p) => p.len_of(Axis(0)),
        }
    }

    #[inline]
    pub fn is_color(&self) -> bool {
        matches!(self, Self::Rgb(_))
    }

    /// Grayscale copy of a window that is already clipped to this frame.
    pub fn gray_window(&self, window: &Window) -> GrayImage {
        let (y1, y2) = (window.y1.min(self.height()), window.y2.min(self.height()));
        let (x1, x2) = (window.x1.min(self.width()), window.x2.min(self.width()));
        match self {
            Self::Gray(p) => p.slice(s![y1..y2, x1..x2]).mapv(f32::from),
            Self::Rgb(p) => {
                let view = p.slice(s![y1..y2, x1..x2, ..]);
                Array2::from_shape_fn((y2 - y1, x2 - x1), |(y, x)| {
                    luma(view[[y, x, 0]], view[[y, x, 1]], view[[y, x, 2]])
                })
            }
        }
    }

    /// Grayscale copy of `bbox`; fails if the box reaches outside the buffer.
    pub fn gray_crop(&self, bbox: &BoundingBox) -> Result<GrayImage, TrackError> {
        let window = self.checked_window(bbox)?;
        Ok(self.gray_window(&window))
    }

    /// RGB view of `bbox`, or `None` for a single-channel frame.
    pub fn rgb_crop(&self, bbox: &BoundingBox) -> Result<Option<ArrayView3<'_, u8>>, TrackError> {
        let w = self.checked_window(bbox)?;
        Ok(match self {
            Self::Gray(_) => None,
            Self::Rgb(p) => Some(p.slice(s![w.y1..w.y2, w.x1..w.x2, ..])),
        })
    }

    fn checked_window(&self, bbox: &BoundingBox) -> Result<Window, TrackError> {
        if !bbox.fits_within(self.width(), self.height()) {
            return Err(TrackError::OutOfBounds {
                bbox: *bbox,
                frame_width: self.width(),
                frame_height: self.height(),
            });
        }
        Ok(Window {
            x1: bbox.x as usize,
            y1: bbox.y as usize,
            x2: (bbox.x + bbox.width) as usize,
            y2: (bbox.y + bbox.height) as usize,
        })
    }
}

/// ITU-R BT.601 luma.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}
