use serde::{Deserialize, Serialize};

/// Smallest side length a box may have to be considered trackable.
pub const MIN_BOX_SIDE: i32 = 8;

/// Integer pixel rectangle with a top-left origin.
///
/// Supports the formats callers typically hand around:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub x: i32,
    /// Top-left y coordinate
    pub y: i32,
    /// Width of the bounding box
    pub width: i32,
    /// Height of the bounding box
    pub height: i32,
}

impl BoundingBox {
    /// Create a new box from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a box of the given size whose integer center is `(cx, cy)`.
    #[inline]
    pub fn from_center(cx: i32, cy: i32, width: i32, height: i32) -> Self {
        Self {
            x: cx - width / 2,
            y: cy - height / 2,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [i32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Integer center point, rounded toward the top-left.
    #[inline]
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Width over height; zero for a degenerate height.
    #[inline]
    pub fn aspect(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            0.0
        }
    }

    #[inline]
    pub fn max_side(&self) -> i32 {
        self.width.max(self.height)
    }

    /// Whether both sides are strictly positive.
    #[inline]
    pub fn is_non_empty(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether the whole box lies inside a `frame_width` x `frame_height` frame.
    pub fn fits_within(&self, frame_width: usize, frame_height: usize) -> bool {
        self.is_non_empty()
            && self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= frame_width as i64
            && self.y as i64 + self.height as i64 <= frame_height as i64
    }

    /// Trackable box: inside the frame and at least [`MIN_BOX_SIDE`] on both sides.
    pub fn is_valid_in(&self, frame_width: usize, frame_height: usize) -> bool {
        self.width >= MIN_BOX_SIDE
            && self.height >= MIN_BOX_SIDE
            && self.fits_within(frame_width, frame_height)
    }
}

/// Half-open pixel region `[x1, x2) x [y1, y2)` already clipped to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl Window {
    /// The square region of half-width `half` around `(cx, cy)`, clipped to the frame.
    ///
    /// Returns `None` when the clipped region is empty.
    pub fn around(
        cx: i32,
        cy: i32,
        half: i32,
        frame_width: usize,
        frame_height: usize,
    ) -> Option<Self> {
        let clip = |v: i64, max: usize| v.clamp(0, max as i64) as usize;
        let window = Self {
            x1: clip(cx as i64 - half as i64, frame_width),
            y1: clip(cy as i64 - half as i64, frame_height),
            x2: clip(cx as i64 + half as i64, frame_width),
            y2: clip(cy as i64 + half as i64, frame_height),
        };
        (window.width() > 0 && window.height() > 0).then_some(window)
    }

    /// The whole frame.
    pub fn full(frame_width: usize, frame_height: usize) -> Option<Self> {
        (frame_width > 0 && frame_height > 0).then_some(Self {
            x1: 0,
            y1: 0,
            x2: frame_width,
            y2: frame_height,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x2.saturating_sub(self.x1)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y2.saturating_sub(self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_conversions() {
        let bbox = BoundingBox::new(10, 20, 30, 40);

        assert_eq!(bbox.to_tlwh(), [10, 20, 30, 40]);
        assert_eq!(bbox.to_tlbr(), [10, 20, 40, 60]);
        assert_eq!(bbox.center(), (25, 40));
        assert!((bbox.aspect() - 0.75).abs() < 1e-6);
        assert_eq!(BoundingBox::from_tlbr(10, 20, 40, 60), bbox);
        assert_eq!(BoundingBox::from_center(25, 40, 30, 40), bbox);
    }

    #[test]
    fn test_validity() {
        assert!(BoundingBox::new(0, 0, 8, 8).is_valid_in(8, 8));
        assert!(!BoundingBox::new(0, 0, 7, 8).is_valid_in(100, 100));
        assert!(!BoundingBox::new(-1, 0, 10, 10).is_valid_in(100, 100));
        assert!(!BoundingBox::new(95, 0, 10, 10).is_valid_in(100, 100));
        assert!(!BoundingBox::new(0, 0, 0, 10).fits_within(100, 100));
    }

    #[test]
    fn test_window_clipping() {
        let w = Window::around(10, 10, 25, 100, 50).unwrap();
        assert_eq!((w.x1, w.y1, w.x2, w.y2), (0, 0, 35, 35));

        let w = Window::around(90, 45, 25, 100, 50).unwrap();
        assert_eq!((w.x1, w.y1, w.x2, w.y2), (65, 20, 100, 50));

        assert!(Window::around(-100, -100, 10, 100, 50).is_none());
        assert_eq!(Window::full(4, 3).map(|w| (w.width(), w.height())), Some((4, 3)));
    }
}
