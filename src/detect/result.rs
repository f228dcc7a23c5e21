/// Axis-aligned box in normalized `[0, 1]` frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Clamp every edge into `[0, 1]` and order each pair so `x0 <= x1`, `y0 <= y1`.
    pub fn normalized(self) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let (x0, x1) = (clamp(self.x0), clamp(self.x1));
        let (y0, y1) = (clamp(self.y0), clamp(self.y1));
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Scale to pixel space.
    pub fn to_pixels(self, width: u32, height: u32) -> PixelBox {
        let w = width as f32;
        let h = height as f32;
        PixelBox {
            x0: self.x0 * w,
            y0: self.y0 * h,
            x1: self.x1 * w,
            y1: self.y1 * h,
        }
    }
}

/// Box in pixel coordinates of a specific frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PixelBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x0 + self.width() / 2.0,
            self.y0 + self.height() / 2.0,
        )
    }
}

/// One object reported by a detector backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label_id: u32,
    pub score: f32,
}

/// Detections for one frame, in backend order.
pub type DetectionSet = Vec<Detection>;
