/// RGBA color.
pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const RED: Rgba = [255, 0, 0, 255];
/// Fully transparent background.
pub const CLEAR: Rgba = [255, 0, 0, 0];

/// Minimal RGBA raster with clipped primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&fill);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[idx..idx + 4]);
        Some(px)
    }

    /// Set a pixel; coordinates outside the canvas are ignored.
    pub fn put(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.data[idx..idx + 4].copy_from_slice(&color);
    }

    pub fn vline(&mut self, x: i64, color: Rgba) {
        for y in 0..self.height as i64 {
            self.put(x, y, color);
        }
    }

    /// One-pixel rectangle outline, corners inclusive.
    pub fn rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        for x in x0..=x1 {
            self.put(x, y0, color);
            self.put(x, y1, color);
        }
        for y in y0..=y1 {
            self.put(x0, y, color);
            self.put(x1, y, color);
        }
    }

    /// Small plus-shaped marker.
    pub fn marker(&mut self, x: i64, y: i64, color: Rgba) {
        for d in -2..=2 {
            self.put(x + d, y, color);
            self.put(x, y + d, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_clip_to_bounds() {
        let mut canvas = Canvas::new(4, 3, CLEAR);
        canvas.rect(-5, -5, 10, 10, RED);
        canvas.marker(0, 0, WHITE);
        canvas.vline(9, WHITE);
        assert_eq!(canvas.as_bytes().len(), 4 * 3 * 4);
        assert_eq!(canvas.pixel(0, 0), Some(WHITE));
        assert_eq!(canvas.pixel(3, 2), Some(CLEAR));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn rect_draws_outline_only() {
        let mut canvas = Canvas::new(5, 5, CLEAR);
        canvas.rect(0, 0, 4, 4, RED);
        assert_eq!(canvas.pixel(0, 2), Some(RED));
        assert_eq!(canvas.pixel(4, 4), Some(RED));
        assert_eq!(canvas.pixel(2, 2), Some(CLEAR));
    }
}
