//! Captured camera frames.
//!
//! A `Frame` is an immutable RGB24 buffer of fixed dimensions. It is produced
//! once per capture cycle by a `FrameSource`, handed to the detector by
//! reference, and dropped at the end of the control-loop iteration.

use anyhow::{anyhow, Result};

/// Immutable RGB24 frame.
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Sequence number assigned by the source (1-based).
    pub sequence: u64,
}

impl Frame {
    /// Wrap an RGB24 buffer. The length must be exactly `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Return a copy rotated by 180 degrees (camera mounted upside down).
    pub fn rotated_180(self) -> Self {
        let Frame {
            mut data,
            width,
            height,
            sequence,
        } = self;
        let pixel_count = data.len() / 3;
        for i in 0..pixel_count / 2 {
            let j = pixel_count - 1 - i;
            for c in 0..3 {
                data.swap(i * 3 + c, j * 3 + c);
            }
        }
        Self {
            data,
            width,
            height,
            sequence,
        }
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 10], 2, 2, 1).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2, 1).is_ok());
    }

    #[test]
    fn rotation_reverses_pixel_order() -> Result<()> {
        // Three pixels in a 3x1 strip: red, green, blue.
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255];
        let frame = Frame::new(data, 3, 1, 7)?.rotated_180();
        assert_eq!(frame.pixels(), &[0, 0, 255, 0, 255, 0, 255, 0, 0]);
        assert_eq!(frame.sequence, 7);
        Ok(())
    }
}
