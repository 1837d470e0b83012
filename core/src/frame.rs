use crate::error::{EngineError, EngineResult};

/// 8-bit luminance raster. Color input is converted once on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl Frame {
    pub fn from_gray(width: usize, height: usize, luma: Vec<u8>) -> EngineResult<Self> {
        check_len(width, height, 1, luma.len())?;
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// Builds a frame from interleaved gray, RGB or RGBA bytes (alpha is ignored).
    pub fn from_interleaved(
        width: usize,
        height: usize,
        channels: usize,
        bytes: &[u8],
    ) -> EngineResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(EngineError::UnsupportedChannels { channels });
        }
        check_len(width, height, channels, bytes.len())?;
        let luma = if channels == 1 {
            bytes.to_vec()
        } else {
            bytes
                .chunks_exact(channels)
                .map(|px| luminance(px[0], px[1], px[2]))
                .collect()
        };
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    pub fn from_rgb(width: usize, height: usize, bytes: &[u8]) -> EngineResult<Self> {
        Self::from_interleaved(width, height, 3, bytes)
    }

    pub fn from_rgba(width: usize, height: usize, bytes: &[u8]) -> EngineResult<Self> {
        Self::from_interleaved(width, height, 4, bytes)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width + x]
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }
}

fn check_len(width: usize, height: usize, channels: usize, actual: usize) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::EmptyFrame { width, height });
    }
    let expected = width * height * channels;
    if actual != expected {
        return Err(EngineError::FrameSizeMismatch { expected, actual });
    }
    Ok(())
}

/// Gray level of an 8-bit RGB pixel, using 16-bit fixed-point Rec. 601 weights.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (
        u32::from(r) * 0x101,
        u32::from(g) * 0x101,
        u32::from(b) * 0x101,
    );
    ((19595 * r + 38470 * g + 7471 * b + (1 << 15)) >> 24) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_keeps_gray_levels() {
        for level in [0u8, 1, 77, 128, 200, 255] {
            assert_eq!(luminance(level, level, level), level);
        }
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
    }

    #[test]
    fn rgba_ignores_alpha() {
        let frame = Frame::from_rgba(2, 1, &[10, 10, 10, 0, 250, 250, 250, 255]).expect("frame");
        assert_eq!(frame.luma(), &[10, 250]);
    }

    #[test]
    fn rejects_bad_buffers() {
        assert_eq!(
            Frame::from_rgb(4, 4, &[0; 47]),
            Err(EngineError::FrameSizeMismatch {
                expected: 48,
                actual: 47
            })
        );
        assert_eq!(
            Frame::from_interleaved(1, 1, 2, &[0, 0]),
            Err(EngineError::UnsupportedChannels { channels: 2 })
        );
        assert_eq!(
            Frame::from_gray(0, 3, Vec::new()),
            Err(EngineError::EmptyFrame {
                width: 0,
                height: 3
            })
        );
    }
}
