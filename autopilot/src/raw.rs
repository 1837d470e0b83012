use aedoom_core::{Frame, FrameSource};
use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Read};

/// Reads back-to-back RGB24 frames of a fixed size, e.g. piped from a renderer.
pub struct RawRgbSource<R> {
    reader: R,
    width: usize,
    height: usize,
    buf: Vec<u8>,
    frames: u64,
}

impl<R: Read> RawRgbSource<R> {
    pub fn new(reader: R, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "raw frame dimensions must be non-zero, got {width}x{height}"
            ));
        }
        Ok(Self {
            reader,
            width,
            height,
            buf: vec![0; width * height * 3],
            frames: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Fills the buffer. Returns false on a clean end of stream at a frame boundary.
    fn fill(&mut self) -> Result<bool> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(anyhow!(
                        "truncated frame {}: got {filled} of {} bytes",
                        self.frames,
                        self.buf.len()
                    ))
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    let frame = self.frames;
                    return Err(err).with_context(|| format!("failed reading frame {frame}"));
                }
            }
        }
        Ok(true)
    }
}

impl<R: Read> FrameSource for RawRgbSource<R> {
    type Error = anyhow::Error;

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.fill()? {
            return Ok(None);
        }
        self.frames += 1;
        Ok(Some(Frame::from_rgb(self.width, self.height, &self.buf)?))
    }
}
