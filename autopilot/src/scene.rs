use aedoom_core::rng::seeded;
use aedoom_core::{Frame, FrameSource};
use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Built-in frame generators used when no external renderer is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Static frame: reddish left half, bluish right half.
    Split,
    /// Bright vertical bar drifting right one pixel per frame over a dark floor.
    Bar,
    /// Independent uniform noise on every pixel of every frame.
    Noise,
}

impl SceneKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Bar => "bar",
            Self::Noise => "noise",
        }
    }
}

const SPLIT_LEFT_RGB: [u8; 3] = [180, 40, 40];
const SPLIT_RIGHT_RGB: [u8; 3] = [30, 60, 200];
const BAR_FLOOR: u8 = 24;
const BAR_LEVEL: u8 = 230;
const BAR_WIDTH: usize = 6;

pub struct SyntheticScene {
    kind: SceneKind,
    width: usize,
    height: usize,
    limit: u64,
    index: u64,
    rng: StdRng,
}

impl SyntheticScene {
    pub fn new(
        kind: SceneKind,
        width: usize,
        height: usize,
        frames: u64,
        seed: u64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("scene dimensions must be non-zero, got {width}x{height}"));
        }
        Ok(Self {
            kind,
            width,
            height,
            limit: frames,
            index: 0,
            rng: seeded(seed),
        })
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    fn render(&mut self) -> Result<Frame> {
        let (w, h) = (self.width, self.height);
        let frame = match self.kind {
            SceneKind::Split => {
                let mut rgb = Vec::with_capacity(w * h * 3);
                for _ in 0..h {
                    for x in 0..w {
                        let color = if x < w / 2 { SPLIT_LEFT_RGB } else { SPLIT_RIGHT_RGB };
                        rgb.extend_from_slice(&color);
                    }
                }
                Frame::from_rgb(w, h, &rgb)?
            }
            SceneKind::Bar => {
                let start = (self.index % w as u64) as usize;
                let luma = (0..h)
                    .flat_map(|_| {
                        (0..w).map(move |x| {
                            let offset = (x + w - start) % w;
                            if offset < BAR_WIDTH {
                                BAR_LEVEL
                            } else {
                                BAR_FLOOR
                            }
                        })
                    })
                    .collect();
                Frame::from_gray(w, h, luma)?
            }
            SceneKind::Noise => {
                let mut luma = vec![0u8; w * h];
                self.rng.fill(luma.as_mut_slice());
                Frame::from_gray(w, h, luma)?
            }
        };
        Ok(frame)
    }
}

impl FrameSource for SyntheticScene {
    type Error = anyhow::Error;

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.index >= self.limit {
            return Ok(None);
        }
        let frame = self.render()?;
        self.index += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_the_requested_frame_count() -> Result<()> {
        let mut scene = SyntheticScene::new(SceneKind::Split, 16, 8, 3, 1)?;
        let mut count = 0;
        while scene.next_frame()?.is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(scene.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn split_halves_are_flat() -> Result<()> {
        let mut scene = SyntheticScene::new(SceneKind::Split, 16, 4, 1, 1)?;
        let frame = scene.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        let left = frame.luma_at(0, 0);
        let right = frame.luma_at(15, 3);
        assert_ne!(left, right);
        assert!((0..8).all(|x| frame.luma_at(x, 2) == left));
        assert!((8..16).all(|x| frame.luma_at(x, 1) == right));
        Ok(())
    }

    #[test]
    fn bar_drifts_one_pixel_per_frame() -> Result<()> {
        let mut scene = SyntheticScene::new(SceneKind::Bar, 20, 2, 2, 1)?;
        let first = scene.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        let second = scene.next_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        assert_eq!(first.luma_at(0, 0), BAR_LEVEL);
        assert_eq!(second.luma_at(0, 0), BAR_FLOOR);
        assert_eq!(second.luma_at(BAR_WIDTH, 1), BAR_LEVEL);
        Ok(())
    }

    #[test]
    fn noise_is_seeded() -> Result<()> {
        let mut a = SyntheticScene::new(SceneKind::Noise, 8, 8, 1, 9)?;
        let mut b = SyntheticScene::new(SceneKind::Noise, 8, 8, 1, 9)?;
        assert_eq!(a.next_frame()?, b.next_frame()?);
        Ok(())
    }
}
