//! Cuts frames into square luminance patches.

use crate::constants::LUMA_LEVELS;
use crate::frame::Frame;
use rand::Rng;
use rand_distr::StandardNormal;

/// Position of a patch cell in the grid, plus its row-major index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub index: usize,
    pub col: usize,
    pub row: usize,
}

/// Number of whole cells that fit a frame; partial border cells are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub cols: usize,
    pub rows: usize,
    pub edge: usize,
}

impl GridShape {
    pub fn for_frame(width: usize, height: usize, edge: usize) -> Self {
        Self {
            cols: width / edge,
            rows: height / edge,
            edge,
        }
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, index: usize) -> Cell {
        Cell {
            index,
            col: index % self.cols,
            row: index / self.cols,
        }
    }
}

/// One cell's training example.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    /// Target plus Gaussian noise, clamped to [0, 1].
    pub input: Vec<f32>,
    /// Luminance normalized to [0, 1].
    pub target: Vec<f32>,
    /// Shannon entropy (bits) of the cell's luminance histogram.
    pub entropy: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchExtractor {
    edge: usize,
    noise_scale: f32,
}

impl PatchExtractor {
    pub fn new(edge: usize, noise_scale: f32) -> Self {
        Self { edge, noise_scale }
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn extract<R: Rng + ?Sized>(&self, frame: &Frame, cell: Cell, rng: &mut R) -> Patch {
        let edge = self.edge;
        let (x0, y0) = (cell.col * edge, cell.row * edge);
        let mut levels = Vec::with_capacity(edge * edge);
        for y in y0..y0 + edge {
            for x in x0..x0 + edge {
                levels.push(frame.luma_at(x, y));
            }
        }

        let target: Vec<f32> = levels.iter().map(|&l| f32::from(l) / 255.0).collect();
        let input = target
            .iter()
            .map(|&pixel| {
                let noise: f64 = rng.sample(StandardNormal);
                (pixel + noise as f32 * self.noise_scale).clamp(0.0, 1.0)
            })
            .collect();

        Patch {
            input,
            target,
            entropy: shannon_entropy(&levels),
        }
    }
}

/// Entropy in bits of the empirical distribution of `levels`.
pub fn shannon_entropy(levels: &[u8]) -> f32 {
    if levels.is_empty() {
        return 0.0;
    }
    let mut histogram = [0u32; LUMA_LEVELS];
    for &level in levels {
        histogram[usize::from(level)] += 1;
    }
    let total = levels.len() as f32;
    let sum: f32 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f32 / total;
            p * p.log2()
        })
        .sum();
    if sum == 0.0 {
        0.0
    } else {
        -sum
    }
}
