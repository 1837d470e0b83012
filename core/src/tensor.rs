use rand::Rng;
use rand_distr::StandardNormal;

/// Named row-major weight matrix with its gradient and Adam moment buffers.
///
/// All four buffers always have `rows * cols` entries. The moment buffers are the
/// optimizer's memory and are only touched by [`crate::optimizer::Adam::step`].
#[derive(Clone, Debug)]
pub struct WeightTensor {
    name: &'static str,
    rows: usize,
    cols: usize,
    pub(crate) values: Vec<f32>,
    pub(crate) grad: Vec<f32>,
    pub(crate) first_moment: Vec<f32>,
    pub(crate) second_moment: Vec<f32>,
}

impl WeightTensor {
    pub fn zeros(name: &'static str, rows: usize, cols: usize) -> Self {
        let len = rows * cols;
        Self {
            name,
            rows,
            cols,
            values: vec![0.0; len],
            grad: vec![0.0; len],
            first_moment: vec![0.0; len],
            second_moment: vec![0.0; len],
        }
    }

    /// Gaussian init scaled by `sqrt(2 / fan_in)`, where the fan-in is the column count.
    pub fn he_normal<R: Rng + ?Sized>(
        name: &'static str,
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Self {
        let mut tensor = Self::zeros(name, rows, cols);
        let factor = (2.0 / cols.max(1) as f64).sqrt();
        for value in &mut tensor.values {
            let sample: f64 = rng.sample(StandardNormal);
            *value = (sample * factor) as f32;
        }
        tensor
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    pub fn moments(&self) -> (&[f32], &[f32]) {
        (&self.first_moment, &self.second_moment)
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    pub(crate) fn grad_sq_sum(&self) -> f64 {
        self.grad.iter().map(|&d| f64::from(d) * f64::from(d)).sum()
    }
}
