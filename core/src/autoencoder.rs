//! Two-layer reconstruction network trained online with Adam.
//!
//! The forward pass is `decoder * split(encoder * x + b1) + b2`, where `split` maps every
//! hidden pre-activation `z` onto the pair `(min(z, 0), max(z, 0))`. Reconstruction error
//! is the mean squared difference against the target over the full (context-extended)
//! vector. When a [`MarkovState`] is supplied its one-hot encoding is appended to both
//! the input and the target, so the loss also measures how well the network expects the
//! recent action history. Without a state the context inputs stay zero and the context
//! outputs are left out of the loss, which makes the call equivalent to a network built
//! without the context block.

use crate::action::MarkovState;
use crate::config::{AdamConfig, EngineConfig};
use crate::optimizer::{Adam, StepReport};
use crate::rng::seeded;
use crate::tensor::WeightTensor;
use rand::Rng;

/// Hyperparameters an autoencoder trains with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingConfig {
    pub adam: AdamConfig,
    pub dropout: f32,
}

impl From<&EngineConfig> for TrainingConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            adam: config.adam,
            dropout: config.dropout,
        }
    }
}

/// Intermediate values of one forward pass.
struct Activations {
    pre: Vec<f32>,
    hidden: Vec<f32>,
    output: Vec<f32>,
}

/// One reconstruction network with its own optimizer state.
///
/// The per-instance generator lives only for the duration of [`Autoencoder::new`]: it
/// draws the initial weights and is then dropped. Dropout masks during training come
/// from the generator handed to [`Autoencoder::encode`], which keeps a run reproducible
/// no matter which worker trains which cell.
#[derive(Clone, Debug)]
pub struct Autoencoder {
    width: usize,
    context_width: usize,
    hidden: usize,
    encoder: WeightTensor,
    encoder_bias: WeightTensor,
    decoder: WeightTensor,
    decoder_bias: WeightTensor,
    adam: Adam,
    dropout: f32,
    iteration: u64,
    diverged_steps: u64,
    last_step: Option<StepReport>,
}

impl Autoencoder {
    /// Builds a network for vectors of `width` values plus a one-hot window of
    /// `markov_order` actions. Weights are drawn from a generator seeded with `seed`.
    pub fn new(width: usize, markov_order: usize, seed: u64, training: TrainingConfig) -> Self {
        let context_width = MarkovState::context_width(markov_order);
        let full = width + context_width;
        let hidden = (width / 2).max(1);
        let mut rng = seeded(seed);
        let encoder = WeightTensor::he_normal("l1", hidden, full, &mut rng);
        let decoder = WeightTensor::he_normal("l2", full, 2 * hidden, &mut rng);
        Self {
            width,
            context_width,
            hidden,
            encoder,
            encoder_bias: WeightTensor::zeros("b1", hidden, 1),
            decoder,
            decoder_bias: WeightTensor::zeros("b2", full, 1),
            adam: Adam::new(training.adam),
            dropout: training.dropout,
            iteration: 0,
            diverged_steps: 0,
            last_step: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Training calls skipped because the loss was not finite.
    pub fn diverged_steps(&self) -> u64 {
        self.diverged_steps
    }

    pub fn last_step(&self) -> Option<&StepReport> {
        self.last_step.as_ref()
    }

    pub fn tensors(&self) -> [&WeightTensor; 4] {
        [
            &self.encoder,
            &self.encoder_bias,
            &self.decoder,
            &self.decoder_bias,
        ]
    }

    /// Reconstruction loss of `output` from `input`. Does not touch learned state.
    pub fn measure(&self, input: &[f32], output: &[f32], markov: Option<&MarkovState>) -> f32 {
        let x = self.extend(input, markov);
        let target = self.extend(output, markov);
        let activations = self.forward(&x, None);
        let scored = self.scored_len(markov);
        mean_squared_error(&activations.output[..scored], &target[..scored])
    }

    /// Trains on one example with dropout drawn from `rng` and returns the loss before the
    /// update. A non-finite loss leaves weights and optimizer state untouched and
    /// returns zero.
    pub fn encode<R: Rng + ?Sized>(
        &mut self,
        input: &[f32],
        output: &[f32],
        rng: &mut R,
        markov: Option<&MarkovState>,
    ) -> f32 {
        let x = self.extend(input, markov);
        let target = self.extend(output, markov);
        let mask = self.dropout_mask(rng);
        let activations = self.forward(&x, Some(&mask));
        let scored = self.scored_len(markov);
        let loss = mean_squared_error(&activations.output[..scored], &target[..scored]);
        if !loss.is_finite() {
            self.diverged_steps += 1;
            tracing::warn!(
                iteration = self.iteration,
                loss = f64::from(loss),
                "skipping autoencoder update on non-finite loss"
            );
            return 0.0;
        }

        self.backward(&x, &target, scored, &mask, &activations);
        let report = self.adam.step(
            &mut [
                &mut self.encoder,
                &mut self.encoder_bias,
                &mut self.decoder,
                &mut self.decoder_bias,
            ],
            self.iteration,
        );
        self.last_step = Some(report);
        self.iteration += 1;
        loss
    }

    /// Output entries the loss covers: the context block only counts when supplied.
    fn scored_len(&self, markov: Option<&MarkovState>) -> usize {
        match markov {
            Some(_) => self.width + self.context_width,
            None => self.width,
        }
    }

    fn extend(&self, values: &[f32], markov: Option<&MarkovState>) -> Vec<f32> {
        debug_assert_eq!(values.len(), self.width, "vector width mismatch");
        let full = self.width + self.context_width;
        let mut extended = Vec::with_capacity(full);
        extended.extend_from_slice(&values[..values.len().min(self.width)]);
        extended.resize(self.width, 0.0);
        if let Some(state) = markov {
            state.encode_into(&mut extended);
        }
        extended.resize(full, 0.0);
        extended
    }

    fn dropout_mask<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        let keep_scale = 1.0 / (1.0 - self.dropout);
        (0..2 * self.hidden)
            .map(|_| {
                if rng.gen::<f32>() >= self.dropout {
                    keep_scale
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn forward(&self, x: &[f32], mask: Option<&[f32]>) -> Activations {
        let pre: Vec<f32> = (0..self.hidden)
            .map(|h| self.encoder_bias.values[h] + dot(self.encoder.row(h), x))
            .collect();

        let mut hidden = Vec::with_capacity(2 * self.hidden);
        for &z in &pre {
            hidden.push(z.min(0.0));
            hidden.push(z.max(0.0));
        }
        if let Some(mask) = mask {
            for (a, &keep) in hidden.iter_mut().zip(mask) {
                *a *= keep;
            }
        }

        let output = (0..self.decoder.rows())
            .map(|o| self.decoder_bias.values[o] + dot(self.decoder.row(o), &hidden))
            .collect();

        Activations {
            pre,
            hidden,
            output,
        }
    }

    /// Fills every gradient buffer with d(loss)/d(weight) for the given pass.
    fn backward(
        &mut self,
        x: &[f32],
        target: &[f32],
        scored: usize,
        mask: &[f32],
        activations: &Activations,
    ) {
        for tensor in [
            &mut self.encoder,
            &mut self.encoder_bias,
            &mut self.decoder,
            &mut self.decoder_bias,
        ] {
            tensor.zero_grad();
        }

        let n = scored.max(1) as f32;
        let d_output: Vec<f32> = activations
            .output
            .iter()
            .zip(target)
            .enumerate()
            .map(|(o, (&y, &t))| if o < scored { 2.0 * (y - t) / n } else { 0.0 })
            .collect();

        let hidden_width = activations.hidden.len();
        let mut d_hidden = vec![0.0f32; hidden_width];
        for (o, &dy) in d_output.iter().enumerate() {
            self.decoder_bias.grad[o] = dy;
            let row = o * hidden_width;
            for (k, &a) in activations.hidden.iter().enumerate() {
                self.decoder.grad[row + k] = dy * a;
                d_hidden[k] += self.decoder.values[row + k] * dy;
            }
        }
        for (d, &keep) in d_hidden.iter_mut().zip(mask) {
            *d *= keep;
        }

        let in_width = x.len();
        for (h, &z) in activations.pre.iter().enumerate() {
            let mut dz = 0.0;
            if z < 0.0 {
                dz += d_hidden[2 * h];
            }
            if z > 0.0 {
                dz += d_hidden[2 * h + 1];
            }
            self.encoder_bias.grad[h] = dz;
            let row = h * in_width;
            for (j, &xj) in x.iter().enumerate() {
                self.encoder.grad[row + j] = dz * xj;
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mean_squared_error(output: &[f32], target: &[f32]) -> f32 {
    if output.is_empty() {
        return 0.0;
    }
    let sum: f32 = output
        .iter()
        .zip(target)
        .map(|(y, t)| (y - t) * (y - t))
        .sum();
    sum / output.len() as f32
}
