use crate::action::Action;
use crate::constants::{
    ADAM_BETA1, ADAM_BETA2, DECISION_CADENCE, DEFAULT_SEED, DROPOUT_PROBABILITY, EPSILON,
    HEADLESS_SAMPLE_FRACTION, LEARNING_RATE, MARKOV_ORDER, NOISE_SCALE, PATCH_EDGE,
    WINDOWED_SAMPLE_FRACTION,
};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Optimizer hyperparameters shared by every autoencoder in an engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub beta1: f32,
    pub beta2: f32,
    pub learning_rate: f32,
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            learning_rate: LEARNING_RATE,
            epsilon: EPSILON,
        }
    }
}

/// Tunable engine parameters.
///
/// Missing fields in a serialized config fall back to the windowed defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Edge length of the square patches cut from each frame.
    pub patch_edge: usize,
    /// Number of actions in play, taken as a prefix of [`Action::ALL`].
    pub action_count: usize,
    /// Length of the action history window used as conditioning context.
    pub markov_order: usize,
    /// Frames between two decisions.
    pub decision_cadence: u64,
    /// Width of the decision mind vectors. `None` follows `action_count`.
    pub mind_width: Option<usize>,
    pub adam: AdamConfig,
    pub dropout: f32,
    /// Standard deviation of the noise added to patch inputs.
    pub noise_scale: f32,
    /// Share of grid cells evaluated per frame.
    pub sample_fraction: f32,
    pub seed: u64,
    /// Upper bound on concurrently evaluated cells. `None` uses available parallelism.
    pub workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::windowed()
    }
}

impl EngineConfig {
    /// Settings of the interactive variant: a small share of cells per frame.
    pub fn windowed() -> Self {
        Self {
            patch_edge: PATCH_EDGE,
            action_count: Action::COUNT,
            markov_order: MARKOV_ORDER,
            decision_cadence: DECISION_CADENCE,
            mind_width: None,
            adam: AdamConfig::default(),
            dropout: DROPOUT_PROBABILITY,
            noise_scale: NOISE_SCALE,
            sample_fraction: WINDOWED_SAMPLE_FRACTION,
            seed: DEFAULT_SEED,
            workers: None,
        }
    }

    /// Settings of the headless variant, which can afford a quarter of the grid.
    pub fn headless() -> Self {
        Self {
            sample_fraction: HEADLESS_SAMPLE_FRACTION,
            ..Self::windowed()
        }
    }

    pub fn mind_width(&self) -> usize {
        self.mind_width.unwrap_or(self.action_count)
    }

    /// Active actions, in index order.
    pub fn actions(&self) -> &'static [Action] {
        &Action::ALL[..self.action_count.min(Action::COUNT)]
    }

    pub fn worker_cap(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.patch_edge < 2 {
            return Err(EngineError::config("patch_edge", "must be at least 2"));
        }
        if self.action_count == 0 || self.action_count > Action::COUNT {
            return Err(EngineError::config(
                "action_count",
                format!("must be in 1..={}", Action::COUNT),
            ));
        }
        if self.decision_cadence == 0 {
            return Err(EngineError::config("decision_cadence", "must be > 0"));
        }
        if self.mind_width() == 0 {
            return Err(EngineError::config("mind_width", "must be >= 1"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EngineError::config("dropout", "must be in [0, 1)"));
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(EngineError::config("sample_fraction", "must be in (0, 1]"));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(EngineError::config("noise_scale", "must be finite and >= 0"));
        }
        let adam = &self.adam;
        for (field, beta) in [("adam.beta1", adam.beta1), ("adam.beta2", adam.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(EngineError::config(field, "must be in [0, 1)"));
            }
        }
        if !(adam.learning_rate.is_finite() && adam.learning_rate > 0.0) {
            return Err(EngineError::config("adam.learning_rate", "must be > 0"));
        }
        if !(adam.epsilon.is_finite() && adam.epsilon > 0.0) {
            return Err(EngineError::config("adam.epsilon", "must be > 0"));
        }
        if self.workers == Some(0) {
            return Err(EngineError::config("workers", "must be >= 1 when provided"));
        }
        Ok(())
    }
}
