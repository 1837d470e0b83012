//! Default engine constants.
//!
//! Every value here is only a default; `EngineConfig` carries the tunable copy.

// Patch grid
pub const PATCH_EDGE: usize = 8;
pub const LUMA_LEVELS: usize = 256;
pub const NOISE_SCALE: f32 = 1.0 / 16.0;

// Sampled share of grid cells per frame
pub const WINDOWED_SAMPLE_FRACTION: f32 = 1.0 / 64.0;
pub const HEADLESS_SAMPLE_FRACTION: f32 = 1.0 / 4.0;

// Decision layer
pub const MARKOV_ORDER: usize = 2;
pub const DECISION_CADENCE: u64 = 30;

// Optimizer
pub const ADAM_BETA1: f32 = 0.8; // first moment decay
pub const ADAM_BETA2: f32 = 0.89; // second moment decay
pub const LEARNING_RATE: f32 = 1.0e-3;
pub const EPSILON: f32 = 1.0e-8;
pub const GRADIENT_CLIP_NORM: f64 = 1.0;
pub const DROPOUT_PROBABILITY: f32 = 0.1;

// Seeding
pub const DEFAULT_SEED: u64 = 1;
pub const MIND_SEED_SALT: u64 = 0x6D69_6E64; // "mind"
