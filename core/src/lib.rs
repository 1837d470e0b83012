//! Reward-free action selection from raw video frames.
//!
//! Frames are cut into patches; each patch cell holds one autoencoder per action and
//! trains whichever currently reconstructs the patch worst. Best/worst picks, weighted
//! by patch entropy, become a vote over actions. Every few frames a second ensemble
//! (the decision mind) reads the normalized votes, conditioned on the recent action
//! history, and emits the action it reconstructs best.

pub mod action;
pub mod autoencoder;
pub mod config;
pub mod constants;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod frame;
pub mod grid;
pub mod mind;
pub mod optimizer;
pub mod patch;
pub mod perception;
pub mod rng;
pub mod scheduler;
pub mod tensor;
pub mod vote;

pub use action::{Action, MarkovState, PerAction};
pub use config::{AdamConfig, EngineConfig};
pub use engine::{ActionSink, Engine, FrameReport, FrameSource, Frames, RunSummary};
pub use error::{EngineError, EngineResult};
pub use frame::Frame;
pub use mind::Decision;
pub use vote::VoteDistribution;
