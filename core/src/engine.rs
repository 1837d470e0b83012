//! Frame-in, action-out driver.
//!
//! Each frame runs the fast perception stage; on decision frames the slow stage reads
//! the normalized vote snapshot after every cell task of that frame has drained.

use crate::action::{Action, MarkovState};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::frame::Frame;
use crate::mind::{Decision, DecisionMind};
use crate::perception::{Perception, PerceptionReport};
use crate::rng::seeded;
use crate::scheduler::Scheduler;
use rand::rngs::StdRng;
use serde::Serialize;

/// Upstream producer of frames. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    type Error: From<EngineError>;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// Downstream consumer of decisions.
pub trait ActionSink {
    type Error;

    fn emit(&mut self, decision: &Decision) -> Result<(), Self::Error>;
}

/// Adapts any iterator of frames into a [`FrameSource`].
pub struct Frames<I>(pub I);

impl<I: Iterator<Item = Frame>> FrameSource for Frames<I> {
    type Error = EngineError;

    fn next_frame(&mut self) -> EngineResult<Option<Frame>> {
        Ok(self.0.next())
    }
}

impl ActionSink for Vec<Decision> {
    type Error = EngineError;

    fn emit(&mut self, decision: &Decision) -> EngineResult<()> {
        self.push(decision.clone());
        Ok(())
    }
}

/// The frame interval at which decisions are taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    every: u64,
}

impl Cadence {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }

    /// True for zero-based frame indices 0, every, 2 * every, ...
    pub fn is_decision_frame(&self, frame: u64) -> bool {
        frame % self.every == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub perception: PerceptionReport,
    pub decision: Option<Decision>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub decisions: u64,
    pub cells_evaluated: u64,
    pub grid_rebuilds: u64,
    pub diverged_steps: u64,
    pub last_action: Option<Action>,
}

pub struct Engine {
    config: EngineConfig,
    cadence: Cadence,
    scheduler: Scheduler,
    perception: Perception,
    mind: DecisionMind,
    rng: StdRng,
    frames: u64,
    last_decision: Option<Decision>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let scheduler = Scheduler::new(config.worker_cap())?;
        tracing::debug!(
            workers = scheduler.workers(),
            actions = config.action_count,
            cadence = config.decision_cadence,
            sample_fraction = f64::from(config.sample_fraction),
            "engine ready"
        );
        Ok(Self {
            cadence: Cadence::new(config.decision_cadence),
            perception: Perception::new(&config),
            mind: DecisionMind::new(&config),
            rng: seeded(config.seed),
            scheduler,
            frames: 0,
            last_decision: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn markov(&self) -> &MarkovState {
        self.mind.markov()
    }

    pub fn perception(&self) -> &Perception {
        &self.perception
    }

    pub fn mind(&self) -> &DecisionMind {
        &self.mind
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// Training steps skipped on non-finite losses, across every autoencoder.
    pub fn diverged_steps(&self) -> u64 {
        self.perception.diverged_steps() + self.mind.ensemble().diverged_steps()
    }

    pub fn process_frame(&mut self, frame: &Frame) -> EngineResult<FrameReport> {
        let index = self.frames;
        let perception = self.perception.observe(
            frame,
            self.mind.markov(),
            &self.scheduler,
            &mut self.rng,
            &self.config,
        )?;
        self.frames += 1;

        let decision = if self.cadence.is_decision_frame(index) {
            let distribution = self.perception.take_votes();
            let decision = self.mind.decide(index, &distribution, &mut self.rng);
            tracing::debug!(
                frame = index,
                action = %decision.action,
                learn = %decision.learn,
                vote_total = f64::from(distribution.total),
                "decision"
            );
            self.last_decision = Some(decision.clone());
            Some(decision)
        } else {
            None
        };

        Ok(FrameReport {
            frame: index,
            perception,
            decision,
        })
    }

    /// Feeds frames until the source ends, emitting every decision to `sink`.
    pub fn run<S, K, E>(&mut self, source: &mut S, sink: &mut K) -> Result<RunSummary, E>
    where
        S: FrameSource<Error = E>,
        K: ActionSink<Error = E>,
        E: From<EngineError>,
    {
        let mut summary = RunSummary::default();
        while let Some(frame) = source.next_frame()? {
            let report = self.process_frame(&frame)?;
            summary.frames += 1;
            summary.cells_evaluated += report.perception.cells_evaluated as u64;
            if let Some(decision) = &report.decision {
                sink.emit(decision)?;
                summary.decisions += 1;
                summary.last_action = Some(decision.action);
            }
        }
        summary.grid_rebuilds = self.perception.rebuilds();
        summary.diverged_steps = self.diverged_steps();
        tracing::info!(
            frames = summary.frames,
            decisions = summary.decisions,
            diverged = summary.diverged_steps,
            "frame stream ended"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(width: usize, height: usize, level: u8) -> Frame {
        Frame::from_gray(width, height, vec![level; width * height]).expect("frame")
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            sample_fraction: 1.0,
            decision_cadence: 3,
            workers: Some(2),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn cadence_fires_on_multiples() {
        let cadence = Cadence::new(30);
        let fired: Vec<u64> = (0..91).filter(|&f| cadence.is_decision_frame(f)).collect();
        assert_eq!(fired, vec![0, 30, 60, 90]);
        assert!(Cadence::new(0).is_decision_frame(7));
    }

    #[test]
    fn decisions_only_on_cadence_frames() {
        let mut engine = Engine::new(test_config()).expect("engine");
        let frame = flat_frame(16, 16, 90);
        for index in 0..7 {
            let report = engine.process_frame(&frame).expect("frame");
            assert_eq!(report.frame, index);
            assert_eq!(report.decision.is_some(), index % 3 == 0, "frame {index}");
            assert_eq!(report.perception.cells_evaluated, 4);
        }
        assert_eq!(engine.frames_processed(), 7);
        assert_eq!(engine.last_decision().map(|d| d.frame), Some(6));
    }

    #[test]
    fn dimension_change_rebuilds_grid() {
        let mut engine = Engine::new(test_config()).expect("engine");
        let first = engine.process_frame(&flat_frame(16, 16, 10)).expect("frame");
        assert!(first.perception.grid_rebuilt);
        let same = engine.process_frame(&flat_frame(16, 16, 20)).expect("frame");
        assert!(!same.perception.grid_rebuilt);
        let bigger = engine.process_frame(&flat_frame(32, 16, 20)).expect("frame");
        assert!(bigger.perception.grid_rebuilt);
        assert_eq!(bigger.perception.cells_total, 8);
        assert_eq!(engine.perception().rebuilds(), 2);
    }

    #[test]
    fn frames_smaller_than_a_patch_are_harmless() {
        let mut engine = Engine::new(test_config()).expect("engine");
        let report = engine.process_frame(&flat_frame(5, 5, 10)).expect("frame");
        assert_eq!(report.perception.cells_total, 0);
        assert!(report.decision.is_some());
    }

    #[test]
    fn run_stops_at_end_of_stream() {
        let mut engine = Engine::new(test_config()).expect("engine");
        let frames = (0..10u8).map(|i| flat_frame(16, 8, i * 20));
        let mut decisions: Vec<Decision> = Vec::new();
        let summary = engine
            .run(&mut Frames(frames), &mut decisions)
            .expect("run");
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.decisions, 4);
        assert_eq!(decisions.len(), 4);
        assert_eq!(summary.cells_evaluated, 20);
        assert_eq!(summary.last_action, decisions.last().map(|d| d.action));
        assert_eq!(summary.grid_rebuilds, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            action_count: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config),
            Err(EngineError::InvalidConfig {
                field: "action_count",
                ..
            })
        ));
    }
}
