use aedoom_core::{
    Action, ActionSink, Decision, Engine, EngineConfig, FrameSource, PerAction, RunSummary,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Trailing decisions that must agree for a run to count as settled.
pub const SETTLE_WINDOW: usize = 5;

#[derive(Clone, Debug, Serialize)]
pub struct RunArtifact {
    pub summary: RunSummary,
    pub tape: Vec<Action>,
    pub histogram: PerAction<u64>,
    pub settled: bool,
}

/// Sink that only keeps the tape.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ActionSink for NullSink {
    type Error = anyhow::Error;

    fn emit(&mut self, _decision: &Decision) -> Result<()> {
        Ok(())
    }
}

struct Recorder<'a, K> {
    inner: &'a mut K,
    tape: Vec<Action>,
}

impl<K: ActionSink<Error = anyhow::Error>> ActionSink for Recorder<'_, K> {
    type Error = anyhow::Error;

    fn emit(&mut self, decision: &Decision) -> Result<()> {
        self.tape.push(decision.action);
        self.inner.emit(decision)
    }
}

pub fn run_engine<S, K>(config: EngineConfig, source: &mut S, sink: &mut K) -> Result<RunArtifact>
where
    S: FrameSource<Error = anyhow::Error>,
    K: ActionSink<Error = anyhow::Error>,
{
    let seed = config.seed;
    let mut engine = Engine::new(config).context("failed to build engine")?;
    let mut recorder = Recorder {
        inner: sink,
        tape: Vec::new(),
    };
    let summary = engine
        .run(source, &mut recorder)
        .with_context(|| format!("engine run failed for seed={seed:#x}"))?;
    let tape = recorder.tape;
    Ok(RunArtifact {
        histogram: histogram(&tape),
        settled: settled(&tape),
        summary,
        tape,
    })
}

pub fn histogram(tape: &[Action]) -> PerAction<u64> {
    let mut counts = PerAction::default();
    for &action in tape {
        counts[action] += 1;
    }
    counts
}

/// True when the last [`SETTLE_WINDOW`] decisions picked the same action.
pub fn settled(tape: &[Action]) -> bool {
    if tape.len() < SETTLE_WINDOW {
        return false;
    }
    let tail = &tape[tape.len() - SETTLE_WINDOW..];
    tail.iter().all(|&action| action == tail[0])
}

/// Writes one action name per line.
pub fn write_tape(path: &Path, tape: &[Action]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    let mut text = String::with_capacity(tape.len() * 8);
    for action in tape {
        text.push_str(action.as_str());
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("failed writing {}", path.display()))
}

pub fn read_tape(path: &Path) -> Result<Vec<Action>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            line.parse::<Action>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("{} line {}", path.display(), idx + 1))
        })
        .collect()
}
