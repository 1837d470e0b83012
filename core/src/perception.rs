use crate::action::MarkovState;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::frame::Frame;
use crate::grid::Grid;
use crate::patch::PatchExtractor;
use crate::rng::seeded;
use crate::scheduler::Scheduler;
use crate::vote::{VoteDistribution, VoteVector};
use rand::seq::index;
use rand::Rng;

/// Per-frame summary of the patch stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerceptionReport {
    pub cells_total: usize,
    pub cells_evaluated: usize,
    pub grid_rebuilt: bool,
}

/// Fast stage: patch ensembles voting on every frame.
#[derive(Debug)]
pub struct Perception {
    extractor: PatchExtractor,
    grid: Option<Grid>,
    votes: VoteVector,
    rebuilds: u64,
}

impl Perception {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            extractor: PatchExtractor::new(config.patch_edge, config.noise_scale),
            grid: None,
            votes: VoteVector::new(),
            rebuilds: 0,
        }
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn votes(&self) -> &VoteVector {
        &self.votes
    }

    /// Times the grid was built, including the first frame.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn diverged_steps(&self) -> u64 {
        self.grid.as_ref().map_or(0, Grid::diverged_steps)
    }

    /// Normalized votes accumulated since the last call; the sums restart from zero.
    pub fn take_votes(&mut self) -> VoteDistribution {
        self.votes.take_distribution()
    }

    /// Evaluates a random sample of cells of `frame` and folds their votes.
    ///
    /// A change of frame dimensions discards the grid and every cell's learning.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        frame: &Frame,
        markov: &MarkovState,
        scheduler: &Scheduler,
        rng: &mut R,
        config: &EngineConfig,
    ) -> EngineResult<PerceptionReport> {
        let (width, height) = frame.dimensions();
        let stale = self
            .grid
            .as_ref()
            .map_or(true, |grid| !grid.matches(width, height));
        if stale {
            if let Some(old) = &self.grid {
                tracing::info!(
                    old_cells = old.len(),
                    width,
                    height,
                    "frame dimensions changed, rebuilding grid"
                );
            }
            self.grid = Some(Grid::new(width, height, config.patch_edge));
            self.rebuilds += 1;
        }
        let Some(grid) = self.grid.as_mut() else {
            return Ok(PerceptionReport::default());
        };

        let shape = grid.shape();
        let sampled = ((shape.len() as f64) * f64::from(config.sample_fraction)).floor() as usize;
        let indices = index::sample(rng, shape.len(), sampled.min(shape.len())).into_vec();
        let jobs: Vec<_> = grid
            .select_mut(&indices, config)
            .into_iter()
            .map(|(index, ensemble)| (shape.cell(index), rng.gen::<u64>(), ensemble))
            .collect();

        let extractor = self.extractor;
        let votes = &mut self.votes;
        let stats = scheduler.run(
            jobs,
            |(cell, seed, ensemble)| {
                let mut rng = seeded(seed);
                let patch = extractor.extract(frame, cell, &mut rng);
                ensemble.evaluate_patch(&patch, markov, &mut rng)
            },
            |vote| votes.record(&vote),
        )?;

        Ok(PerceptionReport {
            cells_total: shape.len(),
            cells_evaluated: stats.completed,
            grid_rebuilt: stale,
        })
    }
}
