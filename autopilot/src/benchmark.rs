use crate::runner::{run_engine, write_tape, NullSink, RunArtifact};
use crate::scene::{SceneKind, SyntheticScene};
use crate::seeds::seed_to_hex;
use aedoom_core::{Action, EngineConfig};
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub engine: EngineConfig,
    pub scene: SceneKind,
    pub width: usize,
    pub height: usize,
    pub frames: u64,
    pub seeds: Vec<u64>,
    pub out_dir: PathBuf,
    pub jobs: Option<usize>,
    pub save_tapes: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub seed: u64,
    pub seed_hex: String,
    pub frames: u64,
    pub decisions: u64,
    pub cells_evaluated: u64,
    pub diverged_steps: u64,
    pub settled: bool,
    pub final_action: Option<Action>,
    /// Decisions per action, in `Action::ALL` order.
    pub histogram: [u64; Action::COUNT],
    pub tape: Vec<Action>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub scene: SceneKind,
    pub width: usize,
    pub height: usize,
    pub frames: u64,
    pub jobs: Option<usize>,
    pub engine: EngineConfig,
    pub seeds: Vec<u64>,
    pub run_count: usize,
    pub settled_runs: usize,
    pub diverged_runs: usize,
    pub runs: Vec<RunRecord>,
}

impl BenchmarkReport {
    pub fn settled_rate(&self) -> f64 {
        if self.run_count == 0 {
            return 0.0;
        }
        self.settled_runs as f64 / self.run_count as f64
    }
}

/// `benchmarks/<scene>-<width>x<height>-<unix seconds>`.
pub fn default_out_dir(scene: SceneKind, width: usize, height: usize) -> PathBuf {
    PathBuf::from(format!(
        "benchmarks/{}-{width}x{height}-{}",
        scene.as_str(),
        unix_now()
    ))
}

/// Scheduler workers per run when the engine config leaves them unset. Runs execute
/// concurrently, so the cores are split between them instead of each run claiming all.
pub fn workers_per_run(cores: usize, concurrent_runs: usize) -> usize {
    (cores / concurrent_runs.max(1)).max(1)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.frames == 0 {
        return Err(anyhow!("benchmark --frames must be > 0"));
    }
    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }
    config
        .engine
        .validate()
        .context("benchmark engine config failed validation")?;
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let concurrent_runs = config
        .jobs
        .unwrap_or_else(rayon::current_num_threads)
        .min(config.seeds.len());
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    let workers = config
        .engine
        .workers
        .unwrap_or_else(|| workers_per_run(cores, concurrent_runs));
    tracing::debug!(concurrent_runs, workers, "benchmark thread budget");

    let run_one = |seed: &u64| -> Result<(u64, RunArtifact)> {
        let engine = EngineConfig {
            seed: *seed,
            workers: Some(workers),
            ..config.engine.clone()
        };
        let mut scene = SyntheticScene::new(
            config.scene,
            config.width,
            config.height,
            config.frames,
            *seed,
        )?;
        let artifact = run_engine(engine, &mut scene, &mut NullSink)
            .with_context(|| format!("benchmark run failed for seed={}", seed_to_hex(*seed)))?;
        Ok((*seed, artifact))
    };

    let run_results: Vec<Result<(u64, RunArtifact)>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| config.seeds.par_iter().map(run_one).collect())
    } else {
        config.seeds.par_iter().map(run_one).collect()
    };

    let mut runs = Vec::with_capacity(run_results.len());
    for result in run_results {
        let (seed, artifact) = result?;
        if config.save_tapes {
            let path = config
                .out_dir
                .join("tapes")
                .join(format!("seed{seed:016x}.tape"));
            write_tape(&path, &artifact.tape)?;
        }
        runs.push(RunRecord {
            seed,
            seed_hex: seed_to_hex(seed),
            frames: artifact.summary.frames,
            decisions: artifact.summary.decisions,
            cells_evaluated: artifact.summary.cells_evaluated,
            diverged_steps: artifact.summary.diverged_steps,
            settled: artifact.settled,
            final_action: artifact.summary.last_action,
            histogram: *artifact.histogram.values(),
            tape: artifact.tape,
        });
    }

    tracing::info!(
        runs = runs.len(),
        scene = config.scene.as_str(),
        "benchmark finished"
    );

    write_runs_csv(&config.out_dir.join("runs.csv"), &runs)?;

    let report = BenchmarkReport {
        generated_unix_s: unix_now(),
        scene: config.scene,
        width: config.width,
        height: config.height,
        frames: config.frames,
        jobs: config.jobs,
        engine: config.engine,
        seeds: config.seeds,
        run_count: runs.len(),
        settled_runs: runs.iter().filter(|r| r.settled).count(),
        diverged_runs: runs.iter().filter(|r| r.diverged_steps > 0).count(),
        runs,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    Ok(report)
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "seed_hex,seed,frames,decisions,cells_evaluated,diverged_steps,settled,final_action",
    );
    for action in Action::ALL {
        csv.push_str(&format!(",{action}"));
    }
    csv.push('\n');
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}",
            row.seed_hex,
            row.seed,
            row.frames,
            row.decisions,
            row.cells_evaluated,
            row.diverged_steps,
            row.settled,
            row.final_action.map(Action::as_str).unwrap_or("")
        ));
        for count in row.histogram {
            csv.push_str(&format!(",{count}"));
        }
        csv.push('\n');
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_runs_share_the_cores() {
        assert_eq!(workers_per_run(16, 4), 4);
        assert_eq!(workers_per_run(16, 1), 16);
        assert_eq!(workers_per_run(6, 4), 1);
        assert_eq!(workers_per_run(4, 16), 1);
        assert_eq!(workers_per_run(8, 0), 8);
    }

    #[test]
    fn default_out_dir_names_scene_and_size() {
        let dir = default_out_dir(SceneKind::Bar, 32, 24);
        let name = dir.to_string_lossy();
        assert!(name.starts_with("benchmarks/bar-32x24-"), "{name}");
    }
}
