use aedoom_autopilot::benchmark::{default_out_dir, run_benchmark, BenchmarkConfig};
use aedoom_autopilot::config::load_engine_config;
use aedoom_autopilot::raw::RawRgbSource;
use aedoom_autopilot::runner::{run_engine, write_tape, NullSink, RunArtifact};
use aedoom_autopilot::scene::{SceneKind, SyntheticScene};
use aedoom_autopilot::seeds::{parse_seed, seed_to_hex, SeedPlan};
use aedoom_autopilot::sink::KeyEventSink;
use aedoom_core::{Action, EngineConfig, FrameSource};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aedoom-autopilot")]
#[command(about = "Reward-free autopilot that picks actions from raw video frames")]
struct Cli {
    /// JSON engine config; missing fields fall back to the selected preset
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use the headless preset (a quarter of the cells per frame)
    #[arg(long, global = true, default_value_t = false)]
    headless: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the engine from a synthetic scene or a raw RGB24 stream
    Run {
        #[arg(long, value_enum, default_value_t = CliScene::Split)]
        scene: CliScene,
        /// Raw RGB24 frames; `-` reads stdin
        #[arg(long)]
        raw: Option<PathBuf>,
        #[arg(long, default_value_t = 64)]
        width: usize,
        #[arg(long, default_value_t = 48)]
        height: usize,
        /// Frames to generate for synthetic scenes
        #[arg(long, default_value_t = 1_800)]
        frames: u64,
        #[arg(long)]
        seed: Option<String>,
        /// Print key up/down events to stdout
        #[arg(long, default_value_t = false)]
        keys: bool,
        /// Write the action tape here
        #[arg(long)]
        tape: Option<PathBuf>,
    },
    /// Run one synthetic scene over many seeds in parallel
    Benchmark {
        #[arg(long, value_enum, default_value_t = CliScene::Split)]
        scene: CliScene,
        #[arg(long, default_value_t = 32)]
        width: usize,
        #[arg(long, default_value_t = 32)]
        height: usize,
        #[arg(long, default_value_t = 900)]
        frames: u64,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 8)]
        seed_count: u32,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long, default_value_t = false)]
        save_tapes: bool,
    },
    /// Print the effective engine config as JSON
    Config {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliScene {
    Split,
    Bar,
    Noise,
}

impl From<CliScene> for SceneKind {
    fn from(value: CliScene) -> Self {
        match value {
            CliScene::Split => SceneKind::Split,
            CliScene::Bar => SceneKind::Bar,
            CliScene::Noise => SceneKind::Noise,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Cli {
        config,
        headless,
        command,
    } = Cli::parse();
    let mut engine_config = load_engine_config(config.as_deref(), headless)?;

    match command {
        Commands::Run {
            scene,
            raw,
            width,
            height,
            frames,
            seed,
            keys,
            tape,
        } => {
            if let Some(seed) = seed {
                engine_config.seed = parse_seed(&seed)?;
            }
            let seed = engine_config.seed;
            let artifact = match raw {
                Some(path) => {
                    let reader: Box<dyn Read> = if path == Path::new("-") {
                        Box::new(io::stdin().lock())
                    } else {
                        let file = File::open(&path)
                            .with_context(|| format!("failed opening {}", path.display()))?;
                        Box::new(BufReader::new(file))
                    };
                    let mut source = RawRgbSource::new(reader, width, height)?;
                    drive(engine_config, &mut source, keys)?
                }
                None => {
                    let mut source =
                        SyntheticScene::new(scene.into(), width, height, frames, seed)?;
                    drive(engine_config, &mut source, keys)?
                }
            };

            if let Some(path) = &tape {
                write_tape(path, &artifact.tape)?;
            }

            // Key events own stdout; the report goes to stderr in that mode.
            let report = format_report(seed, &artifact, tape.as_deref());
            if keys {
                eprint!("{report}");
            } else {
                print!("{report}");
            }
        }
        Commands::Benchmark {
            scene,
            width,
            height,
            frames,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            out_dir,
            jobs,
            save_tapes,
        } => {
            let seeds =
                SeedPlan::from_args(seeds, seed_file, seed_start.as_deref(), seed_count)?
                    .resolve()?;
            let scene: SceneKind = scene.into();
            let out_dir = out_dir.unwrap_or_else(|| default_out_dir(scene, width, height));

            let report = run_benchmark(BenchmarkConfig {
                engine: engine_config,
                scene,
                width,
                height,
                frames,
                seeds,
                out_dir: out_dir.clone(),
                jobs,
                save_tapes,
            })?;

            println!("scene={}", scene.as_str());
            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("settled={:.0}%", report.settled_rate() * 100.0);
            println!("diverged_runs={}", report.diverged_runs);
            println!("out_dir={}", out_dir.display());
            for run in &report.runs {
                println!(
                    "  {} decisions={} final={} settled={} diverged={}",
                    run.seed_hex,
                    run.decisions,
                    run.final_action.map(Action::as_str).unwrap_or("-"),
                    run.settled,
                    run.diverged_steps,
                );
            }
        }
        Commands::Config { output } => {
            let encoded = serde_json::to_vec_pretty(&engine_config)?;
            if let Some(path) = output {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, encoded)?;
                println!("wrote={}", path.display());
            } else {
                println!("{}", String::from_utf8_lossy(&encoded));
            }
        }
    }

    Ok(())
}

fn drive<S>(config: EngineConfig, source: &mut S, keys: bool) -> Result<RunArtifact>
where
    S: FrameSource<Error = anyhow::Error>,
{
    if keys {
        let stdout = io::stdout();
        let mut sink = KeyEventSink::new(stdout.lock());
        let artifact = run_engine(config, source, &mut sink)?;
        sink.set_enabled(false)?;
        Ok(artifact)
    } else {
        run_engine(config, source, &mut NullSink)
    }
}

fn format_report(seed: u64, artifact: &RunArtifact, tape: Option<&Path>) -> String {
    let summary = &artifact.summary;
    let mut out = String::new();
    out.push_str(&format!("seed={}\n", seed_to_hex(seed)));
    out.push_str(&format!("frames={}\n", summary.frames));
    out.push_str(&format!("decisions={}\n", summary.decisions));
    out.push_str(&format!("cells_evaluated={}\n", summary.cells_evaluated));
    out.push_str(&format!("grid_rebuilds={}\n", summary.grid_rebuilds));
    out.push_str(&format!("diverged_steps={}\n", summary.diverged_steps));
    out.push_str(&format!(
        "last_action={}\n",
        summary.last_action.map(Action::as_str).unwrap_or("-")
    ));
    out.push_str(&format!("settled={}\n", artifact.settled));
    for (action, count) in artifact.histogram.iter() {
        out.push_str(&format!("  {:9} {count}\n", action.as_str()));
    }
    if let Some(path) = tape {
        out.push_str(&format!("tape={}\n", path.display()));
    }
    out
}
