use aedoom_autopilot::benchmark::{run_benchmark, BenchmarkConfig, BenchmarkReport};
use aedoom_autopilot::raw::RawRgbSource;
use aedoom_autopilot::runner::{read_tape, run_engine, write_tape, NullSink};
use aedoom_autopilot::scene::{SceneKind, SyntheticScene};
use aedoom_autopilot::sink::KeyEventSink;
use aedoom_core::{Action, EngineConfig};
use anyhow::Result;
use std::fs;
use std::io::Cursor;

fn fast_config() -> EngineConfig {
    EngineConfig {
        sample_fraction: 1.0,
        decision_cadence: 10,
        workers: Some(2),
        ..EngineConfig::headless()
    }
}

#[test]
fn synthetic_run_records_one_tape_entry_per_decision() -> Result<()> {
    let mut scene = SyntheticScene::new(SceneKind::Bar, 24, 16, 95, 3)?;
    let artifact = run_engine(fast_config(), &mut scene, &mut NullSink)?;
    assert_eq!(artifact.summary.frames, 95);
    assert_eq!(artifact.summary.decisions, 10);
    assert_eq!(artifact.tape.len(), 10);
    let counted: u64 = artifact.histogram.values().iter().sum();
    assert_eq!(counted, 10);
    assert_eq!(artifact.summary.last_action, artifact.tape.last().copied());
    Ok(())
}

#[test]
fn key_sink_sees_every_decision() -> Result<()> {
    let mut scene = SyntheticScene::new(SceneKind::Noise, 16, 16, 60, 5)?;
    let mut sink = KeyEventSink::new(Vec::new());
    let artifact = run_engine(fast_config(), &mut scene, &mut sink)?;
    sink.set_enabled(false)?;
    assert!(sink.held().is_none());

    let text = String::from_utf8(sink.into_inner())?;
    let downs = text.lines().filter(|l| l.starts_with("down ")).count();
    let ups = text.lines().filter(|l| l.starts_with("up ")).count();
    assert_eq!(downs, ups);
    assert!(downs <= artifact.tape.len());
    Ok(())
}

#[test]
fn raw_stream_matches_synthetic_split_frames() -> Result<()> {
    let (w, h, frames) = (16usize, 16usize, 31usize);
    let mut bytes = Vec::with_capacity(w * h * 3 * frames);
    for _ in 0..frames {
        for _ in 0..h {
            for x in 0..w {
                let rgb: [u8; 3] = if x < w / 2 { [180, 40, 40] } else { [30, 60, 200] };
                bytes.extend_from_slice(&rgb);
            }
        }
    }
    let mut raw = RawRgbSource::new(Cursor::new(bytes), w, h)?;
    let from_raw = run_engine(fast_config(), &mut raw, &mut NullSink)?;

    let mut scene = SyntheticScene::new(SceneKind::Split, w, h, frames as u64, 1)?;
    let from_scene = run_engine(fast_config(), &mut scene, &mut NullSink)?;

    assert_eq!(from_raw.tape, from_scene.tape);
    assert_eq!(from_raw.summary, from_scene.summary);
    Ok(())
}

#[test]
fn tape_file_round_trips() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("nested/run.tape");
    let tape = vec![Action::Activate, Action::None, Action::Left];
    write_tape(&path, &tape)?;
    assert_eq!(read_tape(&path)?, tape);

    fs::write(&path, "left\njump\n")?;
    assert!(read_tape(&path).is_err());
    Ok(())
}

#[test]
fn benchmark_smoke_outputs_expected_metadata() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let report = run_benchmark(BenchmarkConfig {
        engine: fast_config(),
        scene: SceneKind::Split,
        width: 16,
        height: 16,
        frames: 120,
        seeds: vec![1, 0xC0FF_EE11, 7],
        out_dir: tmp.path().to_path_buf(),
        jobs: Some(2),
        save_tapes: true,
    })?;

    assert_eq!(report.run_count, 3);
    assert_eq!(report.runs.len(), 3);
    for run in &report.runs {
        assert_eq!(run.frames, 120);
        assert_eq!(run.decisions, 12);
        assert_eq!(run.tape.len(), 12);
        assert_eq!(run.histogram.iter().sum::<u64>(), 12);
        let tape_path = tmp
            .path()
            .join("tapes")
            .join(format!("seed{:016x}.tape", run.seed));
        assert_eq!(read_tape(&tape_path)?, run.tape);
    }

    let summary: BenchmarkReport =
        serde_json::from_slice(&fs::read(tmp.path().join("summary.json"))?)?;
    assert_eq!(summary.run_count, 3);
    assert_eq!(summary.seeds, vec![1, 0xC0FF_EE11, 7]);

    let csv = fs::read_to_string(tmp.path().join("runs.csv"))?;
    let mut lines = csv.lines();
    let header = lines.next().unwrap_or_default();
    assert!(header.starts_with("seed_hex,seed,"));
    assert!(header.ends_with(",none,activate"));
    assert_eq!(lines.count(), 3);
    Ok(())
}

#[test]
fn benchmark_rejects_empty_inputs() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = BenchmarkConfig {
        engine: fast_config(),
        scene: SceneKind::Noise,
        width: 16,
        height: 16,
        frames: 10,
        seeds: vec![1],
        out_dir: tmp.path().to_path_buf(),
        jobs: None,
        save_tapes: false,
    };
    assert!(run_benchmark(BenchmarkConfig {
        seeds: Vec::new(),
        ..base.clone()
    })
    .is_err());
    assert!(run_benchmark(BenchmarkConfig {
        jobs: Some(0),
        ..base.clone()
    })
    .is_err());
    assert!(run_benchmark(BenchmarkConfig { frames: 0, ..base }).is_err());
}
