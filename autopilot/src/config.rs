use aedoom_core::EngineConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_SEED: &str = "AEDOOM_SEED";
pub const ENV_CADENCE: &str = "AEDOOM_CADENCE";
pub const ENV_WORKERS: &str = "AEDOOM_WORKERS";
pub const ENV_SAMPLE_FRACTION: &str = "AEDOOM_SAMPLE_FRACTION";

pub fn preset(headless: bool) -> EngineConfig {
    if headless {
        EngineConfig::headless()
    } else {
        EngineConfig::windowed()
    }
}

/// Builds the engine config: preset, then the optional JSON file, then env overrides.
pub fn load_engine_config(path: Option<&Path>, headless: bool) -> Result<EngineConfig> {
    load_engine_config_with(path, headless, |name| env::var(name).ok())
}

pub fn load_engine_config_with<F>(
    path: Option<&Path>,
    headless: bool,
    lookup: F,
) -> Result<EngineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => read_config_file(path, preset(headless))?,
        None => preset(headless),
    };
    let config = apply_overrides(config, lookup);
    config
        .validate()
        .context("engine config failed validation")?;
    Ok(config)
}

/// Reads a JSON config and lays it over `base`; fields the file omits keep `base`'s
/// values, nested objects included.
pub fn read_config_file(path: &Path, base: EngineConfig) -> Result<EngineConfig> {
    let data =
        fs::read(path).with_context(|| format!("failed reading config {}", path.display()))?;
    let overlay: Value = serde_json::from_slice(&data)
        .with_context(|| format!("failed parsing config {}", path.display()))?;
    let mut merged = serde_json::to_value(&base).context("failed to encode base config")?;
    merge_json(&mut merged, overlay);
    serde_json::from_value(merged)
        .with_context(|| format!("invalid engine config in {}", path.display()))
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Applies `AEDOOM_*` overrides looked up through `lookup`. Unparseable or out-of-range
/// values are ignored with a warning.
pub fn apply_overrides<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(seed) = read_u64(&lookup, ENV_SEED) {
        config.seed = seed;
    }
    if let Some(cadence) = read_positive(&lookup, ENV_CADENCE) {
        config.decision_cadence = cadence;
    }
    if let Some(workers) = read_positive(&lookup, ENV_WORKERS) {
        config.workers = Some(workers as usize);
    }
    if let Some(fraction) = read_fraction(&lookup, ENV_SAMPLE_FRACTION) {
        config.sample_fraction = fraction;
    }
    config
}

fn read_u64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match crate::seeds::parse_seed(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("{name}={raw:?} is not an integer ({err}). Ignoring.");
            None
        }
    }
}

fn read_positive<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<u64> {
    match read_u64(lookup, name)? {
        0 => {
            tracing::warn!("{name}=0 must be >= 1. Ignoring.");
            None
        }
        value => Some(value),
    }
}

fn read_fraction<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<f32> {
    let raw = lookup(name)?;
    match raw.trim().parse::<f32>() {
        Ok(value) if value > 0.0 && value <= 1.0 => Some(value),
        _ => {
            tracing::warn!("{name}={raw:?} must be a number in (0, 1]. Ignoring.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_replace_preset_values() {
        let env = vars(&[
            (ENV_SEED, "0x10"),
            (ENV_CADENCE, "12"),
            (ENV_WORKERS, "3"),
            (ENV_SAMPLE_FRACTION, "0.5"),
        ]);
        let config = apply_overrides(EngineConfig::windowed(), |name| env.get(name).cloned());
        assert_eq!(config.seed, 16);
        assert_eq!(config.decision_cadence, 12);
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.sample_fraction, 0.5);
    }

    #[test]
    fn invalid_overrides_keep_defaults() {
        let env = vars(&[
            (ENV_SEED, "seven"),
            (ENV_CADENCE, "0"),
            (ENV_WORKERS, "-2"),
            (ENV_SAMPLE_FRACTION, "1.5"),
        ]);
        let config = apply_overrides(EngineConfig::headless(), |name| env.get(name).cloned());
        assert_eq!(config, EngineConfig::headless());
    }

    #[test]
    fn zero_workers_override_is_ignored() {
        let env = vars(&[(ENV_WORKERS, "0")]);
        let config = apply_overrides(EngineConfig::windowed(), |name| env.get(name).cloned());
        assert_eq!(config.workers, None);
    }

    #[test]
    fn config_file_keeps_the_selected_preset() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("engine.json");
        fs::write(&path, r#"{"seed": 5, "adam": {"learning_rate": 0.01}}"#)?;

        let headless = load_engine_config_with(Some(&path), true, |_| None)?;
        assert_eq!(headless.seed, 5);
        assert_eq!(headless.sample_fraction, 0.25);
        assert_eq!(headless.adam.learning_rate, 0.01);
        assert_eq!(headless.adam.beta1, 0.8);

        let windowed = load_engine_config_with(Some(&path), false, |_| None)?;
        assert_eq!(windowed.sample_fraction, 1.0 / 64.0);
        assert_eq!(windowed.seed, 5);
        Ok(())
    }

    #[test]
    fn config_file_must_hold_an_object() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("engine.json");
        fs::write(&path, "[1, 2]")?;
        assert!(read_config_file(&path, EngineConfig::windowed()).is_err());
        Ok(())
    }
}
