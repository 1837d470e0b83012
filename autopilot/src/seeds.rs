//! Engine seeds from the command line: single values, lists, seed files and ranges.
//!
//! Consecutive seeds are fine as run seeds; the engine mixes them before use.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Parses `0x`-prefixed hex or decimal; `_` separators are allowed in both.
pub fn parse_seed(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("empty seed"));
    }
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .with_context(|| format!("invalid seed {trimmed:?}"))
}

pub fn seed_to_hex(seed: u64) -> String {
    format!("0x{seed:016x}")
}

/// Where a benchmark takes its seeds from. A seed file wins over a list, and a list
/// wins over the range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedPlan {
    File(PathBuf),
    List(String),
    Range { start: u64, count: u32 },
}

impl SeedPlan {
    pub fn from_args(
        list: Option<String>,
        file: Option<PathBuf>,
        start: Option<&str>,
        count: u32,
    ) -> Result<Self> {
        Ok(match (file, list) {
            (Some(path), _) => SeedPlan::File(path),
            (None, Some(list)) => SeedPlan::List(list),
            (None, None) => SeedPlan::Range {
                start: start.map(parse_seed).transpose()?.unwrap_or(1),
                count,
            },
        })
    }

    pub fn resolve(&self) -> Result<Vec<u64>> {
        let seeds = match self {
            SeedPlan::File(path) => read_seed_file(path)?,
            SeedPlan::List(list) => parse_entries(list.split(','), "--seeds")?,
            SeedPlan::Range { start, count } => (0..u64::from(*count))
                .map(|offset| start.wrapping_add(offset))
                .collect(),
        };
        if seeds.is_empty() {
            return Err(anyhow!("{self} yields no seeds"));
        }
        Ok(seeds)
    }
}

impl std::fmt::Display for SeedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedPlan::File(path) => write!(f, "seed file {}", path.display()),
            SeedPlan::List(_) => f.write_str("--seeds"),
            SeedPlan::Range { start, count } => {
                write!(f, "range of {count} from {}", seed_to_hex(*start))
            }
        }
    }
}

fn read_seed_file(path: &Path) -> Result<Vec<u64>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading seed file {}", path.display()))?;
    parse_entries(data.lines(), &path.display().to_string())
}

/// Blank entries and `#` comments are skipped; errors name the 1-based entry.
fn parse_entries<'a, I>(entries: I, origin: &str) -> Result<Vec<u64>>
where
    I: Iterator<Item = &'a str>,
{
    let mut seeds = Vec::new();
    for (idx, entry) in entries.enumerate() {
        let entry = entry.split('#').next().unwrap_or_default().trim();
        if entry.is_empty() {
            continue;
        }
        seeds.push(parse_seed(entry).with_context(|| format!("{origin} entry {}", idx + 1))?);
    }
    Ok(seeds)
}
