use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::RunDataset;
use crate::utils;

/// Reads the previously persisted dataset. A missing or unreadable file
/// is treated as "no previous run" rather than an error.
pub fn load(path: &Path) -> Option<RunDataset> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Writes the dataset atomically enough for a single-process batch job:
/// this is the run's final action, so a failure here leaves the previous
/// file untouched and fails the run.
pub fn save(path: &Path, dataset: &RunDataset) -> Result<()> {
    utils::ensure_parent(&path.to_path_buf());
    let contents = serde_json::to_string_pretty(dataset).context("serialize dataset")?;
    fs::write(path, contents).with_context(|| format!("write dataset to {}", path.display()))?;
    Ok(())
}
