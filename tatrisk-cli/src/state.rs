use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$TATRISK_HOME`, or `~/.tatrisk`.
pub fn tatrisk_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TATRISK_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tatrisk"))
}

pub fn ensure_tatrisk_home() -> Result<PathBuf> {
    let dir = tatrisk_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
