use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn predictor_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".predictor"))
}

pub fn ensure_predictor_home() -> Result<PathBuf> {
    let dir = predictor_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// History CSV used when neither the command line nor the config names one.
pub fn default_history_path() -> Result<PathBuf> {
    Ok(ensure_predictor_home()?.join("history.csv"))
}

pub fn default_sheets_dir() -> Result<PathBuf> {
    Ok(ensure_predictor_home()?.join("sheets"))
}
