use anyhow::{Context, Result};
use predictor_core::PredictorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{default_history_path, default_sheets_dir, ensure_predictor_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub predictor: PredictorConfig,
    pub paths: PathsSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// History CSV (default: ~/.predictor/history.csv)
    pub history: Option<PathBuf>,
    /// Directory of date-named sheets for `history init` (default: ~/.predictor/sheets)
    pub sheets_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
    /// Also write rotating log files here.
    pub dir: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl Config {
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.paths.history {
            Some(p) => Ok(p.clone()),
            None => default_history_path(),
        }
    }

    pub fn sheets_dir(&self) -> Result<PathBuf> {
        match &self.paths.sheets_dir {
            Some(p) => Ok(p.clone()),
            None => default_sheets_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_predictor_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
