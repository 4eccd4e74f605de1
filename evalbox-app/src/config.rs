use anyhow::{Context, Result};
use evalbox_tools::EvalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "evalbox.yaml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub eval: EvalConfig,
    pub requests_dir: PathBuf,
    /// Defaults to `<data_dir>/tool_notes`.
    pub notes_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eval: EvalConfig::default(),
            requests_dir: PathBuf::from("data/requests"),
            notes_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Reads `path` if present, falls back to defaults otherwise, then applies
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if Self::exists(path) {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("EVALBOX_DATA_DIR").filter(|v| !v.is_empty()) {
            self.eval.data_dir = PathBuf::from(dir);
        }
        if let Some(python) = lookup("EVALBOX_PYTHON").filter(|v| !v.is_empty()) {
            self.eval.interpreter = python;
        }
        if let Some(level) = lookup("EVALBOX_LOG").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.eval.validate().context("Invalid eval section")?;
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log_level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        Ok(())
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.notes_dir
            .clone()
            .unwrap_or_else(|| self.eval.data_dir.join("tool_notes"))
    }

    /// Outer bound for a single dispatched call: the longest allowed deadline
    /// plus time to spawn and tear down the interpreter.
    pub fn watchdog_ms(&self) -> u64 {
        (self.eval.max_timeout_secs * 1000.0) as u64 + 10_000
    }
}
