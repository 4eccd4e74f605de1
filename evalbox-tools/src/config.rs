use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
pub const MAX_TIMEOUT_SECS: f64 = 60.0;
/// Largest `max_timeout_secs` a config may set.
pub const TIMEOUT_CEILING_SECS: f64 = 86_400.0;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 2048;

/// A library handle bound into every execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleBinding {
    pub name: String,
    pub module: String,
}

impl ModuleBinding {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
        }
    }
}

/// Fixed inputs of the execution core, supplied once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub interpreter: String,
    pub data_dir: PathBuf,
    pub data_dir_binding: String,
    pub modules: Vec<ModuleBinding>,
    pub default_timeout_secs: f64,
    pub max_timeout_secs: f64,
    pub max_output_bytes: usize,
    pub memory_limit_mb: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            data_dir: PathBuf::from("data/results"),
            data_dir_binding: "CSV_PATH".to_string(),
            modules: vec![
                ModuleBinding::new("pd", "pandas"),
                ModuleBinding::new("np", "numpy"),
            ],
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_timeout_secs: MAX_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            memory_limit_mb: Some(DEFAULT_MEMORY_LIMIT_MB),
        }
    }
}

impl EvalConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_modules(mut self, modules: Vec<ModuleBinding>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if self.interpreter.trim().is_empty() {
            return Err(ToolError::ValidationError("interpreter must be set".into()));
        }

        for (label, value) in [
            ("default_timeout_secs", self.default_timeout_secs),
            ("max_timeout_secs", self.max_timeout_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ToolError::ValidationError(format!(
                    "{} must be a positive number, got {}",
                    label, value
                )));
            }
        }

        if self.max_timeout_secs > TIMEOUT_CEILING_SECS {
            return Err(ToolError::ValidationError(format!(
                "max_timeout_secs ({}) exceeds {}",
                self.max_timeout_secs, TIMEOUT_CEILING_SECS
            )));
        }

        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(ToolError::ValidationError(format!(
                "default_timeout_secs ({}) exceeds max_timeout_secs ({})",
                self.default_timeout_secs, self.max_timeout_secs
            )));
        }

        if self.max_output_bytes == 0 {
            return Err(ToolError::ValidationError(
                "max_output_bytes must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        let names = self
            .modules
            .iter()
            .map(|m| m.name.as_str())
            .chain(std::iter::once(self.data_dir_binding.as_str()));
        for name in names {
            if !is_identifier(name) {
                return Err(ToolError::ValidationError(format!(
                    "invalid binding name: {:?}",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(ToolError::ValidationError(format!(
                    "duplicate binding name: {}",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
