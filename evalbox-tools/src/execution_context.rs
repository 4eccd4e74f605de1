//! Execution context: the named values a submission sees at top level.
//!
//! A context is assembled from scratch for every submission and moved into the
//! runner, so nothing bound for one call can be observed by another. The
//! library handles are imported by the child interpreter itself; any caches
//! those libraries keep live and die with that process.

use crate::config::EvalConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// Import the named module and bind the module object.
    Module,
    /// Bind the literal string.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ExecutionContext {
    bindings: Vec<Binding>,
}

impl ExecutionContext {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Stateless factory for [`ExecutionContext`] values.
///
/// Holds only the startup configuration; `build` never hands out a shared
/// instance.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    modules: Vec<(String, String)>,
    data_dir_binding: String,
    data_dir: PathBuf,
}

impl ContextBuilder {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            modules: config
                .modules
                .iter()
                .map(|m| (m.name.clone(), m.module.clone()))
                .collect(),
            data_dir_binding: config.data_dir_binding.clone(),
            data_dir: absolute_dir(&config.data_dir),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn build(&self) -> ExecutionContext {
        let mut bindings: Vec<Binding> = self
            .modules
            .iter()
            .map(|(name, module)| Binding {
                name: name.clone(),
                kind: BindingKind::Module,
                value: module.clone(),
            })
            .collect();

        bindings.push(Binding {
            name: self.data_dir_binding.clone(),
            kind: BindingKind::Text,
            value: self.data_dir.to_string_lossy().into_owned(),
        });

        ExecutionContext { bindings }
    }
}

// The directory is owned by the persistence side; it may not exist yet.
fn absolute_dir(dir: &Path) -> PathBuf {
    if let Ok(canonical) = dir.canonicalize() {
        return canonical;
    }
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}
