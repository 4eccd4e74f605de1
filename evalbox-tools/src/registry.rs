use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use crate::tools::{PyEvalTool, ReadToolNotesTool, SaveToolNotesTool, Tool};

/// Name-keyed tool table. Iteration order is by name so schema listings are
/// stable across runs.
pub struct ToolRegistryImpl {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistryImpl {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// `py_eval` plus the notes tools writing under `notes_dir`.
    pub fn standard(py_eval: PyEvalTool, notes_dir: impl Into<PathBuf>) -> Self {
        let notes_dir = notes_dir.into();
        let mut registry = Self::new();
        registry
            .register(Arc::new(py_eval))
            .register(Arc::new(SaveToolNotesTool::new(notes_dir.clone())))
            .register(Arc::new(ReadToolNotesTool::new(notes_dir)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn schemas(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.schema()
                    }
                })
            })
            .collect()
    }
}

impl Default for ToolRegistryImpl {
    fn default() -> Self {
        Self::new()
    }
}
