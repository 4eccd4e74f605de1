pub mod health;
pub mod run;
pub mod serve;
pub mod tools;

use crate::config::Config;
use anyhow::{Context, Result};
use evalbox_tools::{AuditLogger, PyEvalTool, RequestLogger, ToolDispatcherImpl, ToolRegistryImpl};
use std::sync::Arc;

pub fn build_registry(config: &Config) -> Result<ToolRegistryImpl> {
    let py_eval = PyEvalTool::new(config.eval.clone()).context("Invalid eval configuration")?;
    Ok(ToolRegistryImpl::standard(py_eval, config.notes_dir()))
}

/// Registry plus a request logger writing under `requests_dir`.
pub fn build_dispatcher(config: &Config) -> Result<ToolDispatcherImpl> {
    let registry = Arc::new(build_registry(config)?);
    let audit: Arc<dyn AuditLogger> = Arc::new(RequestLogger::new(&config.requests_dir));
    Ok(ToolDispatcherImpl::new(registry, audit, config.watchdog_ms()))
}
