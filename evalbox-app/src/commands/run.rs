use anyhow::{Context, Result};
use crate::config::Config;
use evalbox_tools::{AuditEntry, PyEvalTool, RequestLogger, Submission, ToolError};
use serde_json::json;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Exit status for a call rejected before execution.
pub const EXIT_INVALID: u8 = 2;

/// Runs one submission through the facade and prints the response. Returns the
/// process exit code: 0 when the code completed, 1 when it raised or timed out.
pub async fn run(config: &Config, timeout: Option<f64>, file: Option<&Path>) -> Result<u8> {
    let code = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read code from stdin")?;
            code
        }
    };

    let tool = PyEvalTool::new(config.eval.clone()).context("Invalid eval configuration")?;
    let submission = match Submission::new(&code, timeout, tool.config()) {
        Ok(submission) => submission,
        Err(ToolError::ValidationError(msg)) => {
            eprintln!("Invalid request: {}", msg);
            return Ok(EXIT_INVALID);
        }
        Err(e) => return Err(e.into()),
    };

    let evaluation = tool.evaluate(submission).await;
    print!("{}", evaluation.response);
    if !evaluation.response.ends_with('\n') {
        println!();
    }

    let logger = RequestLogger::new(&config.requests_dir);
    let entry = AuditEntry {
        requester: "cli".to_string(),
        tool_name: "py_eval".to_string(),
        input_params: json!({"code": code, "timeout_seconds": timeout}),
        output_result: json!(evaluation.response),
    };
    if let Err(e) = logger.write_record(&entry).await {
        warn!("Failed to log request: {}", e);
    }

    Ok(if evaluation.is_completed() { 0 } else { 1 })
}
