//! File-per-request audit log: one pretty-printed JSON record per dispatch.

use crate::traits::{AuditEntry, AuditLogger};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, error};

pub const MAX_LOGGED_OUTPUT_CHARS: usize = 50_000;

pub struct RequestLogger {
    requests_dir: PathBuf,
}

impl RequestLogger {
    pub fn new(requests_dir: impl Into<PathBuf>) -> Self {
        Self {
            requests_dir: requests_dir.into(),
        }
    }

    pub async fn write_record(&self, entry: &AuditEntry) -> std::io::Result<PathBuf> {
        let now = chrono::Utc::now();
        let timestamp_ms = now.timestamp_millis();

        // Suffix keeps same-millisecond calls from the same requester apart
        let id = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}-{}-{}-{}.json",
            timestamp_ms,
            entry.tool_name,
            safe_requester(&entry.requester),
            &id[..8]
        );
        let path = self.requests_dir.join(filename);

        let record = json!({
            "timestamp_ms": timestamp_ms,
            "timestamp_iso": now.to_rfc3339(),
            "requester": entry.requester,
            "tool_name": entry.tool_name,
            "input_params": entry.input_params,
            "output_result": truncate_output(&entry.output_result),
        });

        tokio::fs::create_dir_all(&self.requests_dir).await?;
        let body = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[async_trait]
impl AuditLogger for RequestLogger {
    async fn log(&self, entry: AuditEntry) {
        // Logging failures never reach the caller.
        match self.write_record(&entry).await {
            Ok(path) => debug!("Logged request to {}", path.display()),
            Err(e) => error!("Failed to log request: {}", e),
        }
    }
}

pub fn safe_requester(requester: &str) -> String {
    requester
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn truncate_output(output: &Value) -> Value {
    match output {
        Value::String(text) => {
            let total = text.chars().count();
            if total <= MAX_LOGGED_OUTPUT_CHARS {
                return output.clone();
            }
            let kept: String = text.chars().take(MAX_LOGGED_OUTPUT_CHARS).collect();
            Value::String(format!("{}\n... [TRUNCATED, total length: {}]", kept, total))
        }
        other => other.clone(),
    }
}
