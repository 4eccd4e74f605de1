use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// One dispatched tool call, as recorded by an [`AuditLogger`].
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub requester: String,
    pub tool_name: String,
    pub input_params: Value,
    pub output_result: Value,
}

/// Audit logger trait
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, entry: AuditEntry);
}

/// Discards every entry.
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _entry: AuditEntry) {}
}
