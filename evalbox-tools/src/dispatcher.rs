use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use tracing::{info, warn, error};
use serde_json::json;
use crate::registry::ToolRegistryImpl;
use crate::invocation::InvocationContext;
use crate::error::ToolError;
use crate::tools::ToolResult;
use crate::traits::{AuditEntry, AuditLogger};

const MAX_INPUT_BYTES: usize = 1_000_000;

pub struct ToolDispatcherImpl {
    registry: Arc<ToolRegistryImpl>,
    audit: Arc<dyn AuditLogger>,
    pending_audits: Mutex<JoinSet<()>>,
    watchdog_ms: u64,
}

impl ToolDispatcherImpl {
    /// `watchdog_ms` bounds any single tool call from the outside. Tools with
    /// their own deadline should get a watchdog comfortably above it.
    pub fn new(
        registry: Arc<ToolRegistryImpl>,
        audit: Arc<dyn AuditLogger>,
        watchdog_ms: u64,
    ) -> Self {
        Self {
            registry,
            audit,
            pending_audits: Mutex::new(JoinSet::new()),
            watchdog_ms,
        }
    }

    pub fn registry(&self) -> &ToolRegistryImpl {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        requester: String,
        tool_name: String,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        info!("Dispatching tool: {} for requester: {}", tool_name, requester);

        // 1. Lookup tool
        let tool = self.registry.get(&tool_name)
            .ok_or_else(|| ToolError::ValidationError(format!("Tool not found: {}", tool_name)))?;

        // 2. Validate payload shape
        if !self.validate_input(&input) {
            return Err(ToolError::ValidationError("Input must be a JSON object under 1MB".into()));
        }

        // 3. Execute in isolation
        let ctx = InvocationContext::new(requester.clone());
        let result = self.execute_with_protection(tool, ctx, input.clone()).await;

        // 4. Always audit (isolated from result)
        self.log_audit_isolated(&requester, &tool_name, input, &result);

        result
    }

    fn validate_input(&self, input: &serde_json::Value) -> bool {
        if !input.is_object() {
            return false;
        }

        match serde_json::to_string(input) {
            Ok(serialized) => serialized.len() <= MAX_INPUT_BYTES,
            Err(_) => false,
        }
    }

    async fn execute_with_protection(
        &self,
        tool: Arc<dyn crate::tools::Tool>,
        ctx: InvocationContext,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let watchdog_ms = self.watchdog_ms;

        // Spawn task to isolate panics
        let handle = tokio::spawn(async move {
            tool.execute(ctx, input).await
        });

        match timeout(Duration::from_millis(watchdog_ms), handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    error!("Tool execution panicked");
                } else {
                    error!("Tool execution cancelled");
                }
                Err(ToolError::Internal)
            }
            Err(_) => {
                warn!("Tool execution exceeded watchdog of {}ms", watchdog_ms);
                Err(ToolError::Timeout)
            }
        }
    }

    fn log_audit_isolated(
        &self,
        requester: &str,
        tool_name: &str,
        input: serde_json::Value,
        result: &Result<ToolResult, ToolError>,
    ) {
        let output_result = match result {
            Ok(r) => match &r.output {
                Some(serde_json::Value::String(text)) => json!(text),
                _ => json!({"success": r.success, "output": &r.output, "error": &r.error}),
            },
            Err(e) => json!({"error": e.to_string()}),
        };

        let entry = AuditEntry {
            requester: requester.to_string(),
            tool_name: tool_name.to_string(),
            input_params: input,
            output_result,
        };

        // Not awaited here; flush() waits for whatever is still pending
        let audit = self.audit.clone();
        let mut pending = self
            .pending_audits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            audit.log(entry).await;
        });
    }

    /// Waits for every audit write started so far.
    pub async fn flush(&self) {
        let mut pending = {
            let mut guard = self
                .pending_audits
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                error!("Audit task failed: {}", e);
            }
        }
    }
}
