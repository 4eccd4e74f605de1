use crate::error::ToolError;
use crate::invocation::InvocationContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn text(success: bool, text: String) -> Self {
        Self {
            success,
            error: if success { None } else { Some(text.clone()) },
            output: Some(serde_json::Value::String(text)),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        ctx: InvocationContext,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError>;
}
