use crate::config::EvalConfig;
use crate::error::ToolError;
use crate::execution_context::ContextBuilder;
use crate::invocation::InvocationContext;
use crate::outcome::{normalize, INTERNAL_ERROR_RESPONSE};
use crate::sandbox::{DeadlineController, IsolatedRunner};
use crate::submission::Submission;
use crate::tools::base::{Tool, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Deserialize)]
struct PyEvalInput {
    code: String,
    #[serde(default, alias = "timeout_sec")]
    timeout_seconds: Option<f64>,
}

/// Response for one validated call, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub response: String,
    pub outcome: &'static str,
}

impl Evaluation {
    pub fn is_completed(&self) -> bool {
        self.outcome == "completed"
    }
}

/// Entry point for code execution: validate, build a context, run under a
/// deadline, normalize. Nothing below this type can make it fail except
/// input validation.
pub struct PyEvalTool {
    config: EvalConfig,
    builder: ContextBuilder,
    runner: IsolatedRunner,
}

impl PyEvalTool {
    pub fn new(config: EvalConfig) -> Result<Self, ToolError> {
        config.validate()?;
        let builder = ContextBuilder::new(&config);
        let runner = IsolatedRunner::new(&config, builder.data_dir());
        Ok(Self {
            config,
            builder,
            runner,
        })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub async fn run(&self, code: &str, timeout_seconds: Option<f64>) -> Result<String, ToolError> {
        let submission = Submission::new(code, timeout_seconds, &self.config)?;
        Ok(self.evaluate(submission).await.response)
    }

    pub async fn evaluate(&self, submission: Submission) -> Evaluation {
        let deadline = DeadlineController::new(submission.timeout());
        let context = self.builder.build();

        match self.runner.run(submission.code(), context, &deadline).await {
            Ok(outcome) => {
                info!("py_eval finished: {}", outcome.label());
                Evaluation {
                    response: normalize(&outcome),
                    outcome: outcome.label(),
                }
            }
            Err(e) => {
                error!("py_eval host fault: {}", e);
                Evaluation {
                    response: INTERNAL_ERROR_RESPONSE.to_string(),
                    outcome: "host_fault",
                }
            }
        }
    }
}

#[async_trait]
impl Tool for PyEvalTool {
    fn name(&self) -> &'static str {
        "py_eval"
    }

    fn description(&self) -> &'static str {
        "Executes Python code with pandas (pd), numpy (np) and the results directory path (CSV_PATH) pre-bound. Returns captured stdout. Each call starts fresh."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string"},
                "timeout_seconds": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "maximum": self.config.max_timeout_secs,
                    "default": self.config.default_timeout_secs
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(
        &self,
        ctx: InvocationContext,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let input: PyEvalInput = serde_json::from_value(input)
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;

        let submission = Submission::new(&input.code, input.timeout_seconds, &self.config)?;
        info!(
            "py_eval request {} from {} (timeout {:?})",
            ctx.request_id,
            ctx.requester,
            submission.timeout()
        );

        let evaluation = self.evaluate(submission).await;
        Ok(ToolResult::text(evaluation.is_completed(), evaluation.response))
    }
}
