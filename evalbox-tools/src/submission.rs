use crate::config::EvalConfig;
use crate::error::ToolError;
use std::time::Duration;

/// Caller-supplied code and its deadline, validated once at call entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    code: String,
    timeout: Duration,
}

impl Submission {
    pub fn new(
        code: &str,
        timeout_seconds: Option<f64>,
        config: &EvalConfig,
    ) -> Result<Self, ToolError> {
        if code.trim().is_empty() {
            return Err(ToolError::ValidationError("code must not be empty".into()));
        }

        let timeout = match timeout_seconds {
            None => to_duration("default_timeout_secs", config.default_timeout_secs)?,
            Some(secs) if !secs.is_finite() || secs <= 0.0 => {
                return Err(ToolError::ValidationError(format!(
                    "timeout_seconds must be a positive number, got {}",
                    secs
                )));
            }
            Some(secs) if secs > config.max_timeout_secs => {
                return Err(ToolError::ValidationError(format!(
                    "timeout_seconds {} exceeds the maximum of {}s",
                    secs, config.max_timeout_secs
                )));
            }
            Some(secs) => to_duration("timeout_seconds", secs)?,
        };

        Ok(Self {
            code: code.to_string(),
            timeout,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn to_duration(label: &str, secs: f64) -> Result<Duration, ToolError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ToolError::ValidationError(format!("{} is out of range: {}", label, secs))
    })
}
