use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Operation timed out")]
    Timeout,

    /// The runner or deadline machinery broke, not the submission.
    #[error("Host fault: {0}")]
    HostFault(String),

    #[error("Internal error")]
    Internal,
}
