//! Sandboxed Python execution behind a small tool-call surface.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod execution_context;
pub mod invocation;
pub mod outcome;
pub mod registry;
pub mod request_log;
pub mod sandbox;
pub mod submission;
pub mod tools;
pub mod traits;

pub use config::{EvalConfig, ModuleBinding};
pub use dispatcher::ToolDispatcherImpl;
pub use error::ToolError;
pub use execution_context::{ContextBuilder, ExecutionContext};
pub use invocation::InvocationContext;
pub use outcome::{normalize, ExecutionOutcome};
pub use registry::ToolRegistryImpl;
pub use request_log::RequestLogger;
pub use submission::Submission;
pub use tools::{PyEvalTool, Tool, ToolResult};
pub use traits::{AuditEntry, AuditLogger, NoopAuditLogger};
