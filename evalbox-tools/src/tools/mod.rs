pub mod base;
pub mod py_eval;
pub mod tool_notes;

pub use base::{Tool, ToolResult};
pub use py_eval::{Evaluation, PyEvalTool};
pub use tool_notes::{ReadToolNotesTool, SaveToolNotesTool};
