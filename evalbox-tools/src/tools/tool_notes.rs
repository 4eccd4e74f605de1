//! Append-only markdown notes about tool usage, one file per tool name.

use crate::error::ToolError;
use crate::invocation::InvocationContext;
use crate::tools::base::{Tool, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Deserialize)]
struct SaveNotesInput {
    tool_name: String,
    markdown_notes: String,
}

#[derive(Deserialize)]
struct ReadNotesInput {
    tool_name: String,
}

pub fn safe_tool_name(tool_name: &str) -> String {
    tool_name.replace(['/', '\\'], "_")
}

fn notes_file(notes_dir: &Path, tool_name: &str) -> PathBuf {
    notes_dir.join(format!("{}.md", safe_tool_name(tool_name)))
}

fn require(value: &str, field: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::ValidationError(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SaveToolNotesTool {
    notes_dir: PathBuf,
}

impl SaveToolNotesTool {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
        }
    }

    async fn append(&self, tool_name: &str, notes: &str, timestamp: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.notes_dir).await?;
        let path = notes_file(&self.notes_dir, tool_name);
        let is_new = !fs::try_exists(&path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if is_new {
            file.write_all(format!("# Tool Usage Notes: {}\n", tool_name).as_bytes())
                .await?;
        }
        let entry = format!("\n\n---\n**Added:** {}\n\n{}\n", timestamp, notes);
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl Tool for SaveToolNotesTool {
    fn name(&self) -> &'static str {
        "save_tool_notes"
    }

    fn description(&self) -> &'static str {
        "Appends timestamped markdown notes about how to use a tool"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "tool_name": {"type": "string"},
                "markdown_notes": {"type": "string"}
            },
            "required": ["tool_name", "markdown_notes"]
        })
    }

    async fn execute(
        &self,
        _ctx: InvocationContext,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let input: SaveNotesInput = serde_json::from_value(input)
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;
        require(&input.tool_name, "tool_name")?;
        require(&input.markdown_notes, "markdown_notes")?;

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match self
            .append(&input.tool_name, &input.markdown_notes, &timestamp)
            .await
        {
            Ok(()) => {
                info!("Notes saved for tool: {}", input.tool_name);
                Ok(ToolResult::text(
                    true,
                    format!(
                        "✓ Notes saved successfully\n\nTool: {}\nFile: tool_notes/{}.md\nTimestamp: {}",
                        input.tool_name,
                        safe_tool_name(&input.tool_name),
                        timestamp
                    ),
                ))
            }
            Err(e) => {
                error!("Error saving tool notes: {}", e);
                Ok(ToolResult::text(false, format!("✗ Error saving notes: {}", e)))
            }
        }
    }
}

#[derive(Clone)]
pub struct ReadToolNotesTool {
    notes_dir: PathBuf,
}

impl ReadToolNotesTool {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for ReadToolNotesTool {
    fn name(&self) -> &'static str {
        "read_tool_notes"
    }

    fn description(&self) -> &'static str {
        "Reads all saved usage notes for a tool"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "tool_name": {"type": "string"}
            },
            "required": ["tool_name"]
        })
    }

    async fn execute(
        &self,
        _ctx: InvocationContext,
        input: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let input: ReadNotesInput = serde_json::from_value(input)
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;
        require(&input.tool_name, "tool_name")?;

        let path = notes_file(&self.notes_dir, &input.tool_name);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                info!(
                    "Read {} characters of notes for {}",
                    content.chars().count(),
                    input.tool_name
                );
                Ok(ToolResult::text(true, content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ToolResult::text(
                true,
                format!(
                    "No notes found for tool: {}\n\nUse save_tool_notes() to create the first note for this tool.",
                    input.tool_name
                ),
            )),
            Err(e) => {
                error!("Error reading tool notes: {}", e);
                Ok(ToolResult::text(false, format!("✗ Error reading notes: {}", e)))
            }
        }
    }
}
