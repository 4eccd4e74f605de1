use anyhow::Result;
use crate::config::Config;
use evalbox_tools::{PyEvalTool, Submission};
use std::path::Path;

const PROBE_CODE: &str = "print('ok')";

pub async fn run(config: &Config) -> Result<()> {
    println!("Health Check\n");

    let mut healthy = true;

    print!("Configuration... ");
    let tool = match build_tool(config) {
        Ok(tool) => {
            println!("✓");
            Some(tool)
        }
        Err(e) => {
            println!("✗ ({:#})", e);
            healthy = false;
            None
        }
    };

    // Runs through the full runner so interpreter and modules are checked together
    print!("Interpreter {} and modules... ", config.eval.interpreter);
    match tool {
        Some(tool) => match probe(&tool).await {
            Ok(()) => println!("✓"),
            Err(e) => {
                println!("✗ ({})", e);
                healthy = false;
            }
        },
        None => {
            println!("✗ (skipped)");
            healthy = false;
        }
    }

    for (label, dir) in [
        ("Data directory", config.eval.data_dir.clone()),
        ("Requests directory", config.requests_dir.clone()),
        ("Notes directory", config.notes_dir()),
    ] {
        print!("{} {}... ", label, dir.display());
        match check_dir(&dir) {
            Ok(()) => println!("✓"),
            Err(e) => {
                println!("✗ ({})", e);
                healthy = false;
            }
        }
    }

    println!();
    if healthy {
        println!("All checks passed");
        Ok(())
    } else {
        anyhow::bail!("Health check failed");
    }
}

fn build_tool(config: &Config) -> Result<PyEvalTool> {
    config.validate()?;
    Ok(PyEvalTool::new(config.eval.clone())?)
}

async fn probe(tool: &PyEvalTool) -> Result<()> {
    let submission = Submission::new(PROBE_CODE, None, tool.config())?;
    let evaluation = tool.evaluate(submission).await;
    if evaluation.is_completed() && evaluation.response.trim() == "ok" {
        Ok(())
    } else {
        anyhow::bail!("{}", evaluation.response.trim())
    }
}

/// Creates `dir` if needed and checks it accepts writes.
pub fn check_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let marker = dir.join(".evalbox-health");
    std::fs::write(&marker, b"ok")?;
    std::fs::remove_file(&marker)?;
    Ok(())
}
