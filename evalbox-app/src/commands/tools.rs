use anyhow::Result;
use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let registry = super::build_registry(config)?;
    let schemas = serde_json::Value::Array(registry.schemas());
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}
