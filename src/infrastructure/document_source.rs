// Dashboard document source - reads raw JSON documents from disk
use anyhow::Context;
use serde_json::{Map, Value};
use std::path::Path;

pub async fn load_raw_document(path: impl AsRef<Path>) -> anyhow::Result<Value> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dashboard {}", path.display()))?;

    parse_raw_document(&contents).with_context(|| format!("Failed to parse dashboard {}", path.display()))
}

/// An empty file is an empty document.
pub fn parse_raw_document(contents: &str) -> serde_json::Result<Value> {
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(contents)
}
