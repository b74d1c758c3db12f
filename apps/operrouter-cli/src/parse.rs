//! Argument and file parsing helpers.

use std::path::Path;

use anyhow::{Context, Result};
use operrouter_sdk::Row;
use serde_json::Value;

/// `KEY=VALUE` for repeatable `--option` flags.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// A JSON object given inline, e.g. `--data '{"name":"alice"}'`.
pub fn parse_row(s: &str) -> Result<Row, String> {
    serde_json::from_str(s).map_err(|e| format!("expected a JSON object: {e}"))
}

/// Read a configuration document. `.json` files are parsed as JSON,
/// everything else as YAML.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    } else {
        serde_saphyr::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))
    }
}
