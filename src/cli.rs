//! Argument helpers for the `call` subcommand.

use crate::session_daemon::protocol::Args;
use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Parses `key=value`. The value is read as JSON when it parses, so `depth=3`
/// is a number and `first=true` a boolean; anything else is a plain string.
pub fn parse_pair(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Merges `--args` JSON with `key=value` pairs; pairs win on conflicts.
pub fn build_args(json: Option<&str>, pairs: Vec<(String, Value)>) -> Result<Args> {
    let mut args = match json {
        Some(raw) => match serde_json::from_str(raw).context("--args is not valid JSON")? {
            Value::Object(map) => map,
            Value::Null => Args::new(),
            other => bail!("--args must be a JSON object, got {}", other),
        },
        None => Args::new(),
    };
    args.extend(pairs);
    Ok(args)
}
