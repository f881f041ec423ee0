//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time
//!   (uppercase `[A-Z_][A-Z0-9_]*` names only; `$${VAR}` yields a literal
//!   `${VAR}`).
//! - Well-known variables that override individual settings after the file
//!   is parsed (`LEDGERFORGE_PORT`, `OPENROUTER_API_KEY`, ...).

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

use crate::schema::{LedgerForgeConfig, StoreBackend};

/// A reference, optionally preceded by the `$` escape.
static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Only string leaves are processed. Fails if any referenced variable is
/// unset or empty.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

/// Collect all env var names referenced in a config value tree.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if caps[1].is_empty() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

/// Apply well-known environment overrides from the process environment.
pub fn apply_env_overrides(config: LedgerForgeConfig) -> LedgerForgeConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map.
///
/// Explicit settings (`LEDGERFORGE_*`) always win over the file. Provider
/// credentials (`OPENROUTER_API_KEY`, `OLLAMA_URL`) only fill gaps.
pub fn apply_env_overrides_with(mut config: LedgerForgeConfig, env: &HashMap<String, String>) -> LedgerForgeConfig {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(port) = get("LEDGERFORGE_PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.server.port = Some(port),
            Err(_) => warn!(value = %port, "Ignoring invalid LEDGERFORGE_PORT"),
        }
    }
    if let Some(bind) = get("LEDGERFORGE_BIND") {
        config.server.bind = Some(bind.to_string());
    }
    if let Some(db) = get("LEDGERFORGE_DB") {
        config.store.backend = Some(StoreBackend::Sqlite);
        config.store.path = Some(PathBuf::from(db));
    }
    if let Some(provider) = get("LEDGERFORGE_MODEL_PROVIDER") {
        config.model.provider = Some(provider.to_lowercase());
    }
    if let Some(model) = get("LEDGERFORGE_MODEL") {
        config.model.model = Some(model.to_string());
    }
    if config.model.api_key.is_none() {
        config.model.api_key = get("OPENROUTER_API_KEY").map(str::to_string);
    }
    if config.model.base_url.is_none() && config.model.provider.as_deref() == Some("ollama") {
        config.model.base_url = get("OLLAMA_URL").map(str::to_string);
    }
    config
}
