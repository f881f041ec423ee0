//! Config redaction: produce safe-to-log config snapshots by masking
//! credentials.
//!
//! Masks provider API keys, the keys of the `auth.apiKeys` map (the map keys
//! are the secrets there), and anything that looks like a phone number.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::LedgerForgeConfig;

/// Field names whose string values are secrets.
static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "token",
    "accessToken",
    "secret",
    "password",
];

/// Map whose keys, not values, are secrets.
const KEYED_SECRETS: &str = "apiKeys";

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{10,15}$").unwrap());

/// Redact a config JSON value, masking sensitive strings to a 4-char hint.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Redacted JSON view of a typed config, for startup logging.
pub fn redacted_summary(config: &LedgerForgeConfig) -> Value {
    serde_json::to_value(config)
        .map(|v| redact(&v))
        .unwrap_or(Value::Null)
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn redact_string(s: &str, key: &str) -> Value {
    if !s.is_empty() && (is_sensitive_key(key) || PHONE_PATTERN.is_match(s)) {
        return Value::String(mask(s));
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) if key == KEYED_SECRETS => {
            let masked: Map<String, Value> = map
                .iter()
                .enumerate()
                .map(|(i, (k, v))| (format!("{}#{}", mask(k), i + 1), redact_recursive(v, "")))
                .collect();
            Value::Object(masked)
        }
        Value::Object(map) => {
            let mut result = Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}
