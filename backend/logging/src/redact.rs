//! Log Redaction Layer
//!
//! Scrubs API keys, bearer tokens, e-mail addresses and phone numbers from
//! strings prior to logging. Tool arguments carry client contact details, so
//! everything the tool event log writes goes through here first.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static TELEPHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]?\d{4}").unwrap());
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(sk-[a-zA-Z0-9\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    let redacted = EMAIL_RE.replace_all(&redacted, "[REDACTED_EMAIL]");
    TELEPHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").into_owned()
}

/// Serialize a JSON value and redact it.
pub fn redact_value(value: &Value) -> String {
    redact_sensitive_data(&value.to_string())
}
