//! Tool Event Logger
//!
//! Structured events around tool execution and model gateway failures,
//! emitted on the `tool_events` target so they land in the NDJSON log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ToolEvent {
    ToolCall {
        tool_name: String,
        arguments_json: String,
    },
    ToolOutcome {
        tool_name: String,
        success: bool,
        error: Option<String>,
        elapsed_ms: u64,
    },
    GatewayError {
        provider: String,
        error_msg: String,
    },
}

impl ToolEvent {
    fn redact(&mut self) {
        match self {
            ToolEvent::ToolCall { arguments_json, .. } => {
                *arguments_json = redact_sensitive_data(arguments_json);
            }
            ToolEvent::ToolOutcome { error: Some(error), .. } => {
                *error = redact_sensitive_data(error);
            }
            ToolEvent::ToolOutcome { error: None, .. } => {}
            ToolEvent::GatewayError { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            ToolEvent::ToolOutcome { success: false, .. } | ToolEvent::GatewayError { .. }
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ToolEventEntry {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ToolEvent,
}

pub struct ToolEventLogger;

impl ToolEventLogger {
    /// Redact and emit one event. Failures are logged at `warn`.
    pub fn log_event(account_id: &str, mut event: ToolEvent) -> ToolEventEntry {
        event.redact();
        let entry = ToolEventEntry {
            account_id: account_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let payload = serde_json::to_string(&entry).unwrap_or_default();
        if entry.event.is_failure() {
            warn!(target: "tool_events", event = %payload, "Tool event");
        } else {
            info!(target: "tool_events", event = %payload, "Tool event");
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_arguments_are_redacted() {
        let entry = ToolEventLogger::log_event(
            "acct_1",
            ToolEvent::ToolCall {
                tool_name: "createClient".into(),
                arguments_json: r#"{"name":"Acme","email":"ops@acme.io"}"#.into(),
            },
        );
        let ToolEvent::ToolCall { arguments_json, .. } = &entry.event else {
            panic!("unexpected event");
        };
        assert!(arguments_json.contains("Acme"));
        assert!(!arguments_json.contains("ops@acme.io"));
        assert_eq!(entry.account_id, "acct_1");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let entry = ToolEventLogger::log_event(
            "acct_1",
            ToolEvent::ToolOutcome {
                tool_name: "getPendingPayments".into(),
                success: true,
                error: None,
                elapsed_ms: 3,
            },
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"]["type"], "ToolOutcome");
        assert_eq!(value["event"]["success"], true);
    }
}
