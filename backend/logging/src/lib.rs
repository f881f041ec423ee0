//! Telemetry and structured logging for LedgerForge.
//!
//! Handles log redaction, console and rolling NDJSON file output, and the
//! tool event log written around every tool execution.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ToolEvent, ToolEventEntry, ToolEventLogger};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, redact_value};
