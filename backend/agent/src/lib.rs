//! LedgerForge chat runner.
//!
//! Dispatches model-requested tool calls, runs a batch of them concurrently,
//! and drives the two-round conversation with the model gateway.

pub mod agent_loop;
pub mod system_prompt;
pub mod tool_dispatcher;

pub use agent_loop::{ChatError, ChatOrchestrator, ChatOutcome, ChatPhase, ChatRequest};
pub use system_prompt::PersonaPrompt;
pub use tool_dispatcher::{ToolDispatcher, DEFAULT_TOOL_TIMEOUT_MS};
