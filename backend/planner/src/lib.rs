//! Model gateways: the text-generation capability behind the chat endpoint.
//!
//! Each provider turns a transcript plus the tool catalog into its own
//! function-calling request and maps the answer back to a [`ModelReply`].
//!
//! [`ModelReply`]: ledgerforge_core::ModelReply

pub mod providers;

pub use providers::mock::ScriptedGateway;
pub use providers::ollama::OllamaGateway;
pub use providers::openrouter::OpenRouterGateway;
pub use providers::{build_gateway, GatewaySettings};
