use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::message::{ConversationTurn, ModelReply};
use crate::types::{AccountContext, ToolResult, ToolSpec};

/// A business operation the model may ask to run.
///
/// `invoke` is total: argument problems, missing records and store failures
/// all come back as a failed [`ToolResult`], never as a panic or error.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Catalog entry for this tool.
    fn spec(&self) -> &ToolSpec;

    /// Run the tool for `account` with the raw arguments the model produced.
    async fn invoke(&self, args: Value, account: &AccountContext) -> ToolResult;

    fn name(&self) -> &str {
        &self.spec().name
    }
}

/// The text-generation capability behind the chat endpoint.
///
/// Given a transcript and the tool catalog it answers with text, tool calls,
/// or both.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Provider name (e.g., "openrouter", "ollama").
    fn name(&self) -> &str;

    async fn generate(&self, transcript: &[ConversationTurn], catalog: &[ToolSpec]) -> Result<ModelReply>;
}
