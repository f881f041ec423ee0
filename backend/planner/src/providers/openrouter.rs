use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use ledgerforge_core::{ConversationTurn, ModelGateway, ModelReply, ToolInvocation, ToolSpec};

use super::{chat_messages, function_tools, non_blank};

/// OpenRouter.ai (OpenAI-compatible chat completions with function calling).
pub struct OpenRouterGateway {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn request_body(&self, transcript: &[ConversationTurn], catalog: &[ToolSpec]) -> ChatRequest {
        let tools = function_tools(catalog);
        ChatRequest {
            model: self.model.clone(),
            messages: chat_messages(transcript),
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
            tools,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn into_reply(response: ChatResponse) -> ModelReply {
    let Some(choice) = response.choices.into_iter().next() else {
        return ModelReply::default();
    };
    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let args = if call.function.arguments.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                    warn!(tool = %call.function.name, error = %e, "Model sent unparseable tool arguments");
                    Value::Null
                })
            };
            ToolInvocation::new(call.function.name, args)
        })
        .collect();
    ModelReply {
        text: non_blank(choice.message.content),
        tool_calls,
    }
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(&self, transcript: &[ConversationTurn], catalog: &[ToolSpec]) -> Result<ModelReply> {
        let start = Instant::now();
        let body = self.request_body(transcript, catalog);

        debug!(
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending request to OpenRouter"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("OpenRouter HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouter returned {}: {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        let tokens_used = chat_response.usage.as_ref().and_then(|u| u.total_tokens).unwrap_or(0);
        let reply = into_reply(chat_response);

        debug!(
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            tool_calls = reply.tool_calls.len(),
            "OpenRouter responded"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_carries_tools() {
        let gateway = OpenRouterGateway::new("sk-test", "openai/gpt-4o-mini");
        let catalog = vec![ToolSpec::new("getPendingPayments", "Pending total")];
        let body = gateway.request_body(&[ConversationTurn::user_text("what's pending?")], &catalog);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "openai/gpt-4o-mini");
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["tools"][0]["function"]["name"], "getPendingPayments");
        assert_eq!(value["messages"][0]["content"], "what's pending?");

        let bare = serde_json::to_value(gateway.request_body(&[], &[])).unwrap();
        assert!(bare.get("tools").is_none());
        assert!(bare.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_calls_decode_string_arguments() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        { "id": "c1", "type": "function", "function": { "name": "addQuickExpense", "arguments": "{\"amount\":500,\"description\":\"lunch\"}" } },
                        { "id": "c2", "type": "function", "function": { "name": "getCurrentDateTime", "arguments": "" } },
                        { "id": "c3", "type": "function", "function": { "name": "listClients", "arguments": "{oops" } }
                    ]
                }
            }]
        }))
        .unwrap();
        let reply = into_reply(response);
        assert_eq!(reply.text, None);
        assert_eq!(reply.tool_calls.len(), 3);
        assert_eq!(reply.tool_calls[0].args, json!({ "amount": 500, "description": "lunch" }));
        assert_eq!(reply.tool_calls[1].args, Value::Null);
        assert_eq!(reply.tool_calls[2].args, Value::Null);
    }

    #[test]
    fn test_text_reply_and_empty_choices() {
        let response: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "All done." } }] })).unwrap();
        assert_eq!(into_reply(response), ModelReply::text("All done."));

        let empty: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(into_reply(empty), ModelReply::default());
    }
}
