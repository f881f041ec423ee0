use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use ledgerforge_core::{ConversationTurn, ModelGateway, ModelReply, ToolInvocation, ToolSpec};

use super::{chat_messages, function_tools, non_blank};

/// Ollama local models through `/api/chat` with tool support.
pub struct OllamaGateway {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaGateway {
    pub fn new(model: impl AsRef<str>) -> Self {
        // Strip any provider prefix like "openai/"
        let model = model.as_ref();
        let model = model.rsplit('/').next().unwrap_or(model).to_string();
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
            model,
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
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama sends arguments as an object, not an encoded string.
#[derive(Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn into_reply(message: OllamaMessage) -> ModelReply {
    ModelReply {
        text: non_blank(message.content),
        tool_calls: message
            .tool_calls
            .into_iter()
            .map(|call| ToolInvocation::new(call.function.name, call.function.arguments))
            .collect(),
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, transcript: &[ConversationTurn], catalog: &[ToolSpec]) -> Result<ModelReply> {
        let start = Instant::now();

        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: chat_messages(transcript),
            tools: function_tools(catalog),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(model = %self.model, messages = body.messages.len(), "Sending request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Ollama HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {}: {}", status, error_body);
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        let tokens_used = chat_response.eval_count.unwrap_or(0) + chat_response.prompt_eval_count.unwrap_or(0);
        debug!(
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Ollama responded"
        );

        Ok(into_reply(chat_response.message))
    }
}
