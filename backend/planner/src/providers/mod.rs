pub mod mock;
pub mod ollama;
pub mod openrouter;

use std::sync::Arc;

use mock::ScriptedGateway;
use ollama::OllamaGateway;
use openrouter::OpenRouterGateway;

use anyhow::{bail, Result};
use serde_json::{json, Value};

use ledgerforge_core::{ConversationTurn, ModelGateway, Role, ToolSpec};

/// Provider selection and sampling knobs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// `openrouter`, `ollama` or `mock`.
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            provider: "mock".into(),
            model: "mock".into(),
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Build the gateway named by `settings.provider`.
pub fn build_gateway(settings: &GatewaySettings) -> Result<Arc<dyn ModelGateway>> {
    let gateway: Arc<dyn ModelGateway> = match settings.provider.as_str() {
        "openrouter" => {
            let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
                bail!("the openrouter provider needs model.apiKey (or OPENROUTER_API_KEY)");
            };
            let mut gateway = OpenRouterGateway::new(api_key, &settings.model)
                .with_sampling(settings.temperature, settings.max_tokens);
            if let Some(url) = &settings.base_url {
                gateway = gateway.with_base_url(url);
            }
            Arc::new(gateway)
        }
        "ollama" => {
            let mut gateway = OllamaGateway::new(&settings.model).with_sampling(settings.temperature, settings.max_tokens);
            if let Some(url) = &settings.base_url {
                gateway = gateway.with_base_url(url);
            }
            Arc::new(gateway)
        }
        "mock" => Arc::new(ScriptedGateway::default()),
        other => bail!("unknown model provider '{other}'"),
    };
    Ok(gateway)
}

/// Chat-completions role for a transcript turn.
pub(crate) fn chat_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
    }
}

/// `{role, content}` messages for OpenAI-style chat APIs. Turns without any
/// text part are skipped.
pub(crate) fn chat_messages(transcript: &[ConversationTurn]) -> Vec<Value> {
    transcript
        .iter()
        .filter_map(|turn| {
            let content = turn.text();
            if content.is_empty() {
                return None;
            }
            Some(json!({ "role": chat_role(turn.role), "content": content }))
        })
        .collect()
}

/// The catalog in the `tools: [{type: function, function: {...}}]` shape.
pub(crate) fn function_tools(catalog: &[ToolSpec]) -> Vec<Value> {
    catalog
        .iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.json_schema(),
                }
            })
        })
        .collect()
}

pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerforge_core::{ParamField, ParamSchema, TurnPart};

    #[test]
    fn test_messages_map_roles_and_skip_opaque_turns() {
        let transcript = vec![
            ConversationTurn::user_text("hello"),
            ConversationTurn::model_text("hi there"),
            ConversationTurn::new(
                Role::Model,
                vec![TurnPart::Opaque(json!({ "functionCall": { "name": "x" } }))],
            ),
        ];
        let messages = chat_messages(&transcript);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], json!({ "role": "user", "content": "hello" }));
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[test]
    fn test_function_tools_embed_schema() {
        let catalog = vec![ToolSpec::new("findClientByName", "Find a client")
            .param(ParamField::required("name", ParamSchema::string(), "Client name"))];
        let tools = function_tools(&catalog);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "findClientByName");
        assert_eq!(tools[0]["function"]["parameters"]["required"], json!(["name"]));
    }

    #[test]
    fn test_build_gateway_by_name() {
        assert_eq!(build_gateway(&GatewaySettings::default()).unwrap().name(), "mock");

        let ollama = GatewaySettings {
            provider: "ollama".into(),
            model: "llama3.1".into(),
            ..Default::default()
        };
        assert_eq!(build_gateway(&ollama).unwrap().name(), "ollama");

        let missing_key = GatewaySettings {
            provider: "openrouter".into(),
            ..Default::default()
        };
        assert!(build_gateway(&missing_key).is_err());

        let unknown = GatewaySettings {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        assert!(build_gateway(&unknown).is_err());
    }
}
