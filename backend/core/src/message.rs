use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One part of a turn. A bare `{"text": ...}` object is understood; anything
/// else the client sends back, including text carrying extra keys, is kept
/// verbatim as `Opaque`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnPart {
    Text { text: String },
    Opaque(Value),
}

impl TurnPart {
    /// Text carried by this part, whether plain or inside an opaque object.
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnPart::Text { text } => Some(text),
            TurnPart::Opaque(value) => value.get("text").and_then(Value::as_str),
        }
    }
}

impl<'de> Deserialize<'de> for TurnPart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(Value::String(text)) = map.get("text") {
                    return Ok(TurnPart::Text { text: text.clone() });
                }
            }
        }
        Ok(TurnPart::Opaque(value))
    }
}

/// A single entry of the conversation transcript.
///
/// Turn-level fields other than `role` and `parts` survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub parts: Vec<TurnPart>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationTurn {
    pub fn new(role: Role, parts: Vec<TurnPart>) -> Self {
        Self {
            role,
            parts,
            extra: Map::new(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![TurnPart::Text { text: text.into() }])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![TurnPart::Text { text: text.into() }])
    }

    /// Concatenated text parts, separated by blank lines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(TurnPart::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Ordered, append-only conversation history.
///
/// Appending consumes the transcript and hands back the extended one, so each
/// orchestration step owns a distinct value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<ConversationTurn>);

impl Transcript {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self(turns)
    }

    #[must_use]
    pub fn append(mut self, turn: ConversationTurn) -> Self {
        self.0.push(turn);
        self
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.0
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// What the model gateway returned for one transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Reply text with blank strings treated as absent.
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_roundtrips_client_shape() {
        let raw = json!({ "role": "model", "parts": [{ "text": "hi" }, { "inlineData": { "mime": "x" } }] });
        let turn: ConversationTurn = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(turn.role, Role::Model);
        assert_eq!(turn.text(), "hi");
        assert!(matches!(turn.parts[1], TurnPart::Opaque(_)));
        assert_eq!(serde_json::to_value(&turn).unwrap(), raw);
    }

    #[test]
    fn turn_keeps_unknown_keys_on_parts_and_turns() {
        let raw = json!({
            "role": "model",
            "parts": [{ "text": "hi", "thoughtSignature": "sig-abc" }],
            "metadata": { "id": 7 }
        });
        let turn: ConversationTurn = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(turn.parts[0], TurnPart::Opaque(_)));
        assert_eq!(turn.text(), "hi");
        assert_eq!(turn.extra["metadata"], json!({ "id": 7 }));
        assert_eq!(serde_json::to_value(&turn).unwrap(), raw);
    }

    #[test]
    fn plain_text_part_decodes_as_text() {
        let turn: ConversationTurn = serde_json::from_value(json!({ "role": "user", "parts": [{ "text": "a" }] })).unwrap();
        assert_eq!(turn, ConversationTurn::user_text("a"));
    }

    #[test]
    fn transcript_append_extends() {
        let t = Transcript::default()
            .append(ConversationTurn::user_text("a"))
            .append(ConversationTurn::model_text("b"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.turns()[1].role, Role::Model);
    }

    #[test]
    fn blank_reply_text_is_absent() {
        assert_eq!(ModelReply::text("   ").non_empty_text(), None);
        assert_eq!(ModelReply::text(" ok ").non_empty_text(), Some("ok"));
    }
}
