use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The authenticated caller on whose behalf every data operation runs.
///
/// Handlers receive this with each invocation and must scope all reads and
/// writes to it. It is never persisted by the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountContext {
    account_id: String,
}

impl AccountContext {
    /// Returns `None` for a blank identifier.
    pub fn new(account_id: impl Into<String>) -> Option<Self> {
        let account_id = account_id.into();
        if account_id.trim().is_empty() {
            None
        } else {
            Some(Self { account_id })
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl fmt::Display for AccountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.account_id)
    }
}

/// Structural type of a tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamSchema {
    String {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        enum_values: Vec<String>,
    },
    Number,
    Integer,
    Boolean,
    Array { items: Box<ParamSchema> },
    Object { fields: Vec<ParamField> },
}

impl ParamSchema {
    pub fn string() -> Self {
        ParamSchema::String { enum_values: Vec::new() }
    }

    pub fn one_of(values: &[&str]) -> Self {
        ParamSchema::String {
            enum_values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn array_of(items: ParamSchema) -> Self {
        ParamSchema::Array { items: Box::new(items) }
    }

    pub fn object(fields: Vec<ParamField>) -> Self {
        ParamSchema::Object { fields }
    }

    /// Render as a JSON-schema fragment (the dialect function-calling APIs accept).
    pub fn to_json_schema(&self) -> Value {
        match self {
            ParamSchema::String { enum_values } if enum_values.is_empty() => json!({ "type": "string" }),
            ParamSchema::String { enum_values } => json!({ "type": "string", "enum": enum_values }),
            ParamSchema::Number => json!({ "type": "number" }),
            ParamSchema::Integer => json!({ "type": "integer" }),
            ParamSchema::Boolean => json!({ "type": "boolean" }),
            ParamSchema::Array { items } => json!({ "type": "array", "items": items.to_json_schema() }),
            ParamSchema::Object { fields } => object_schema(fields),
        }
    }
}

fn object_schema(fields: &[ParamField]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = field.schema.to_json_schema();
        if let Value::Object(map) = &mut schema {
            map.insert("description".into(), Value::String(field.description.clone()));
        }
        properties.insert(field.name.clone(), schema);
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// A named parameter with its schema and the description shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamField {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub schema: ParamSchema,
}

impl ParamField {
    pub fn required(name: &str, schema: ParamSchema, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
            schema,
        }
    }

    pub fn optional(name: &str, schema: ParamSchema, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            schema,
        }
    }
}

/// One entry of the tool catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamField>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, field: ParamField) -> Self {
        self.parameters.push(field);
        self
    }

    /// JSON schema of the whole argument object.
    pub fn json_schema(&self) -> Value {
        object_schema(&self.parameters)
    }

    /// `{name, description, parameters}` as served by `GET /api/tools`.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.json_schema(),
        })
    }
}

/// Uniform envelope every tool handler returns.
///
/// Fields are private so the only way to build one is through [`ToolResult::ok`],
/// [`ToolResult::ok_with_message`] or [`ToolResult::failure`]; a result is
/// either a success (optional data and message) or a failure carrying an error.
/// It is only ever produced here and serialized outward, never decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
