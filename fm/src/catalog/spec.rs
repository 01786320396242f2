//! Operation signatures as exposed to the planner

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;
use crate::llm::ToolDefinition;

/// Semantic type of an operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Filesystem path (non-empty string)
    Path,
    /// File type tag such as `PDF` (letters and digits)
    FileType,
    /// Free text
    Text,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Path => "path",
            ParamType::FileType => "file_type",
            ParamType::Text => "text",
        }
    }

    /// Check a JSON value against this semantic type
    pub fn check(&self, value: &Value) -> Result<(), String> {
        let Some(s) = value.as_str() else {
            return Err(format!("expected a string, got {}", json_kind(value)));
        };
        match self {
            ParamType::Path if s.trim().is_empty() => Err("path must not be empty".to_string()),
            ParamType::FileType if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Err(format!("'{}' is not a file type tag", s))
            }
            _ => Ok(()),
        }
    }

    fn json_schema(&self, description: &str) -> Value {
        match self {
            ParamType::FileType => serde_json::json!({
                "type": "string",
                "pattern": "^[A-Za-z0-9]+$",
                "description": description,
            }),
            ParamType::Path | ParamType::Text => serde_json::json!({
                "type": "string",
                "description": description,
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Name, ordered parameters and description of a catalog operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub parameters: Vec<ParamSpec>,
    pub description: String,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            description: description.into(),
        }
    }

    /// Append a parameter (declaration order is preserved)
    pub fn param(mut self, name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            ty,
            description: description.into(),
        });
        self
    }

    /// Check that `arguments` supplies every declared parameter with the right type and nothing else
    pub fn check_arguments(&self, arguments: &Value) -> Result<(), ValidationError> {
        let Some(map) = arguments.as_object() else {
            return Err(ValidationError::bad(&self.name, "arguments must be a JSON object"));
        };

        for param in &self.parameters {
            match map.get(&param.name) {
                None => return Err(ValidationError::bad(&self.name, format!("missing '{}'", param.name))),
                Some(value) => param
                    .ty
                    .check(value)
                    .map_err(|reason| ValidationError::bad(&self.name, format!("'{}': {}", param.name, reason)))?,
            }
        }

        if let Some(extra) = map.keys().find(|k| !self.parameters.iter().any(|p| &p.name == *k)) {
            return Err(ValidationError::bad(&self.name, format!("unexpected argument '{}'", extra)));
        }

        Ok(())
    }

    /// JSON-schema tool definition for tool-calling providers
    pub fn to_tool_definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.ty.json_schema(&param.description));
        }
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();

        ToolDefinition::new(
            self.name.clone(),
            self.description.clone(),
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        )
    }
}
