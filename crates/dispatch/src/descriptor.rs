//! Static tool descriptors: name, description, and parameter contracts.
//!
//! Descriptors are pure data, built once at startup. The JSON Schema sent
//! to MCP clients on discovery is rendered from them, so the same
//! declaration drives both discovery and argument validation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Primitive parameter types a descriptor can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    /// Allowed values for string parameters (enum membership).
    pub one_of: Option<Vec<String>>,
    /// Inclusive bounds for integer parameters.
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ParamSpec {
    fn new(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: false,
            one_of: None,
            min: None,
            max: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Number, description)
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Boolean, description)
    }

    pub fn array(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Array, description)
    }

    pub fn object(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Object, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.one_of = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Immutable description of one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    /// Find a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render the JSON-Schema-shaped input contract for MCP discovery.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();

        for p in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(p.kind.as_str()));
            prop.insert("description".to_string(), json!(p.description));
            if let Some(values) = &p.one_of {
                prop.insert("enum".to_string(), json!(values));
            }
            if let Some(min) = p.min {
                prop.insert("minimum".to_string(), json!(min));
            }
            if let Some(max) = p.max {
                prop.insert("maximum".to_string(), json!(max));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
            if p.required {
                required.push(json!(p.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_shape() {
        let desc = ToolDescriptor::new(
            "create_author",
            "Create a new author.",
            vec![
                ParamSpec::string("name", "Author's full name").required(),
                ParamSpec::string("email", "Contact email").required(),
                ParamSpec::string("bio", "Short biography"),
            ],
        );

        let schema = desc.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&json!("name")));
        assert!(required.contains(&json!("email")));
    }

    #[test]
    fn test_enum_and_range_rendered() {
        let desc = ToolDescriptor::new(
            "log_writing_session",
            "Record a writing session.",
            vec![
                ParamSpec::string("status", "Book status")
                    .one_of(&["planned", "drafting", "editing", "published"]),
                ParamSpec::integer("focus_rating", "Focus level").range(1, 10),
            ],
        );

        let schema = desc.input_schema();
        let status = &schema["properties"]["status"];
        assert_eq!(status["enum"].as_array().unwrap().len(), 4);
        let rating = &schema["properties"]["focus_rating"];
        assert_eq!(rating["minimum"], 1);
        assert_eq!(rating["maximum"], 10);
    }

    #[test]
    fn test_param_lookup() {
        let desc = ToolDescriptor::new(
            "get_author",
            "Fetch an author by id.",
            vec![ParamSpec::integer("author_id", "Author id").required()],
        );
        assert!(desc.param("author_id").is_some());
        assert!(desc.param("nope").is_none());
    }
}
