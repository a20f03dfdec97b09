//! Chat configuration and structured-output schema types.
//!
//! Schema trees are validated when they are built, so a malformed schema
//! fails before any request leaves the process.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::error::Error as StdError;
use std::fmt;

/// Errors raised while validating a structured-output schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A name listed in `required` has no matching property.
    MissingRequiredProperty { name: String },

    /// A `json_schema` response format was requested without a schema.
    MissingSchema,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MissingRequiredProperty { name } => {
                write!(f, "Required name {name:?} has no matching property")
            }
            SchemaError::MissingSchema => {
                write!(f, "Response format json_schema needs a schema")
            }
        }
    }
}

impl StdError for SchemaError {}

/// A JSON-schema node describing part of a structured response.
///
/// Object properties keep their insertion order through serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
    String {
        description: Option<String>,
    },
    Number {
        description: Option<String>,
    },
    Integer {
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    Array {
        items: Box<SchemaNode>,
    },
}

impl SchemaNode {
    pub fn object(properties: Vec<(&str, SchemaNode)>, required: Vec<&str>) -> Self {
        SchemaNode::Object {
            properties: properties
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
            required: required.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn string(description: &str) -> Self {
        SchemaNode::String {
            description: Some(description.to_string()),
        }
    }

    pub fn number(description: &str) -> Self {
        SchemaNode::Number {
            description: Some(description.to_string()),
        }
    }

    pub fn integer(description: &str) -> Self {
        SchemaNode::Integer {
            description: Some(description.to_string()),
        }
    }

    pub fn boolean(description: &str) -> Self {
        SchemaNode::Boolean {
            description: Some(description.to_string()),
        }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
        }
    }

    /// Checks the whole tree: every `required` name must name a property.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            SchemaNode::Object {
                properties,
                required,
            } => {
                for name in required {
                    if !properties.iter().any(|(key, _)| key == name) {
                        return Err(SchemaError::MissingRequiredProperty { name: name.clone() });
                    }
                }
                for (_, node) in properties {
                    node.validate()?;
                }
                Ok(())
            }
            SchemaNode::Array { items } => items.validate(),
            _ => Ok(()),
        }
    }
}

impl Serialize for SchemaNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SchemaNode::Object {
                properties,
                required,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "object")?;
                map.serialize_entry("properties", &ObjectProperties(properties))?;
                map.serialize_entry("required", required)?;
                map.end()
            }
            SchemaNode::String { description } => primitive(serializer, "string", description),
            SchemaNode::Number { description } => primitive(serializer, "number", description),
            SchemaNode::Integer { description } => primitive(serializer, "integer", description),
            SchemaNode::Boolean { description } => primitive(serializer, "boolean", description),
            SchemaNode::Array { items } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items.as_ref())?;
                map.end()
            }
        }
    }
}

fn primitive<S>(
    serializer: S,
    kind: &'static str,
    description: &Option<String>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("type", kind)?;
    if let Some(description) = description {
        map.serialize_entry("description", description)?;
    }
    map.end()
}

/// Serializes object properties as a JSON map in insertion order.
struct ObjectProperties<'a>(&'a [(String, SchemaNode)]);

impl Serialize for ObjectProperties<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, node) in self.0 {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

/// Named schema attached to a `json_schema` response format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchema {
    pub name: String,
    #[serde(rename = "schema")]
    pub node: SchemaNode,
}

impl JsonSchema {
    /// Builds a named schema, validating the tree up front.
    pub fn new(name: impl Into<String>, node: SchemaNode) -> Result<Self, SchemaError> {
        node.validate()?;
        Ok(Self {
            name: name.into(),
            node,
        })
    }
}

/// How the server should shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormatKind {
    Text,
    JsonObject,
    JsonSchema,
}

impl ResponseFormatKind {
    fn wire_name(self) -> &'static str {
        match self {
            ResponseFormatKind::Text => "text",
            ResponseFormatKind::JsonObject => "json_object",
            ResponseFormatKind::JsonSchema => "json_schema",
        }
    }
}

/// Response-format constraint sent with a request.
///
/// The schema only travels when the kind is [`ResponseFormatKind::JsonSchema`];
/// for the other kinds it is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub kind: ResponseFormatKind,
    pub json_schema: Option<JsonSchema>,
}

impl ResponseFormat {
    pub fn text() -> Self {
        Self {
            kind: ResponseFormatKind::Text,
            json_schema: None,
        }
    }

    pub fn json_object() -> Self {
        Self {
            kind: ResponseFormatKind::JsonObject,
            json_schema: None,
        }
    }

    pub fn json_schema(schema: JsonSchema) -> Self {
        Self {
            kind: ResponseFormatKind::JsonSchema,
            json_schema: Some(schema),
        }
    }
}

impl Serialize for ResponseFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let schema = match self.kind {
            ResponseFormatKind::JsonSchema => self.json_schema.as_ref(),
            _ => None,
        };
        let mut map = serializer.serialize_map(Some(if schema.is_some() { 2 } else { 1 }))?;
        map.serialize_entry("type", self.kind.wire_name())?;
        if let Some(schema) = schema {
            map.serialize_entry("json_schema", schema)?;
        }
        map.end()
    }
}

/// Optional knobs applied to a chat completion request.
///
/// Every field is independent; absent fields stay off the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub response_format: Option<ResponseFormat>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_completion_tokens: Option<u32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub stop: Option<Vec<String>>,
    pub seed: Option<i64>,
    pub user: Option<String>,
}
