//! Message envelopes.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SessionError};

/// JSON mapping used for parent headers, content, and extension fields.
pub type JsonMap = Map<String, Value>;

/// Message header.
///
/// The four protocol fields are typed; anything else a sender merged in is
/// kept in [`Header::extra`] and written back at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub msg_id: String,
    pub msg_type: String,
    pub username: String,
    pub session: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Header {
    /// Extension field by name.
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Header as a flat JSON mapping.
    pub fn to_map(&self) -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("msg_id".to_string(), Value::String(self.msg_id.clone()));
        map.insert("msg_type".to_string(), Value::String(self.msg_type.clone()));
        map.insert("username".to_string(), Value::String(self.username.clone()));
        map.insert("session".to_string(), Value::String(self.session.clone()));
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// Parse a flat JSON mapping.
    pub fn from_map(map: JsonMap) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|err| SessionError::MalformedMessage(format!("header: {err}")))
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Structured content, run through the codec.
    Mapping(JsonMap),
    /// Bytes already encoded elsewhere, sent unchanged.
    Encoded(Bytes),
}

impl Content {
    /// Empty mapping.
    pub fn empty() -> Self {
        Content::Mapping(JsonMap::new())
    }

    pub fn as_mapping(&self) -> Option<&JsonMap> {
        match self {
            Content::Mapping(map) => Some(map),
            Content::Encoded(_) => None,
        }
    }

    pub fn as_encoded(&self) -> Option<&Bytes> {
        match self {
            Content::Encoded(bytes) => Some(bytes),
            Content::Mapping(_) => None,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::empty()
    }
}

impl From<JsonMap> for Content {
    fn from(map: JsonMap) -> Self {
        Content::Mapping(map)
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Encoded(bytes)
    }
}

/// Null becomes the empty mapping; anything other than a mapping is
/// rejected with [`SessionError::InvalidContent`].
impl TryFrom<Value> for Content {
    type Error = SessionError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Content::empty()),
            Value::Object(map) => Ok(Content::Mapping(map)),
            other => Err(SessionError::InvalidContent(json_kind(&other).to_string())),
        }
    }
}

/// One message: header, parent header, type, content, and buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    /// Empty for top-level messages, otherwise a copy of the parent's header.
    pub parent_header: JsonMap,
    pub msg_type: String,
    pub content: Content,
    pub buffers: Vec<Bytes>,
}

impl Message {
    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    /// Parent's message id, if this message has a parent.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_header.get("msg_id").and_then(Value::as_str)
    }

    /// Diagnostic JSON view.
    ///
    /// Pre-encoded content is shown as its size, buffers as their sizes.
    pub fn to_value(&self) -> Value {
        let content = match &self.content {
            Content::Mapping(map) => Value::Object(map.clone()),
            Content::Encoded(bytes) => Value::String(format!("<{} encoded bytes>", bytes.len())),
        };
        let buffers = self.buffers.iter().map(|b| Value::from(b.len())).collect();

        let mut map = JsonMap::new();
        map.insert("header".to_string(), Value::Object(self.header.to_map()));
        map.insert(
            "parent_header".to_string(),
            Value::Object(self.parent_header.clone()),
        );
        map.insert("msg_type".to_string(), Value::String(self.msg_type.clone()));
        map.insert("content".to_string(), content);
        map.insert("buffers".to_string(), Value::Array(buffers));
        Value::Object(map)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(&self.to_value()).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// Header of a message or bare header.
///
/// - a message (has a `header` mapping) yields that header
/// - a bare header (has `msg_id`) yields itself
/// - an empty value (null, `false`, zero, `""`, `[]`, `{}`) yields an empty
///   mapping
///
/// Anything else fails with [`SessionError::MissingHeader`].
pub fn extract_header(msg_or_header: &Value) -> Result<JsonMap> {
    if is_empty_value(msg_or_header) {
        return Ok(JsonMap::new());
    }
    match msg_or_header {
        Value::Object(map) => {
            if let Some(header) = map.get("header") {
                return match header {
                    Value::Object(header) => Ok(header.clone()),
                    other => Err(SessionError::MissingHeader(format!(
                        "message whose header is {}",
                        json_kind(other)
                    ))),
                };
            }
            if map.contains_key("msg_id") {
                return Ok(map.clone());
            }
            Err(SessionError::MissingHeader(
                "mapping without 'header' or 'msg_id'".to_string(),
            ))
        }
        other => Err(SessionError::MissingHeader(json_kind(other).to_string())),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
