use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// A stored blog post, serialized exactly as it appears in the posts file
/// and in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub content: String,
    /// Media references, kept verbatim.
    #[serde(default)]
    pub media: Vec<Value>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for create and update. Every field may be absent and may
/// hold any JSON value; only truthy text fields take effect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    pub title: Option<Value>,
    pub author: Option<Value>,
    pub content: Option<Value>,
    pub media: Option<Value>,
}

impl PostInput {
    pub fn title(&self) -> Option<String> {
        truthy_text(&self.title)
    }

    pub fn author(&self) -> Option<String> {
        truthy_text(&self.author)
    }

    pub fn content(&self) -> Option<String> {
        truthy_text(&self.content)
    }

    /// The media list, only when the input actually is an array.
    pub fn media(&self) -> Option<&Vec<Value>> {
        match &self.media {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

/// `null`, `false`, `0` and `""` are falsy; arrays and objects are truthy
/// even when empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthy strings are taken as-is; any other truthy value is stored as its
/// compact JSON text.
fn truthy_text(field: &Option<Value>) -> Option<String> {
    match field {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(value) if is_truthy(value) => Some(value.to_string()),
        _ => None,
    }
}
