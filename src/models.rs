use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A movie as it travels over the wire and through the store.
///
/// Only `id` is interpreted; every other member of the JSON object is kept
/// in `fields` and passed through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Movie {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Accepts any JSON value for `id`. Numbers keep their text, anything else
/// that is not a string becomes empty.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
