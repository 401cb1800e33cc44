use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Free-floating workspace comment, anchored to a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub module_id: String,

    #[serde(default)]
    pub position: Coordinate,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub width: i64,

    #[serde(default)]
    pub height: i64,
}

impl Comment {
    pub fn new(module_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            comment_id: uuid::Uuid::new_v4().to_string(),
            module_id: module_id.into(),
            position: Coordinate::default(),
            text: text.into(),
            width: 0,
            height: 0,
        }
    }

    /// Full serialized snapshot, as carried by create/delete events.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
