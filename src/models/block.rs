use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Coordinate;

/// Block is the basic content unit of the canvas.
///
/// A block lives on exactly one module (page), may be nested inside a parent
/// block, and carries named scalar field values. A field value may be a
/// variable id when the field references a workspace variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_id: String,
    pub block_type: String,
    pub module_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub position: Coordinate,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,

    #[serde(default)]
    pub collapsed: bool,

    #[serde(default)]
    pub disabled: bool,
}

impl Block {
    pub fn new(block_type: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            block_id: uuid::Uuid::new_v4().to_string(),
            block_type: block_type.into(),
            module_id: module_id.into(),
            parent_id: None,
            position: Coordinate::default(),
            fields: BTreeMap::new(),
            comment_text: None,
            collapsed: false,
            disabled: false,
        }
    }

    /// Full serialized snapshot, as carried by create/delete events.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
