use serde::{Deserialize, Serialize};

/// A workspace variable. Names are unique per type; blocks reference
/// variables by id through their field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub variable_id: String,
    pub name: String,

    #[serde(default)]
    pub variable_type: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, variable_type: impl Into<String>) -> Self {
        Self {
            variable_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            variable_type: variable_type.into(),
        }
    }
}
