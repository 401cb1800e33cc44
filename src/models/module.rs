use serde::{Deserialize, Serialize};

/// A named page of the workspace.
///
/// The workspace keeps modules in an ordered list; a module's "order" is its
/// index in that list, not a field on the module itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub module_id: String,
    pub name: String,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}
