use serde_json::{Map, Value};

use super::registry::wire;
use super::EventPayload;
use crate::engine::Workspace;
use crate::error::Result;
use crate::models::Variable;

/// Events describing one state transition of a workspace variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableEvent {
    Create {
        variable_id: String,
        name: String,
        variable_type: String,
    },
    Delete {
        variable_id: String,
        name: String,
        variable_type: String,
    },
    Rename {
        variable_id: String,
        old_name: String,
        new_name: String,
    },
}

impl VariableEvent {
    pub fn create(variable: &Variable) -> Self {
        VariableEvent::Create {
            variable_id: variable.variable_id.clone(),
            name: variable.name.clone(),
            variable_type: variable.variable_type.clone(),
        }
    }

    pub fn delete(variable: &Variable) -> Self {
        VariableEvent::Delete {
            variable_id: variable.variable_id.clone(),
            name: variable.name.clone(),
            variable_type: variable.variable_type.clone(),
        }
    }

    /// Rename; the old name is captured from the live variable, so construct
    /// this before mutating the store.
    pub fn rename(variable: &Variable, new_name: &str) -> Self {
        VariableEvent::Rename {
            variable_id: variable.variable_id.clone(),
            old_name: variable.name.clone(),
            new_name: new_name.to_string(),
        }
    }
}

impl EventPayload for VariableEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            VariableEvent::Create { .. } => "var_create",
            VariableEvent::Delete { .. } => "var_delete",
            VariableEvent::Rename { .. } => "var_rename",
        }
    }

    fn is_null(&self) -> bool {
        match self {
            VariableEvent::Rename {
                old_name, new_name, ..
            } => old_name == new_name,
            _ => false,
        }
    }

    fn write_json(&self, json: &mut Map<String, Value>) {
        match self {
            VariableEvent::Create {
                variable_id,
                name,
                variable_type,
            }
            | VariableEvent::Delete {
                variable_id,
                name,
                variable_type,
            } => {
                json.insert("varId".to_string(), Value::String(variable_id.clone()));
                json.insert("varName".to_string(), Value::String(name.clone()));
                json.insert("varType".to_string(), Value::String(variable_type.clone()));
            }
            VariableEvent::Rename {
                variable_id,
                old_name,
                new_name,
            } => {
                json.insert("varId".to_string(), Value::String(variable_id.clone()));
                json.insert("oldName".to_string(), Value::String(old_name.clone()));
                json.insert("newName".to_string(), Value::String(new_name.clone()));
            }
        }
    }

    fn run(&self, workspace: &mut Workspace, forward: bool) {
        match self {
            VariableEvent::Create {
                variable_id,
                name,
                variable_type,
            } => create_or_delete(workspace, variable_id, name, variable_type, forward),
            VariableEvent::Delete {
                variable_id,
                name,
                variable_type,
            } => create_or_delete(workspace, variable_id, name, variable_type, !forward),
            VariableEvent::Rename {
                variable_id,
                old_name,
                new_name,
            } => {
                // Replay applies the recorded delta directly; the merge logic
                // in Workspace::rename_variable already ran when the events
                // were recorded.
                let name = if forward { new_name } else { old_name };
                if !workspace.set_variable_name(variable_id, name) {
                    log::warn!("can't rename nonexistent variable {}", variable_id);
                }
            }
        }
    }
}

fn create_or_delete(
    workspace: &mut Workspace,
    variable_id: &str,
    name: &str,
    variable_type: &str,
    create: bool,
) {
    if create {
        workspace.create_variable(variable_id, name, variable_type);
    } else if !workspace.delete_variable(variable_id) {
        log::warn!("can't delete nonexistent variable {}", variable_id);
    }
}

pub(crate) fn decode(tag: &'static str, json: &Map<String, Value>) -> Result<VariableEvent> {
    let variable_id = wire::req_str(json, tag, "varId")?;
    match tag {
        "var_create" => Ok(VariableEvent::Create {
            variable_id,
            name: wire::req_str(json, tag, "varName")?,
            variable_type: wire::req_str(json, tag, "varType")?,
        }),
        "var_delete" => Ok(VariableEvent::Delete {
            variable_id,
            name: wire::req_str(json, tag, "varName")?,
            variable_type: wire::req_str(json, tag, "varType")?,
        }),
        "var_rename" => Ok(VariableEvent::Rename {
            variable_id,
            old_name: wire::req_str(json, tag, "oldName")?,
            new_name: wire::req_str(json, tag, "newName")?,
        }),
        _ => unreachable!("variable decoder registered for unknown tag {tag}"),
    }
}
