use serde_json::{Map, Value};

use super::registry::wire;
use super::EventPayload;
use crate::engine::Workspace;
use crate::error::Result;
use crate::models::Module;

/// Events describing one state transition of a module (workspace page).
///
/// A module's snapshot is just its name and sequence position; the blocks
/// and comments living on the page carry their own events.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleEvent {
    Create {
        module_id: String,
        name: String,
        order: usize,
    },
    Delete {
        module_id: String,
        name: String,
        order: usize,
    },
    Rename {
        module_id: String,
        old_name: String,
        new_name: String,
    },
    Move {
        module_id: String,
        new_order: usize,
        previous_order: usize,
    },
    Activate {
        module_id: String,
        previous_active_id: Option<String>,
    },
}

impl ModuleEvent {
    pub fn create(module: &Module, order: usize) -> Self {
        ModuleEvent::Create {
            module_id: module.module_id.clone(),
            name: module.name.clone(),
            order,
        }
    }

    pub fn delete(module: &Module, order: usize) -> Self {
        ModuleEvent::Delete {
            module_id: module.module_id.clone(),
            name: module.name.clone(),
            order,
        }
    }

    /// Rename; the old name is captured from the live module.
    pub fn rename(module: &Module, new_name: &str) -> Self {
        ModuleEvent::Rename {
            module_id: module.module_id.clone(),
            old_name: module.name.clone(),
            new_name: new_name.to_string(),
        }
    }

    pub fn moved(module: &Module, new_order: usize, previous_order: usize) -> Self {
        ModuleEvent::Move {
            module_id: module.module_id.clone(),
            new_order,
            previous_order,
        }
    }

    pub fn activate(module: &Module, previous_active_id: Option<&str>) -> Self {
        ModuleEvent::Activate {
            module_id: module.module_id.clone(),
            previous_active_id: previous_active_id.map(str::to_string),
        }
    }
}

impl EventPayload for ModuleEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            ModuleEvent::Create { .. } => "module_create",
            ModuleEvent::Delete { .. } => "module_delete",
            ModuleEvent::Rename { .. } => "module_rename",
            ModuleEvent::Move { .. } => "module_move",
            ModuleEvent::Activate { .. } => "module_activate",
        }
    }

    fn is_null(&self) -> bool {
        match self {
            ModuleEvent::Rename {
                old_name, new_name, ..
            } => old_name == new_name,
            ModuleEvent::Move {
                new_order,
                previous_order,
                ..
            } => new_order == previous_order,
            ModuleEvent::Activate {
                module_id,
                previous_active_id,
            } => previous_active_id.as_deref() == Some(module_id.as_str()),
            _ => false,
        }
    }

    fn write_json(&self, json: &mut Map<String, Value>) {
        match self {
            ModuleEvent::Create {
                module_id,
                name,
                order,
            }
            | ModuleEvent::Delete {
                module_id,
                name,
                order,
            } => {
                json.insert("moduleId".to_string(), Value::String(module_id.clone()));
                json.insert("name".to_string(), Value::String(name.clone()));
                json.insert("order".to_string(), Value::from(*order as u64));
            }
            ModuleEvent::Rename {
                module_id,
                old_name,
                new_name,
            } => {
                json.insert("moduleId".to_string(), Value::String(module_id.clone()));
                json.insert("oldName".to_string(), Value::String(old_name.clone()));
                json.insert("newName".to_string(), Value::String(new_name.clone()));
            }
            ModuleEvent::Move {
                module_id,
                new_order,
                previous_order,
            } => {
                json.insert("moduleId".to_string(), Value::String(module_id.clone()));
                json.insert("newOrder".to_string(), Value::from(*new_order as u64));
                json.insert(
                    "previousOrder".to_string(),
                    Value::from(*previous_order as u64),
                );
            }
            ModuleEvent::Activate {
                module_id,
                previous_active_id,
            } => {
                json.insert("moduleId".to_string(), Value::String(module_id.clone()));
                if let Some(previous) = previous_active_id {
                    json.insert(
                        "previousActiveId".to_string(),
                        Value::String(previous.clone()),
                    );
                }
            }
        }
    }

    fn run(&self, workspace: &mut Workspace, forward: bool) {
        match self {
            ModuleEvent::Create {
                module_id,
                name,
                order,
            } => create_or_delete(workspace, module_id, name, *order, forward),
            ModuleEvent::Delete {
                module_id,
                name,
                order,
            } => create_or_delete(workspace, module_id, name, *order, !forward),
            ModuleEvent::Rename {
                module_id,
                old_name,
                new_name,
            } => {
                let name = if forward { new_name } else { old_name };
                if !workspace.rename_module(module_id, name) {
                    log::warn!("can't rename nonexistent module {}", module_id);
                }
            }
            ModuleEvent::Move {
                module_id,
                new_order,
                previous_order,
            } => {
                let order = if forward { *new_order } else { *previous_order };
                if !workspace.move_module(module_id, order) {
                    log::warn!("can't move nonexistent module {}", module_id);
                }
            }
            ModuleEvent::Activate {
                module_id,
                previous_active_id,
            } => {
                if forward {
                    if !workspace.activate_module(Some(module_id)) {
                        log::warn!("can't activate nonexistent module {}", module_id);
                    }
                } else if let Some(previous) = previous_active_id {
                    if !workspace.activate_module(Some(previous)) {
                        log::warn!("can't activate nonexistent module {}", previous);
                    }
                }
            }
        }
    }
}

fn create_or_delete(
    workspace: &mut Workspace,
    module_id: &str,
    name: &str,
    order: usize,
    create: bool,
) {
    if create {
        workspace.create_module(module_id, name, order);
    } else if !workspace.delete_module(module_id) {
        log::warn!("can't delete nonexistent module {}", module_id);
    }
}

pub(crate) fn decode(tag: &'static str, json: &Map<String, Value>) -> Result<ModuleEvent> {
    let module_id = wire::req_str(json, tag, "moduleId")?;
    match tag {
        "module_create" => Ok(ModuleEvent::Create {
            module_id,
            name: wire::req_str(json, tag, "name")?,
            order: wire::req_index(json, tag, "order")?,
        }),
        "module_delete" => Ok(ModuleEvent::Delete {
            module_id,
            name: wire::req_str(json, tag, "name")?,
            order: wire::req_index(json, tag, "order")?,
        }),
        "module_rename" => Ok(ModuleEvent::Rename {
            module_id,
            old_name: wire::req_str(json, tag, "oldName")?,
            new_name: wire::req_str(json, tag, "newName")?,
        }),
        "module_move" => Ok(ModuleEvent::Move {
            module_id,
            new_order: wire::req_index(json, tag, "newOrder")?,
            previous_order: wire::req_index(json, tag, "previousOrder")?,
        }),
        "module_activate" => Ok(ModuleEvent::Activate {
            module_id,
            previous_active_id: wire::opt_str(json, "previousActiveId"),
        }),
        _ => unreachable!("module decoder registered for unknown tag {tag}"),
    }
}
