use serde_json::{Map, Value};

use super::registry::wire;
use super::EventPayload;
use crate::engine::Workspace;
use crate::error::Result;
use crate::models::{Block, Coordinate};

/// Which element of a block a change event touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeElement {
    /// A named scalar field; `name` identifies which one.
    Field,
    /// The block's attached comment text.
    Comment,
    Collapsed,
    Disabled,
}

impl ChangeElement {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeElement::Field => "field",
            ChangeElement::Comment => "comment",
            ChangeElement::Collapsed => "collapsed",
            ChangeElement::Disabled => "disabled",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "field" => Some(ChangeElement::Field),
            "comment" => Some(ChangeElement::Comment),
            "collapsed" => Some(ChangeElement::Collapsed),
            "disabled" => Some(ChangeElement::Disabled),
            _ => None,
        }
    }
}

/// The delta carried by a geometric or containment block move.
///
/// Exactly one shape per event: a containment change is all-or-nothing and
/// must never run through the coordinate code path.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveDelta {
    Coordinate { old: Coordinate, new: Coordinate },
    Parent { old: Option<String>, new: Option<String> },
}

/// Events describing one state transition of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEvent {
    /// Snapshot of the block at creation; inverted, it deletes by id.
    Create { block_id: String, snapshot: Value },
    /// Snapshot taken before removal; inverted, it re-materializes.
    Delete { block_id: String, snapshot: Value },
    /// Single-element delta.
    Change {
        block_id: String,
        element: ChangeElement,
        name: Option<String>,
        old_value: Value,
        new_value: Value,
    },
    Move { block_id: String, delta: MoveDelta },
    /// Cross-container move: the block changes owning module.
    MoveToModule {
        block_id: String,
        new_module_id: String,
        previous_module_id: String,
    },
}

impl BlockEvent {
    /// Event for a just-created live block.
    pub fn create(block: &Block) -> Self {
        BlockEvent::Create {
            block_id: block.block_id.clone(),
            snapshot: block.snapshot(),
        }
    }

    /// Event for an about-to-be-deleted live block. The snapshot must be
    /// taken while the block is still in the store.
    pub fn delete(block: &Block) -> Self {
        BlockEvent::Delete {
            block_id: block.block_id.clone(),
            snapshot: block.snapshot(),
        }
    }

    /// Field change; the old value is captured from the live block.
    pub fn field_change(block: &Block, field: &str, new_value: &str) -> Self {
        let old = block.fields.get(field).cloned().unwrap_or_default();
        BlockEvent::Change {
            block_id: block.block_id.clone(),
            element: ChangeElement::Field,
            name: Some(field.to_string()),
            old_value: Value::String(old),
            new_value: Value::String(new_value.to_string()),
        }
    }

    /// Comment text change; `None` clears the comment.
    pub fn comment_change(block: &Block, new_text: Option<&str>) -> Self {
        BlockEvent::Change {
            block_id: block.block_id.clone(),
            element: ChangeElement::Comment,
            name: None,
            old_value: option_text(block.comment_text.as_deref()),
            new_value: option_text(new_text),
        }
    }

    pub fn collapsed_change(block: &Block, collapsed: bool) -> Self {
        BlockEvent::Change {
            block_id: block.block_id.clone(),
            element: ChangeElement::Collapsed,
            name: None,
            old_value: Value::Bool(block.collapsed),
            new_value: Value::Bool(collapsed),
        }
    }

    pub fn disabled_change(block: &Block, disabled: bool) -> Self {
        BlockEvent::Change {
            block_id: block.block_id.clone(),
            element: ChangeElement::Disabled,
            name: None,
            old_value: Value::Bool(block.disabled),
            new_value: Value::Bool(disabled),
        }
    }

    /// Cross-module move; the previous module is captured from the live
    /// block, so construct this before mutating the store.
    pub fn move_to_module(block: &Block, new_module_id: &str) -> Self {
        BlockEvent::MoveToModule {
            block_id: block.block_id.clone(),
            new_module_id: new_module_id.to_string(),
            previous_module_id: block.module_id.clone(),
        }
    }
}

fn option_text(text: Option<&str>) -> Value {
    match text {
        Some(t) => Value::String(t.to_string()),
        None => Value::Null,
    }
}

/// First half of a block move.
///
/// The old side of a move is only known when the drag begins, the new side
/// once it commits. Capturing the old side here and producing the runnable
/// [`BlockEvent::Move`] only in [`finalize`](Self::finalize) makes the
/// "run a half-recorded move" state unrepresentable.
#[derive(Debug)]
pub struct PendingBlockMove {
    block_id: String,
    old_coordinate: Coordinate,
    old_parent_id: Option<String>,
}

impl PendingBlockMove {
    /// Capture the old side from the live block before it moves.
    pub fn begin(block: &Block) -> Self {
        Self {
            block_id: block.block_id.clone(),
            old_coordinate: block.position,
            old_parent_id: block.parent_id.clone(),
        }
    }

    /// Capture the new side from the moved block. The delta shape is decided
    /// by what actually changed: a parent change wins over coordinates.
    pub fn finalize(self, block: &Block) -> BlockEvent {
        let delta = if self.old_parent_id != block.parent_id {
            MoveDelta::Parent {
                old: self.old_parent_id,
                new: block.parent_id.clone(),
            }
        } else {
            MoveDelta::Coordinate {
                old: self.old_coordinate,
                new: block.position,
            }
        };
        BlockEvent::Move {
            block_id: self.block_id,
            delta,
        }
    }
}

impl EventPayload for BlockEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            BlockEvent::Create { .. } => "create",
            BlockEvent::Delete { .. } => "delete",
            BlockEvent::Change { .. } => "change",
            BlockEvent::Move { .. } => "move",
            BlockEvent::MoveToModule { .. } => "move_block_to_module",
        }
    }

    fn is_null(&self) -> bool {
        match self {
            BlockEvent::Change {
                old_value,
                new_value,
                ..
            } => old_value == new_value,
            BlockEvent::Move { delta, .. } => match delta {
                MoveDelta::Coordinate { old, new } => old == new,
                MoveDelta::Parent { old, new } => old == new,
            },
            BlockEvent::MoveToModule {
                new_module_id,
                previous_module_id,
                ..
            } => new_module_id == previous_module_id,
            _ => false,
        }
    }

    fn write_json(&self, json: &mut Map<String, Value>) {
        match self {
            BlockEvent::Create { block_id, snapshot }
            | BlockEvent::Delete { block_id, snapshot } => {
                json.insert("blockId".to_string(), Value::String(block_id.clone()));
                json.insert("snapshot".to_string(), snapshot.clone());
            }
            BlockEvent::Change {
                block_id,
                element,
                name,
                old_value,
                new_value,
            } => {
                json.insert("blockId".to_string(), Value::String(block_id.clone()));
                json.insert(
                    "element".to_string(),
                    Value::String(element.as_str().to_string()),
                );
                if let Some(name) = name {
                    json.insert("name".to_string(), Value::String(name.clone()));
                }
                json.insert("oldValue".to_string(), old_value.clone());
                json.insert("newValue".to_string(), new_value.clone());
            }
            BlockEvent::Move { block_id, delta } => {
                json.insert("blockId".to_string(), Value::String(block_id.clone()));
                match delta {
                    MoveDelta::Coordinate { old, new } => {
                        json.insert("oldCoordinate".to_string(), Value::String(old.to_wire()));
                        json.insert("newCoordinate".to_string(), Value::String(new.to_wire()));
                    }
                    MoveDelta::Parent { old, new } => {
                        if let Some(old) = old {
                            json.insert("oldParentId".to_string(), Value::String(old.clone()));
                        }
                        if let Some(new) = new {
                            json.insert("newParentId".to_string(), Value::String(new.clone()));
                        }
                    }
                }
            }
            BlockEvent::MoveToModule {
                block_id,
                new_module_id,
                previous_module_id,
            } => {
                json.insert("blockId".to_string(), Value::String(block_id.clone()));
                json.insert(
                    "newModuleId".to_string(),
                    Value::String(new_module_id.clone()),
                );
                json.insert(
                    "previousModuleId".to_string(),
                    Value::String(previous_module_id.clone()),
                );
            }
        }
    }

    fn run(&self, workspace: &mut Workspace, forward: bool) {
        match self {
            BlockEvent::Create { block_id, snapshot } => {
                create_or_delete(workspace, block_id, snapshot, forward);
            }
            BlockEvent::Delete { block_id, snapshot } => {
                create_or_delete(workspace, block_id, snapshot, !forward);
            }
            BlockEvent::Change {
                block_id,
                element,
                name,
                old_value,
                new_value,
            } => {
                if workspace.block(block_id).is_none() {
                    log::warn!("can't change nonexistent block {}", block_id);
                    return;
                }
                let value = if forward { new_value } else { old_value };
                match element {
                    ChangeElement::Field => {
                        let (Some(name), Some(value)) = (name.as_deref(), value.as_str()) else {
                            log::warn!("malformed field change for block {}", block_id);
                            return;
                        };
                        workspace.set_block_field(block_id, name, value);
                    }
                    ChangeElement::Comment => {
                        workspace
                            .set_block_comment(block_id, value.as_str().map(str::to_string));
                    }
                    ChangeElement::Collapsed => {
                        workspace.set_block_collapsed(block_id, value.as_bool().unwrap_or(false));
                    }
                    ChangeElement::Disabled => {
                        workspace.set_block_disabled(block_id, value.as_bool().unwrap_or(false));
                    }
                }
            }
            BlockEvent::Move { block_id, delta } => {
                let applied = match delta {
                    MoveDelta::Coordinate { old, new } => {
                        workspace.move_block(block_id, if forward { *new } else { *old })
                    }
                    MoveDelta::Parent { old, new } => {
                        let target = if forward { new } else { old };
                        workspace.reparent_block(block_id, target.clone())
                    }
                };
                if !applied {
                    log::warn!("can't move nonexistent block {}", block_id);
                }
            }
            BlockEvent::MoveToModule {
                block_id,
                new_module_id,
                previous_module_id,
            } => {
                let target = if forward {
                    new_module_id
                } else {
                    previous_module_id
                };
                if !workspace.move_block_to_module(block_id, target) {
                    log::warn!(
                        "can't move block {} to module {}: block or module missing",
                        block_id,
                        target
                    );
                }
            }
        }
    }
}

/// Create and delete are structural mirror images; both directions of both
/// events funnel through this one helper.
fn create_or_delete(workspace: &mut Workspace, block_id: &str, snapshot: &Value, create: bool) {
    if create {
        if let Err(e) = workspace.create_block(snapshot) {
            log::warn!("can't materialize block {}: {}", block_id, e);
        }
    } else if !workspace.delete_block(block_id) {
        log::warn!("can't delete nonexistent block {}", block_id);
    }
}

pub(crate) fn decode(tag: &'static str, json: &Map<String, Value>) -> Result<BlockEvent> {
    let block_id = wire::req_str(json, tag, "blockId")?;
    match tag {
        "create" => Ok(BlockEvent::Create {
            block_id,
            snapshot: wire::req_value(json, tag, "snapshot")?,
        }),
        "delete" => Ok(BlockEvent::Delete {
            block_id,
            snapshot: wire::req_value(json, tag, "snapshot")?,
        }),
        "change" => {
            let element_text = wire::req_str(json, tag, "element")?;
            let element = ChangeElement::parse(&element_text).ok_or_else(|| {
                wire::invalid(tag, "element", format!("unknown element {:?}", element_text))
            })?;
            Ok(BlockEvent::Change {
                block_id,
                element,
                name: wire::opt_str(json, "name"),
                old_value: wire::req_value(json, tag, "oldValue")?,
                new_value: wire::req_value(json, tag, "newValue")?,
            })
        }
        "move" => {
            let delta = if json.contains_key("oldCoordinate") || json.contains_key("newCoordinate")
            {
                MoveDelta::Coordinate {
                    old: wire::req_coord(json, tag, "oldCoordinate")?,
                    new: wire::req_coord(json, tag, "newCoordinate")?,
                }
            } else {
                MoveDelta::Parent {
                    old: wire::opt_str(json, "oldParentId"),
                    new: wire::opt_str(json, "newParentId"),
                }
            };
            Ok(BlockEvent::Move { block_id, delta })
        }
        "move_block_to_module" => Ok(BlockEvent::MoveToModule {
            block_id,
            new_module_id: wire::req_str(json, tag, "newModuleId")?,
            previous_module_id: wire::req_str(json, tag, "previousModuleId")?,
        }),
        _ => unreachable!("block decoder registered for unknown tag {tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_block() -> Block {
        let mut block = Block::new("math_number", "m1");
        block.fields.insert("NUM".to_string(), "1".to_string());
        block.position = Coordinate::new(10, 20);
        block
    }

    #[test]
    fn test_field_change_captures_old_value() {
        let block = test_block();
        let event = BlockEvent::field_change(&block, "NUM", "2");
        match event {
            BlockEvent::Change {
                old_value,
                new_value,
                ..
            } => {
                assert_eq!(old_value, Value::String("1".to_string()));
                assert_eq!(new_value, Value::String("2".to_string()));
            }
            other => panic!("expected change event, got {:?}", other),
        }
    }

    #[test]
    fn test_change_is_null_when_values_equal() {
        let block = test_block();
        assert!(BlockEvent::field_change(&block, "NUM", "1").is_null());
        assert!(!BlockEvent::field_change(&block, "NUM", "2").is_null());
    }

    #[test]
    fn test_pending_move_picks_coordinate_delta() {
        let mut block = test_block();
        let pending = PendingBlockMove::begin(&block);
        block.position = Coordinate::new(30, 40);

        match pending.finalize(&block) {
            BlockEvent::Move {
                delta: MoveDelta::Coordinate { old, new },
                ..
            } => {
                assert_eq!(old, Coordinate::new(10, 20));
                assert_eq!(new, Coordinate::new(30, 40));
            }
            other => panic!("expected coordinate move, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_move_picks_parent_delta_over_coordinate() {
        let mut block = test_block();
        let pending = PendingBlockMove::begin(&block);
        // A reparent usually moves the block as well; containment wins.
        block.parent_id = Some("p1".to_string());
        block.position = Coordinate::new(99, 99);

        match pending.finalize(&block) {
            BlockEvent::Move {
                delta: MoveDelta::Parent { old, new },
                ..
            } => {
                assert_eq!(old, None);
                assert_eq!(new, Some("p1".to_string()));
            }
            other => panic!("expected parent move, got {:?}", other),
        }
    }

    #[test]
    fn test_unmoved_pending_move_is_null() {
        let block = test_block();
        let pending = PendingBlockMove::begin(&block);
        assert!(pending.finalize(&block).is_null());
    }

    #[test]
    fn test_move_to_module_is_null_when_same_module() {
        let block = test_block();
        assert!(BlockEvent::move_to_module(&block, "m1").is_null());
        assert!(!BlockEvent::move_to_module(&block, "m2").is_null());
    }
}
