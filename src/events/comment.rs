use serde_json::{Map, Value};

use super::registry::wire;
use super::EventPayload;
use crate::engine::Workspace;
use crate::error::Result;
use crate::models::{Comment, Coordinate};

/// Events describing one state transition of a workspace comment.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentEvent {
    Create {
        comment_id: String,
        snapshot: Value,
    },
    Delete {
        comment_id: String,
        snapshot: Value,
    },
    Change {
        comment_id: String,
        old_text: String,
        new_text: String,
    },
    Move {
        comment_id: String,
        old: Coordinate,
        new: Coordinate,
    },
}

impl CommentEvent {
    pub fn create(comment: &Comment) -> Self {
        CommentEvent::Create {
            comment_id: comment.comment_id.clone(),
            snapshot: comment.snapshot(),
        }
    }

    /// Snapshot must be taken while the comment is still in the store.
    pub fn delete(comment: &Comment) -> Self {
        CommentEvent::Delete {
            comment_id: comment.comment_id.clone(),
            snapshot: comment.snapshot(),
        }
    }

    /// Text change; the old text is captured from the live comment.
    pub fn text_change(comment: &Comment, new_text: &str) -> Self {
        CommentEvent::Change {
            comment_id: comment.comment_id.clone(),
            old_text: comment.text.clone(),
            new_text: new_text.to_string(),
        }
    }
}

/// First half of a comment move; see [`super::PendingBlockMove`] for why the
/// old side is captured separately from the new.
#[derive(Debug)]
pub struct PendingCommentMove {
    comment_id: String,
    old: Coordinate,
}

impl PendingCommentMove {
    pub fn begin(comment: &Comment) -> Self {
        Self {
            comment_id: comment.comment_id.clone(),
            old: comment.position,
        }
    }

    pub fn finalize(self, comment: &Comment) -> CommentEvent {
        CommentEvent::Move {
            comment_id: self.comment_id,
            old: self.old,
            new: comment.position,
        }
    }
}

impl EventPayload for CommentEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            CommentEvent::Create { .. } => "comment_create",
            CommentEvent::Delete { .. } => "comment_delete",
            CommentEvent::Change { .. } => "comment_change",
            CommentEvent::Move { .. } => "comment_move",
        }
    }

    fn is_null(&self) -> bool {
        match self {
            CommentEvent::Change {
                old_text, new_text, ..
            } => old_text == new_text,
            CommentEvent::Move { old, new, .. } => old == new,
            _ => false,
        }
    }

    fn write_json(&self, json: &mut Map<String, Value>) {
        match self {
            CommentEvent::Create {
                comment_id,
                snapshot,
            }
            | CommentEvent::Delete {
                comment_id,
                snapshot,
            } => {
                json.insert("commentId".to_string(), Value::String(comment_id.clone()));
                json.insert("snapshot".to_string(), snapshot.clone());
            }
            CommentEvent::Change {
                comment_id,
                old_text,
                new_text,
            } => {
                json.insert("commentId".to_string(), Value::String(comment_id.clone()));
                json.insert("oldText".to_string(), Value::String(old_text.clone()));
                json.insert("newText".to_string(), Value::String(new_text.clone()));
            }
            CommentEvent::Move {
                comment_id,
                old,
                new,
            } => {
                json.insert("commentId".to_string(), Value::String(comment_id.clone()));
                json.insert("oldCoordinate".to_string(), Value::String(old.to_wire()));
                json.insert("newCoordinate".to_string(), Value::String(new.to_wire()));
            }
        }
    }

    fn run(&self, workspace: &mut Workspace, forward: bool) {
        match self {
            CommentEvent::Create {
                comment_id,
                snapshot,
            } => create_or_delete(workspace, comment_id, snapshot, forward),
            CommentEvent::Delete {
                comment_id,
                snapshot,
            } => create_or_delete(workspace, comment_id, snapshot, !forward),
            CommentEvent::Change {
                comment_id,
                old_text,
                new_text,
            } => {
                let text = if forward { new_text } else { old_text };
                if !workspace.set_comment_text(comment_id, text.clone()) {
                    log::warn!("can't change nonexistent comment {}", comment_id);
                }
            }
            CommentEvent::Move {
                comment_id,
                old,
                new,
            } => {
                let position = if forward { *new } else { *old };
                if !workspace.move_comment(comment_id, position) {
                    log::warn!("can't move nonexistent comment {}", comment_id);
                }
            }
        }
    }
}

fn create_or_delete(workspace: &mut Workspace, comment_id: &str, snapshot: &Value, create: bool) {
    if create {
        if let Err(e) = workspace.create_comment(snapshot) {
            log::warn!("can't materialize comment {}: {}", comment_id, e);
        }
    } else if !workspace.delete_comment(comment_id) {
        log::warn!("can't delete nonexistent comment {}", comment_id);
    }
}

pub(crate) fn decode(tag: &'static str, json: &Map<String, Value>) -> Result<CommentEvent> {
    let comment_id = wire::req_str(json, tag, "commentId")?;
    match tag {
        "comment_create" => Ok(CommentEvent::Create {
            comment_id,
            snapshot: wire::req_value(json, tag, "snapshot")?,
        }),
        "comment_delete" => Ok(CommentEvent::Delete {
            comment_id,
            snapshot: wire::req_value(json, tag, "snapshot")?,
        }),
        "comment_change" => Ok(CommentEvent::Change {
            comment_id,
            old_text: wire::req_str(json, tag, "oldText")?,
            new_text: wire::req_str(json, tag, "newText")?,
        }),
        "comment_move" => Ok(CommentEvent::Move {
            comment_id,
            old: wire::req_coord(json, tag, "oldCoordinate")?,
            new: wire::req_coord(json, tag, "newCoordinate")?,
        }),
        _ => unreachable!("comment decoder registered for unknown tag {tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_change_captures_old() {
        let comment = Comment::new("m1", "before");
        let event = CommentEvent::text_change(&comment, "after");
        match event {
            CommentEvent::Change {
                old_text, new_text, ..
            } => {
                assert_eq!(old_text, "before");
                assert_eq!(new_text, "after");
            }
            other => panic!("expected change event, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_move_finalize() {
        let mut comment = Comment::new("m1", "note");
        comment.position = Coordinate::new(1, 2);
        let pending = PendingCommentMove::begin(&comment);
        comment.position = Coordinate::new(3, 4);

        let event = pending.finalize(&comment);
        assert!(!event.is_null());
        match event {
            CommentEvent::Move { old, new, .. } => {
                assert_eq!(old, Coordinate::new(1, 2));
                assert_eq!(new, Coordinate::new(3, 4));
            }
            other => panic!("expected move event, got {:?}", other),
        }
    }
}
