//! The mutation-event core: every structural change to the document is
//! captured as a small, serializable, invertible event, grouped into
//! transactions and replayable in either direction.

pub mod block;
pub mod comment;
pub mod context;
pub mod module;
pub mod registry;
pub mod variable;

pub use block::{BlockEvent, ChangeElement, MoveDelta, PendingBlockMove};
pub use comment::{CommentEvent, PendingCommentMove};
pub use context::{EventContext, GroupGuard, RecordingGuard, RemoteGuard};
pub use module::ModuleEvent;
pub use registry::EventRegistry;
pub use variable::VariableEvent;

use serde_json::{Map, Value};
use std::fmt;

use crate::engine::Workspace;

/// One state transition of one entity, expressed as the delta needed to
/// replay it forward or invert it on undo.
///
/// Concrete payloads are closed sum types per entity family; the undo/redo
/// machinery only ever sees this trait. New entity kinds plug in by
/// implementing it and registering a decoder with [`EventRegistry`].
pub trait EventPayload: fmt::Debug {
    /// Wire tag identifying this event kind.
    fn type_tag(&self) -> &'static str;

    /// True when the event records no actual change of state. Null events
    /// are refused by the undo stack.
    fn is_null(&self) -> bool {
        false
    }

    /// Append the payload's delta fields to the wire object.
    fn write_json(&self, json: &mut Map<String, Value>);

    /// Apply (forward) or invert (backward) this event against the store.
    ///
    /// Never fails: a missing target is logged and skipped, since the entity
    /// may have been removed by a later, already-applied event.
    fn run(&self, workspace: &mut Workspace, forward: bool);
}

/// An immutable record of one mutation, stamped with the transaction state
/// that was ambient when it was constructed.
pub struct Event {
    /// The document this event belongs to.
    pub workspace_id: String,
    /// Id of the transaction this event is part of, empty if ungrouped.
    pub group: String,
    /// Whether this event should land on the undo stack. False for events
    /// replayed from a remote peer or constructed while recording is paused.
    pub record_undo: bool,
    payload: Box<dyn EventPayload>,
}

impl Event {
    /// Wrap a freshly constructed payload, stamping group and recordability
    /// from the session context.
    pub fn new(
        ctx: &EventContext,
        workspace_id: impl Into<String>,
        payload: impl EventPayload + 'static,
    ) -> Self {
        Self::from_boxed(ctx, workspace_id.into(), Box::new(payload))
    }

    pub(crate) fn from_boxed(
        ctx: &EventContext,
        workspace_id: String,
        payload: Box<dyn EventPayload>,
    ) -> Self {
        // Remote-origin events are never undoable locally and never join a
        // local transaction.
        let remote = ctx.applying_remote();
        Self {
            workspace_id,
            group: if remote { String::new() } else { ctx.group() },
            record_undo: ctx.recording() && !remote,
            payload,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.payload.type_tag()
    }

    pub fn is_null(&self) -> bool {
        self.payload.is_null()
    }

    pub fn payload(&self) -> &dyn EventPayload {
        self.payload.as_ref()
    }

    /// Encode as the flat wire object `{"type": tag, ...delta fields}`.
    /// Exact inverse of [`EventRegistry::decode`].
    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert(
            "type".to_string(),
            Value::String(self.payload.type_tag().to_string()),
        );
        self.payload.write_json(&mut json);
        Value::Object(json)
    }

    /// Replay the event against the store, forward or inverted.
    pub fn run(&self, workspace: &mut Workspace, forward: bool) {
        self.payload.run(workspace, forward);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("workspace_id", &self.workspace_id)
            .field("group", &self.group)
            .field("record_undo", &self.record_undo)
            .field("payload", &self.payload)
            .finish()
    }
}
