use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{block, comment, module, variable, Event, EventContext, EventPayload};
use crate::error::{Error, Result};

/// Decoder for one wire tag: turns the flat wire object into a payload.
pub type DecodeFn = Box<dyn Fn(&Map<String, Value>) -> Result<Box<dyn EventPayload>>>;

/// Maps wire type tags to payload decoders.
///
/// This is the only open point of the event system: the families themselves
/// are closed enums, but a new entity kind can register its own tags here
/// without the undo/redo machinery knowing about it. Duplicate registration
/// is a programming error and is rejected.
pub struct EventRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl EventRegistry {
    /// An empty registry with no tags. Most callers want [`Self::default`],
    /// which pre-registers every built-in event family.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register a decoder for a tag. Fails if the tag is already taken.
    pub fn register(&mut self, tag: impl Into<String>, decoder: DecodeFn) -> Result<()> {
        let tag = tag.into();
        if self.decoders.contains_key(&tag) {
            return Err(Error::DuplicateEventType(tag));
        }
        self.decoders.insert(tag, decoder);
        Ok(())
    }

    /// Decode one wire object into an event belonging to `workspace_id`.
    ///
    /// The decoded event is stamped from `ctx` like any constructed event:
    /// decoding inside a remote scope yields an unrecordable, ungrouped
    /// event.
    pub fn decode(&self, json: &Value, ctx: &EventContext, workspace_id: &str) -> Result<Event> {
        let object = json.as_object().ok_or_else(|| Error::InvalidField {
            tag: "event",
            field: "type",
            reason: "wire form must be a JSON object".to_string(),
        })?;
        let tag = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                tag: "event",
                field: "type",
            })?;
        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| Error::UnknownEventType(tag.to_string()))?;
        let payload = decoder(object)?;
        Ok(Event::from_boxed(ctx, workspace_id.to_string(), payload))
    }

    /// Decode a batch all-or-nothing: one malformed entry rejects the whole
    /// batch, so an untrusted feed can never be partially applied.
    pub fn decode_batch(
        &self,
        batch: &[Value],
        ctx: &EventContext,
        workspace_id: &str,
    ) -> Result<Vec<Event>> {
        batch
            .iter()
            .map(|json| self.decode(json, ctx, workspace_id))
            .collect()
    }
}

impl Default for EventRegistry {
    /// Registry with all built-in event tags registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }
}

macro_rules! builtin {
    ($registry:expr, $decode:path, $($tag:literal),+) => {
        $(
            $registry
                .register(
                    $tag,
                    Box::new(|json: &Map<String, Value>| {
                        Ok(Box::new($decode($tag, json)?) as Box<dyn EventPayload>)
                    }),
                )
                .expect("builtin tags are distinct");
        )+
    };
}

impl EventRegistry {
    fn register_builtins(&mut self) {
        builtin!(
            self,
            block::decode,
            "create",
            "delete",
            "change",
            "move",
            "move_block_to_module"
        );
        builtin!(
            self,
            comment::decode,
            "comment_create",
            "comment_delete",
            "comment_change",
            "comment_move"
        );
        builtin!(
            self,
            module::decode,
            "module_create",
            "module_delete",
            "module_rename",
            "module_move",
            "module_activate"
        );
        builtin!(self, variable::decode, "var_create", "var_delete", "var_rename");
    }
}

/// Shared accessors for reading typed fields out of the wire object.
pub(crate) mod wire {
    use super::*;
    use crate::models::Coordinate;

    pub fn invalid(tag: &'static str, field: &'static str, reason: String) -> Error {
        Error::InvalidField { tag, field, reason }
    }

    pub fn req_value(
        json: &Map<String, Value>,
        tag: &'static str,
        field: &'static str,
    ) -> Result<Value> {
        json.get(field)
            .cloned()
            .ok_or(Error::MissingField { tag, field })
    }

    pub fn req_str(
        json: &Map<String, Value>,
        tag: &'static str,
        field: &'static str,
    ) -> Result<String> {
        match json.get(field) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(invalid(tag, field, format!("expected string, got {other}"))),
            None => Err(Error::MissingField { tag, field }),
        }
    }

    pub fn opt_str(json: &Map<String, Value>, field: &str) -> Option<String> {
        json.get(field).and_then(Value::as_str).map(str::to_string)
    }

    pub fn req_index(
        json: &Map<String, Value>,
        tag: &'static str,
        field: &'static str,
    ) -> Result<usize> {
        match json.get(field) {
            Some(value) => value
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| invalid(tag, field, format!("expected index, got {value}"))),
            None => Err(Error::MissingField { tag, field }),
        }
    }

    pub fn req_coord(
        json: &Map<String, Value>,
        tag: &'static str,
        field: &'static str,
    ) -> Result<Coordinate> {
        let text = req_str(json, tag, field)?;
        Coordinate::parse(&text)
            .ok_or_else(|| invalid(tag, field, format!("expected \"x,y\", got {text:?}")))
    }
}
