use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the event codec and the entity store.
///
/// Replay (`Event::run`) never returns an error: a missing target is logged
/// and skipped, since the entity may have been legitimately removed by a
/// later, already-applied event.
#[derive(Debug, Error)]
pub enum Error {
    /// Deserializer met a type tag with no registered decoder.
    #[error("unknown event type {0:?}")]
    UnknownEventType(String),

    /// Two decoders were registered under the same type tag.
    #[error("event type {0:?} is already registered")]
    DuplicateEventType(String),

    /// Wire object is missing a key the event kind requires.
    #[error("{tag} event is missing required field {field:?}")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },

    /// Wire object has a key of the wrong shape.
    #[error("{tag} event has invalid field {field:?}: {reason}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        reason: String,
    },

    /// Entity snapshot could not be materialized.
    #[error("malformed {entity} snapshot: {source}")]
    Snapshot {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A variable operation named an id that does not exist.
    #[error("no variable with id {0:?}")]
    UnknownVariable(String),
}
