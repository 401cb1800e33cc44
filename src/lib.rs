//! Document model and undoable mutation log for a block-canvas editor.
//!
//! Every structural change to the document (blocks, comments, modules,
//! variables) is captured as a small, serializable, invertible [`Event`].
//! Events stamped with the same group id form one atomic undo/redo step;
//! [`History`] replays them against the [`Workspace`] entity store in either
//! direction, and [`EventRegistry`] gives them a stable JSON wire format.

pub mod engine;
pub mod error;
pub mod events;
pub mod models;

pub use engine::{History, Workspace, DEFAULT_MAX_UNDO};
pub use error::{Error, Result};
pub use events::{Event, EventContext, EventPayload, EventRegistry};
