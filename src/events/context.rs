use std::cell::{Cell, RefCell};

/// Per-session transaction state consulted by every event constructor.
///
/// This replaces ambient global toggles with an explicit context object the
/// editor shell owns and threads through. All state is scoped: the accessor
/// methods hand out guards that restore the previous value on drop, so an
/// early return or panic mid-operation cannot leave grouping stuck on or the
/// session permanently believing it is applying a remote change.
#[derive(Debug, Default)]
pub struct EventContext {
    group: RefCell<String>,
    paused: Cell<bool>,
    applying_remote: Cell<bool>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the currently open group, empty when ungrouped.
    pub fn group(&self) -> String {
        self.group.borrow().clone()
    }

    /// Whether freshly constructed events should land on the undo stack.
    pub fn recording(&self) -> bool {
        !self.paused.get()
    }

    /// Whether an externally-sourced event is currently being applied.
    pub fn applying_remote(&self) -> bool {
        self.applying_remote.get()
    }

    /// Open a fresh group. Events constructed while the guard lives are
    /// stamped with the new id and undo/redo as one unit.
    pub fn scoped_group(&self) -> GroupGuard<'_> {
        self.set_group(uuid::Uuid::new_v4().to_string())
    }

    /// Rejoin a group started elsewhere, e.g. a sub-operation extending a
    /// multi-step UI action.
    pub fn adopt_group(&self, id: impl Into<String>) -> GroupGuard<'_> {
        self.set_group(id.into())
    }

    fn set_group(&self, id: String) -> GroupGuard<'_> {
        let previous = self.group.replace(id);
        GroupGuard {
            ctx: self,
            previous,
        }
    }

    /// Suppress recording for events constructed while the guard lives.
    /// Used by undo/redo replay, which must never re-record itself.
    pub fn pause_recording(&self) -> RecordingGuard<'_> {
        let previous = self.paused.replace(true);
        RecordingGuard {
            ctx: self,
            previous,
        }
    }

    /// Mark the session as applying an externally-sourced event. Events
    /// constructed while the guard lives are ungrouped and unrecordable, so
    /// a remote change can never be echoed back or undone locally.
    pub fn remote_scope(&self) -> RemoteGuard<'_> {
        let previous = self.applying_remote.replace(true);
        RemoteGuard {
            ctx: self,
            previous,
        }
    }
}

/// Restores the previously active group id on drop.
#[must_use = "dropping the guard immediately closes the group"]
pub struct GroupGuard<'a> {
    ctx: &'a EventContext,
    previous: String,
}

impl GroupGuard<'_> {
    /// Id of the group this guard holds open.
    pub fn id(&self) -> String {
        self.ctx.group()
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        *self.ctx.group.borrow_mut() = std::mem::take(&mut self.previous);
    }
}

/// Restores the previous recording state on drop.
#[must_use = "dropping the guard immediately resumes recording"]
pub struct RecordingGuard<'a> {
    ctx: &'a EventContext,
    previous: bool,
}

impl Drop for RecordingGuard<'_> {
    fn drop(&mut self) {
        self.ctx.paused.set(self.previous);
    }
}

/// Restores the previous remote-apply state on drop.
#[must_use = "dropping the guard immediately ends the remote scope"]
pub struct RemoteGuard<'a> {
    ctx: &'a EventContext,
    previous: bool,
}

impl Drop for RemoteGuard<'_> {
    fn drop(&mut self) {
        self.ctx.applying_remote.set(self.previous);
    }
}
