use std::collections::VecDeque;

use crate::events::{Event, EventContext};

use super::Workspace;

/// Default undo stack capacity, matching the editor's historical bound.
pub const DEFAULT_MAX_UNDO: usize = 1024;

/// Per-workspace undo/redo stacks.
///
/// Events sharing a non-empty group id are one user-visible step: a single
/// undo inverts them all in reverse chronological order, a single redo
/// re-applies them chronologically. Within a group later events may depend
/// on state created by earlier ones, so the ordering rule is load-bearing.
pub struct History {
    undo_stack: VecDeque<Event>,
    redo_stack: Vec<Event>,
    max_undo_depth: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_UNDO)
    }

    pub fn with_max_depth(max_undo_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo_depth,
        }
    }

    /// Push a recordable event onto the undo stack.
    ///
    /// Refuses events flagged unrecordable and null events; returns whether
    /// the event was kept. A recorded forward action invalidates any redo
    /// history, and the oldest entries are evicted once over capacity.
    pub fn record(&mut self, event: Event) -> bool {
        if !event.record_undo || event.is_null() {
            return false;
        }
        self.undo_stack.push_back(event);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_undo_depth {
            self.undo_stack.pop_front();
        }
        true
    }

    /// Invert the most recent step. Returns the number of events run.
    pub fn undo(&mut self, workspace: &mut Workspace, ctx: &EventContext) -> usize {
        let Some(first) = self.undo_stack.pop_back() else {
            return 0;
        };
        let group = first.group.clone();
        let mut batch = vec![first];
        if !group.is_empty() {
            while self
                .undo_stack
                .back()
                .is_some_and(|event| event.group == group)
            {
                if let Some(event) = self.undo_stack.pop_back() {
                    batch.push(event);
                }
            }
        }

        // Replay must never re-record itself.
        let _pause = ctx.pause_recording();
        let count = batch.len();
        // Batch is in pop order, i.e. reverse chronological. Pushing in the
        // same order leaves the earliest event on top of the redo stack, so
        // a following redo replays chronologically.
        for event in batch {
            event.run(workspace, false);
            self.redo_stack.push(event);
        }
        count
    }

    /// Re-apply the most recently undone step. Returns the number of events
    /// run.
    pub fn redo(&mut self, workspace: &mut Workspace, ctx: &EventContext) -> usize {
        let Some(first) = self.redo_stack.pop() else {
            return 0;
        };
        let group = first.group.clone();
        let mut batch = vec![first];
        if !group.is_empty() {
            while self
                .redo_stack
                .last()
                .is_some_and(|event| event.group == group)
            {
                if let Some(event) = self.redo_stack.pop() {
                    batch.push(event);
                }
            }
        }

        let _pause = ctx.pause_recording();
        let count = batch.len();
        // Chronological order both for running and for restacking, so the
        // latest event ends back on top of the undo stack.
        for event in batch {
            event.run(workspace, true);
            self.undo_stack.push_back(event);
        }
        count
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_undo_depth(&self) -> usize {
        self.max_undo_depth
    }

    /// Drop both stacks, e.g. on workspace teardown or document load.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Oldest-first view of the undo stack, for tests and diagnostics.
    pub fn undo_events(&self) -> impl Iterator<Item = &Event> {
        self.undo_stack.iter()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ModuleEvent;
    use crate::models::Module;

    fn rename_event(ctx: &EventContext, from: &str, to: &str) -> Event {
        let module = Module {
            module_id: "m1".to_string(),
            name: from.to_string(),
        };
        Event::new(ctx, "w1", ModuleEvent::rename(&module, to))
    }

    #[test]
    fn test_record_refuses_null_event() {
        let ctx = EventContext::new();
        let mut history = History::new();
        assert!(!history.record(rename_event(&ctx, "A", "A")));
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn test_record_refuses_unrecordable_event() {
        let ctx = EventContext::new();
        let mut history = History::new();
        let event = {
            let _pause = ctx.pause_recording();
            rename_event(&ctx, "A", "B")
        };
        assert!(!history.record(event));
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn test_record_clears_redo() {
        let ctx = EventContext::new();
        let mut ws = Workspace::with_id("w1");
        ws.create_module("m1", "A", 0);
        let mut history = History::new();

        assert!(history.record(rename_event(&ctx, "A", "B")));
        history.undo(&mut ws, &ctx);
        assert!(history.can_redo());

        assert!(history.record(rename_event(&ctx, "A", "C")));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let ctx = EventContext::new();
        let mut history = History::with_max_depth(3);

        for i in 0..4 {
            let event = rename_event(&ctx, &format!("n{}", i), &format!("n{}", i + 1));
            assert!(history.record(event));
        }

        assert_eq!(history.undo_len(), 3);
        // The i=0 event was evicted; the oldest survivor is i=1.
        let oldest = history.undo_events().next().unwrap();
        let json = oldest.to_json();
        assert_eq!(json["oldName"], "n1");
    }

    #[test]
    fn test_undo_on_empty_stack_is_a_noop() {
        let ctx = EventContext::new();
        let mut ws = Workspace::with_id("w1");
        let mut history = History::new();
        assert_eq!(history.undo(&mut ws, &ctx), 0);
        assert_eq!(history.redo(&mut ws, &ctx), 0);
    }

    #[test]
    fn test_recording_guard_released_after_undo() {
        let ctx = EventContext::new();
        let mut ws = Workspace::with_id("w1");
        ws.create_module("m1", "A", 0);
        let mut history = History::new();
        history.record(rename_event(&ctx, "A", "B"));

        history.undo(&mut ws, &ctx);
        assert!(ctx.recording());
        history.redo(&mut ws, &ctx);
        assert!(ctx.recording());
    }
}
