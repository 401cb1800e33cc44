use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::events::{BlockEvent, Event, EventContext, VariableEvent};
use crate::models::{Block, Comment, Coordinate, Module, Variable};

use super::History;

/// The live document: blocks, comments, modules and variables, each
/// addressable by a stable string id.
///
/// Mutating the store does not implicitly create events; callers construct
/// the matching event around each mutation. The one exception is
/// [`rename_variable`](Self::rename_variable), which the store drives itself
/// because a rename can cascade into a multi-event merge.
pub struct Workspace {
    workspace_id: String,
    blocks: HashMap<String, Block>,
    comments: HashMap<String, Comment>,
    /// Ordered: a module's sequence index is its "order".
    modules: Vec<Module>,
    variables: HashMap<String, Variable>,
    active_module_id: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            blocks: HashMap::new(),
            comments: HashMap::new(),
            modules: Vec::new(),
            variables: HashMap::new(),
            active_module_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.workspace_id
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.get(block_id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.get(comment_id)
    }

    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Sequence index of a module in the ordered page list.
    pub fn module_order(&self, module_id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.module_id == module_id)
    }

    pub fn active_module(&self) -> Option<&str> {
        self.active_module_id.as_deref()
    }

    pub fn variable(&self, variable_id: &str) -> Option<&Variable> {
        self.variables.get(variable_id)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Find a variable by name and type. Names are unique per type.
    pub fn variable_by_name(&self, name: &str, variable_type: &str) -> Option<&Variable> {
        self.variables
            .values()
            .find(|v| v.name == name && v.variable_type == variable_type)
    }

    /// Like [`variable_by_name`](Self::variable_by_name), but names that
    /// differ only in case are considered the same variable. Rename conflict
    /// detection uses this so "name2" and "Name2" cannot coexist.
    pub fn variable_by_name_insensitive(
        &self,
        name: &str,
        variable_type: &str,
    ) -> Option<&Variable> {
        let folded = name.to_lowercase();
        self.variables
            .values()
            .find(|v| v.name.to_lowercase() == folded && v.variable_type == variable_type)
    }

    // ------------------------------------------------------------------
    // Materialize / dematerialize
    // ------------------------------------------------------------------

    /// Materialize a block from its serialized snapshot. Re-materializing an
    /// id that already exists replaces it.
    pub fn create_block(&mut self, snapshot: &Value) -> Result<()> {
        let block: Block =
            serde_json::from_value(snapshot.clone()).map_err(|source| Error::Snapshot {
                entity: "block",
                source,
            })?;
        self.blocks.insert(block.block_id.clone(), block);
        Ok(())
    }

    /// Remove a block by id; false when absent.
    pub fn delete_block(&mut self, block_id: &str) -> bool {
        self.blocks.remove(block_id).is_some()
    }

    pub fn create_comment(&mut self, snapshot: &Value) -> Result<()> {
        let comment: Comment =
            serde_json::from_value(snapshot.clone()).map_err(|source| Error::Snapshot {
                entity: "comment",
                source,
            })?;
        self.comments.insert(comment.comment_id.clone(), comment);
        Ok(())
    }

    pub fn delete_comment(&mut self, comment_id: &str) -> bool {
        self.comments.remove(comment_id).is_some()
    }

    /// Insert a module at `order`, clamped to the end of the list.
    /// Re-creating an existing id is a no-op.
    pub fn create_module(&mut self, module_id: &str, name: &str, order: usize) {
        if self.module(module_id).is_some() {
            return;
        }
        let module = Module {
            module_id: module_id.to_string(),
            name: name.to_string(),
        };
        let index = order.min(self.modules.len());
        self.modules.insert(index, module);
    }

    pub fn delete_module(&mut self, module_id: &str) -> bool {
        let Some(index) = self.module_order(module_id) else {
            return false;
        };
        self.modules.remove(index);
        if self.active_module_id.as_deref() == Some(module_id) {
            self.active_module_id = None;
        }
        true
    }

    /// Insert a variable with an explicit id. Re-creating an existing id is
    /// a no-op.
    pub fn create_variable(&mut self, variable_id: &str, name: &str, variable_type: &str) {
        self.variables
            .entry(variable_id.to_string())
            .or_insert_with(|| Variable {
                variable_id: variable_id.to_string(),
                name: name.to_string(),
                variable_type: variable_type.to_string(),
            });
    }

    pub fn delete_variable(&mut self, variable_id: &str) -> bool {
        self.variables.remove(variable_id).is_some()
    }

    // ------------------------------------------------------------------
    // Field and topology mutators. All return whether the target existed.
    // ------------------------------------------------------------------

    pub fn set_block_field(&mut self, block_id: &str, field: &str, value: &str) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.fields.insert(field.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub fn set_block_comment(&mut self, block_id: &str, text: Option<String>) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.comment_text = text;
                true
            }
            None => false,
        }
    }

    pub fn set_block_collapsed(&mut self, block_id: &str, collapsed: bool) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.collapsed = collapsed;
                true
            }
            None => false,
        }
    }

    pub fn set_block_disabled(&mut self, block_id: &str, disabled: bool) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.disabled = disabled;
                true
            }
            None => false,
        }
    }

    pub fn move_block(&mut self, block_id: &str, position: Coordinate) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.position = position;
                true
            }
            None => false,
        }
    }

    pub fn reparent_block(&mut self, block_id: &str, parent_id: Option<String>) -> bool {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.parent_id = parent_id;
                true
            }
            None => false,
        }
    }

    /// Move a block to another module. Fails when either side is missing.
    pub fn move_block_to_module(&mut self, block_id: &str, module_id: &str) -> bool {
        if self.module(module_id).is_none() {
            return false;
        }
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                block.module_id = module_id.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_comment_text(&mut self, comment_id: &str, text: String) -> bool {
        match self.comments.get_mut(comment_id) {
            Some(comment) => {
                comment.text = text;
                true
            }
            None => false,
        }
    }

    pub fn move_comment(&mut self, comment_id: &str, position: Coordinate) -> bool {
        match self.comments.get_mut(comment_id) {
            Some(comment) => {
                comment.position = position;
                true
            }
            None => false,
        }
    }

    pub fn rename_module(&mut self, module_id: &str, name: &str) -> bool {
        match self.modules.iter_mut().find(|m| m.module_id == module_id) {
            Some(module) => {
                module.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Reorder a module within the page list, clamped to the end.
    pub fn move_module(&mut self, module_id: &str, order: usize) -> bool {
        let Some(index) = self.module_order(module_id) else {
            return false;
        };
        let module = self.modules.remove(index);
        let index = order.min(self.modules.len());
        self.modules.insert(index, module);
        true
    }

    /// Set the active module. `None` clears the selection; activating an
    /// unknown id fails.
    pub fn activate_module(&mut self, module_id: Option<&str>) -> bool {
        match module_id {
            Some(id) => {
                if self.module(id).is_none() {
                    return false;
                }
                self.active_module_id = Some(id.to_string());
                true
            }
            None => {
                self.active_module_id = None;
                true
            }
        }
    }

    pub fn set_variable_name(&mut self, variable_id: &str, name: &str) -> bool {
        match self.variables.get_mut(variable_id) {
            Some(variable) => {
                variable.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Repoint every block field that referenced `old_id` to `new_id`.
    /// Returns the number of fields touched.
    pub fn rename_variable_references(&mut self, old_id: &str, new_id: &str) -> usize {
        let mut touched = 0;
        for block in self.blocks.values_mut() {
            for value in block.fields.values_mut() {
                if value == old_id {
                    *value = new_id.to_string();
                    touched += 1;
                }
            }
        }
        touched
    }

    // ------------------------------------------------------------------
    // Variable rename, including the conflict merge
    // ------------------------------------------------------------------

    /// Rename a variable, recording the events onto `history` as one group.
    ///
    /// When another variable of the same type already uses the new name, the
    /// two are coalesced: the survivor is the variable that already carried
    /// the name, every block reference to the renamed variable is repointed
    /// at the survivor, and the renamed variable is deleted. A single undo
    /// restores the whole merge.
    pub fn rename_variable(
        &mut self,
        ctx: &EventContext,
        history: &mut History,
        variable_id: &str,
        new_name: &str,
    ) -> Result<()> {
        let variable = self
            .variables
            .get(variable_id)
            .cloned()
            .ok_or_else(|| Error::UnknownVariable(variable_id.to_string()))?;
        // Conflicts are detected ignoring case, so renaming onto a
        // case-variant of an existing name still merges. The ids may match
        // when the rename is a simple case change of the same variable.
        let conflict = self
            .variable_by_name_insensitive(new_name, &variable.variable_type)
            .filter(|c| c.variable_id != variable.variable_id)
            .cloned();

        let workspace_id = self.workspace_id.clone();
        let _group = ctx.scoped_group();

        match conflict {
            None => {
                history.record(Event::new(
                    ctx,
                    &workspace_id,
                    VariableEvent::rename(&variable, new_name),
                ));
                self.set_variable_name(variable_id, new_name);
            }
            Some(conflict) => {
                // Case change on the survivor first.
                if conflict.name != new_name {
                    history.record(Event::new(
                        ctx,
                        &workspace_id,
                        VariableEvent::rename(&conflict, new_name),
                    ));
                    self.set_variable_name(&conflict.variable_id, new_name);
                }

                // Repoint block references, one recorded change per field.
                let references: Vec<(String, String)> = self
                    .blocks
                    .values()
                    .flat_map(|block| {
                        block.fields.iter().filter_map(|(field, value)| {
                            (value == variable_id)
                                .then(|| (block.block_id.clone(), field.clone()))
                        })
                    })
                    .collect();
                for (block_id, field) in references {
                    if let Some(block) = self.blocks.get(&block_id) {
                        history.record(Event::new(
                            ctx,
                            &workspace_id,
                            BlockEvent::field_change(block, &field, &conflict.variable_id),
                        ));
                    }
                    self.set_block_field(&block_id, &field, &conflict.variable_id);
                }

                // Finally delete the now-unreferenced variable.
                history.record(Event::new(
                    ctx,
                    &workspace_id,
                    VariableEvent::delete(&variable),
                ));
                self.delete_variable(variable_id);
            }
        }
        Ok(())
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_block_from_snapshot() {
        let mut ws = Workspace::with_id("w1");
        let block = Block::new("controls_if", "m1");
        let id = block.block_id.clone();

        ws.create_block(&block.snapshot()).unwrap();
        assert_eq!(ws.block(&id), Some(&block));
    }

    #[test]
    fn test_create_block_rejects_malformed_snapshot() {
        let mut ws = Workspace::with_id("w1");
        let result = ws.create_block(&serde_json::json!({ "name": "no ids here" }));
        assert!(matches!(result, Err(Error::Snapshot { .. })));
    }

    #[test]
    fn test_delete_absent_block_is_nonfatal() {
        let mut ws = Workspace::with_id("w1");
        assert!(!ws.delete_block("missing"));
    }

    #[test]
    fn test_module_order_tracks_insertion() {
        let mut ws = Workspace::with_id("w1");
        ws.create_module("m1", "Page 1", 0);
        ws.create_module("m2", "Page 2", 1);
        ws.create_module("m3", "Page 3", 99); // clamped to end

        assert_eq!(ws.module_order("m1"), Some(0));
        assert_eq!(ws.module_order("m3"), Some(2));

        assert!(ws.move_module("m3", 0));
        assert_eq!(ws.module_order("m3"), Some(0));
        assert_eq!(ws.module_order("m1"), Some(1));
        assert_eq!(ws.module_order("m2"), Some(2));
    }

    #[test]
    fn test_delete_active_module_clears_selection() {
        let mut ws = Workspace::with_id("w1");
        ws.create_module("m1", "Page 1", 0);
        assert!(ws.activate_module(Some("m1")));
        assert!(ws.delete_module("m1"));
        assert_eq!(ws.active_module(), None);
    }

    #[test]
    fn test_move_block_to_missing_module_fails() {
        let mut ws = Workspace::with_id("w1");
        ws.create_module("m1", "Page 1", 0);
        let block = Block::new("controls_if", "m1");
        let id = block.block_id.clone();
        ws.create_block(&block.snapshot()).unwrap();

        assert!(!ws.move_block_to_module(&id, "nope"));
        assert_eq!(ws.block(&id).unwrap().module_id, "m1");
    }

    #[test]
    fn test_rename_variable_references() {
        let mut ws = Workspace::with_id("w1");
        let mut block = Block::new("variables_get", "m1");
        block.fields.insert("VAR".to_string(), "v1".to_string());
        let id = block.block_id.clone();
        ws.create_block(&block.snapshot()).unwrap();

        assert_eq!(ws.rename_variable_references("v1", "v2"), 1);
        assert_eq!(ws.block(&id).unwrap().fields["VAR"], "v2");
    }

    #[test]
    fn test_variable_lookup_ignores_case() {
        let mut ws = Workspace::with_id("w1");
        ws.create_variable("v1", "name2", "");

        assert!(ws.variable_by_name("Name2", "").is_none());
        assert_eq!(
            ws.variable_by_name_insensitive("Name2", "")
                .map(|v| v.variable_id.as_str()),
            Some("v1")
        );
        assert!(ws.variable_by_name_insensitive("Name2", "int").is_none());
    }

    #[test]
    fn test_rename_onto_case_variant_merges_and_recases_survivor() {
        let mut ws = Workspace::with_id("w1");
        let ctx = EventContext::new();
        let mut history = History::new();
        ws.create_variable("id1", "name1", "");
        ws.create_variable("id2", "name2", "");

        ws.rename_variable(&ctx, &mut history, "id1", "Name2")
            .unwrap();

        assert!(ws.variable("id1").is_none());
        assert_eq!(ws.variable("id2").unwrap().name, "Name2");
        assert_eq!(ws.variables().count(), 1);
    }

    #[test]
    fn test_case_change_of_same_variable_is_plain_rename() {
        let mut ws = Workspace::with_id("w1");
        let ctx = EventContext::new();
        let mut history = History::new();
        ws.create_variable("id1", "count", "");

        ws.rename_variable(&ctx, &mut history, "id1", "Count")
            .unwrap();

        assert_eq!(ws.variable("id1").unwrap().name, "Count");
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_rename_unknown_variable_errors() {
        let mut ws = Workspace::with_id("w1");
        let ctx = EventContext::new();
        let mut history = History::new();
        let result = ws.rename_variable(&ctx, &mut history, "missing", "x");
        assert!(matches!(result, Err(Error::UnknownVariable(_))));
    }
}
