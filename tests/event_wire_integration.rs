use serde_json::{json, Map, Value};

use easel::events::{BlockEvent, CommentEvent, ModuleEvent, VariableEvent};
use easel::models::{Block, Comment, Coordinate, Module, Variable};
use easel::{Error, Event, EventContext, EventPayload, EventRegistry, Workspace};

fn sample_block() -> Block {
    let mut block = Block::new("math_number", "m1");
    block.block_id = "b1".to_string();
    block.position = Coordinate::new(10, 20);
    block.fields.insert("NUM".to_string(), "42".to_string());
    block
}

fn sample_workspace() -> Workspace {
    let mut ws = Workspace::with_id("w1");
    ws.create_module("m1", "Page 1", 0);
    ws.create_module("m2", "Page 2", 1);
    ws.create_block(&sample_block().snapshot()).unwrap();
    let mut comment = Comment::new("m1", "note");
    comment.comment_id = "c1".to_string();
    ws.create_comment(&comment.snapshot()).unwrap();
    ws.create_variable("v1", "count", "");
    ws
}

#[test]
fn every_builtin_tag_round_trips() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let block = sample_block();
    let comment = Comment::new("m1", "note");
    let module = Module {
        module_id: "m1".to_string(),
        name: "Page 1".to_string(),
    };
    let variable = Variable {
        variable_id: "v1".to_string(),
        name: "count".to_string(),
        variable_type: String::new(),
    };

    let events = vec![
        Event::new(&ctx, "w1", BlockEvent::create(&block)),
        Event::new(&ctx, "w1", BlockEvent::delete(&block)),
        Event::new(&ctx, "w1", BlockEvent::field_change(&block, "NUM", "7")),
        Event::new(&ctx, "w1", BlockEvent::comment_change(&block, Some("hi"))),
        Event::new(&ctx, "w1", BlockEvent::collapsed_change(&block, true)),
        Event::new(&ctx, "w1", BlockEvent::disabled_change(&block, true)),
        Event::new(
            &ctx,
            "w1",
            BlockEvent::Move {
                block_id: "b1".to_string(),
                delta: easel::events::MoveDelta::Coordinate {
                    old: Coordinate::new(10, 20),
                    new: Coordinate::new(-3, 40),
                },
            },
        ),
        Event::new(
            &ctx,
            "w1",
            BlockEvent::Move {
                block_id: "b1".to_string(),
                delta: easel::events::MoveDelta::Parent {
                    old: None,
                    new: Some("b0".to_string()),
                },
            },
        ),
        Event::new(&ctx, "w1", BlockEvent::move_to_module(&block, "m2")),
        Event::new(&ctx, "w1", CommentEvent::create(&comment)),
        Event::new(&ctx, "w1", CommentEvent::delete(&comment)),
        Event::new(&ctx, "w1", CommentEvent::text_change(&comment, "edited")),
        Event::new(
            &ctx,
            "w1",
            CommentEvent::Move {
                comment_id: comment.comment_id.clone(),
                old: Coordinate::new(0, 0),
                new: Coordinate::new(5, 6),
            },
        ),
        Event::new(&ctx, "w1", ModuleEvent::create(&module, 0)),
        Event::new(&ctx, "w1", ModuleEvent::delete(&module, 0)),
        Event::new(&ctx, "w1", ModuleEvent::rename(&module, "Renamed")),
        Event::new(&ctx, "w1", ModuleEvent::moved(&module, 2, 0)),
        Event::new(&ctx, "w1", ModuleEvent::activate(&module, Some("m2"))),
        Event::new(&ctx, "w1", VariableEvent::create(&variable)),
        Event::new(&ctx, "w1", VariableEvent::delete(&variable)),
        Event::new(&ctx, "w1", VariableEvent::rename(&variable, "total")),
    ];

    for event in events {
        let wire = event.to_json();
        let decoded = registry.decode(&wire, &ctx, "w1").unwrap_or_else(|err| {
            panic!("{} failed to decode: {err}", event.type_tag());
        });
        assert_eq!(decoded.to_json(), wire, "tag {}", event.type_tag());
    }
}

#[test]
fn decoded_event_runs_like_the_original() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let original = Event::new(
        &ctx,
        "w1",
        BlockEvent::field_change(&sample_block(), "NUM", "7"),
    );
    let decoded = registry.decode(&original.to_json(), &ctx, "w1").unwrap();

    let mut direct = sample_workspace();
    let mut replayed = sample_workspace();
    original.run(&mut direct, true);
    decoded.run(&mut replayed, true);
    assert_eq!(direct.block("b1"), replayed.block("b1"));
    assert_eq!(direct.block("b1").unwrap().fields["NUM"], "7");

    decoded.run(&mut replayed, false);
    assert_eq!(replayed.block("b1").unwrap().fields["NUM"], "42");
}

#[test]
fn null_change_survives_the_wire() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let wire = json!({
        "type": "change",
        "blockId": "b1",
        "element": "field",
        "name": "NUM",
        "oldValue": "42",
        "newValue": "42",
    });
    let decoded = registry.decode(&wire, &ctx, "w1").unwrap();
    assert!(decoded.is_null());
}

#[test]
fn unknown_tag_is_rejected() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let err = registry
        .decode(&json!({"type": "teleport"}), &ctx, "w1")
        .unwrap_err();
    assert!(matches!(err, Error::UnknownEventType(tag) if tag == "teleport"));
}

#[test]
fn malformed_entry_rejects_the_whole_batch() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let batch = vec![
        json!({
            "type": "module_rename",
            "moduleId": "m1",
            "oldName": "Page 1",
            "newName": "Page A",
        }),
        json!({"type": "module_rename", "moduleId": "m1"}),
    ];
    let err = registry.decode_batch(&batch, &ctx, "w1").unwrap_err();
    assert!(matches!(err, Error::MissingField { .. }));
}

#[test]
fn valid_batch_decodes_in_order() {
    let registry = EventRegistry::default();
    let ctx = EventContext::new();
    let batch = vec![
        json!({"type": "var_create", "varId": "v9", "varName": "n", "varType": ""}),
        json!({"type": "var_rename", "varId": "v9", "oldName": "n", "newName": "m"}),
    ];
    let events = registry.decode_batch(&batch, &ctx, "w1").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].type_tag(), "var_create");
    assert_eq!(events[1].type_tag(), "var_rename");
}

/// An out-of-tree entity kind hooking into the wire boundary.
#[derive(Debug)]
struct MarkerEvent {
    label: String,
}

impl EventPayload for MarkerEvent {
    fn type_tag(&self) -> &'static str {
        "marker"
    }

    fn write_json(&self, json: &mut Map<String, Value>) {
        json.insert("label".to_string(), Value::String(self.label.clone()));
    }

    fn run(&self, _workspace: &mut Workspace, _forward: bool) {}
}

#[test]
fn custom_tags_extend_the_registry() {
    let mut registry = EventRegistry::default();
    let ctx = EventContext::new();
    registry
        .register(
            "marker",
            Box::new(|json| {
                let label = json
                    .get("label")
                    .and_then(Value::as_str)
                    .ok_or(Error::MissingField {
                        tag: "marker",
                        field: "label",
                    })?
                    .to_string();
                Ok(Box::new(MarkerEvent { label }))
            }),
        )
        .unwrap();

    let decoded = registry
        .decode(&json!({"type": "marker", "label": "here"}), &ctx, "w1")
        .unwrap();
    assert_eq!(decoded.to_json(), json!({"type": "marker", "label": "here"}));

    // Built-in tags stay reserved.
    let err = registry
        .register("change", Box::new(|_| unreachable!()))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEventType(tag) if tag == "change"));
}
