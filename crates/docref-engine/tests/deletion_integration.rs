//! Integration tests for reference-aware deletion.

use docref_core::{FieldDef, FieldType, ModelDef, QueryStyle, ScalarType, SchemaBundle};
use docref_engine::{Database, DatabaseConfig, EngineConfig, Error};
use docref_proto::DocumentId;
use serde_json::{json, Value};

struct TestContext {
    db: Database,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self::with_engine(EngineConfig::default())
    }

    fn with_engine(engine: EngineConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(DatabaseConfig::new(dir.path()).with_engine(engine)).unwrap();
        Self { db, _dir: dir }
    }

    fn register(&mut self, model: ModelDef) {
        self.db.register_model(model).unwrap();
    }

    async fn put(&self, model: &str, id: &str, data: Value) -> DocumentId {
        let id = DocumentId::new(id);
        self.db.insert_with_id(model, id.clone(), data).await.unwrap();
        id
    }

    async fn data(&self, model: &str, id: &DocumentId) -> Option<Value> {
        self.db.get(model, id).await.unwrap().map(|r| r.data)
    }

    async fn exists(&self, model: &str, id: &DocumentId) -> bool {
        self.db.get(model, id).await.unwrap().is_some()
    }

    async fn is_soft_deleted(&self, model: &str, id: &DocumentId) -> bool {
        self.db.get(model, id).await.unwrap().unwrap().deleted
    }
}

fn reference(name: &str, target: &str, required: bool, cascade: bool) -> FieldDef {
    let mut field = FieldDef::reference(name, target).with_required(required);
    field.cascade = cascade;
    field
}

fn house() -> ModelDef {
    ModelDef::new("House").with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
}

fn room(required: bool, cascade: bool) -> ModelDef {
    ModelDef::new("Room")
        .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
        .with_field(reference("house", "House", required, cascade))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_block_then_nullify_after_policy_change() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, false));

    let h = ctx.put("House", "h", json!({"name": "Tudor"})).await;
    let r = ctx.put("Room", "r", json!({"name": "kitchen", "house": "h"})).await;

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    let constraint = err.as_constraint().expect("expected a constraint error");
    assert_eq!(constraint.source_model, "Room");
    assert_eq!(constraint.path, "house");
    assert_eq!(constraint.blocking_document_id, r);
    assert_eq!(constraint.target_id, h);
    assert!(ctx.exists("House", &h).await);

    ctx.db
        .set_reference_policy("Room", "house", false, false)
        .unwrap();

    let result = ctx.db.delete("House", &h).await.unwrap();
    assert!(result.was_deleted("House", &h));
    assert_eq!(result.nullified.len(), 1);
    assert_eq!(result.nullified[0].modified, 1);
    assert!(!ctx.exists("House", &h).await);
    assert_eq!(
        ctx.data("Room", &r).await.unwrap(),
        json!({"name": "kitchen", "house": null})
    );
}

#[tokio::test]
async fn test_block_then_nullify_after_redeclaring_model() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, false));

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;

    assert!(ctx.db.delete("House", &h).await.unwrap_err().is_constraint());

    ctx.register(room(false, false));
    ctx.db.delete("House", &h).await.unwrap();

    assert_eq!(ctx.data("Room", &r).await.unwrap(), json!({"house": null}));
}

#[tokio::test]
async fn test_cascade_deletes_all_rooms() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, true));

    let h = ctx.put("House", "h", json!({})).await;
    let r1 = ctx.put("Room", "r1", json!({"house": "h"})).await;
    let r2 = ctx.put("Room", "r2", json!({"house": "h"})).await;

    let result = ctx.db.delete("House", &h).await.unwrap();

    assert_eq!(result.deleted.len(), 3);
    assert!(result.was_deleted("Room", &r1));
    assert!(result.was_deleted("Room", &r2));
    for (model, id) in [("House", &h), ("Room", &r1), ("Room", &r2)] {
        assert!(!ctx.exists(model, id).await);
    }
}

#[tokio::test]
async fn test_cascade_through_array_of_references() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    let mut houses = FieldDef::reference_array("houses", "House");
    houses.cascade = true;
    ctx.register(ModelDef::new("Room").with_field(houses));

    let h1 = ctx.put("House", "h1", json!({})).await;
    let _h2 = ctx.put("House", "h2", json!({})).await;
    let r = ctx.put("Room", "r", json!({"houses": ["h1", "h2"]})).await;
    let survivor = ctx.put("Room", "s", json!({"houses": ["h2"]})).await;

    ctx.db.delete("House", &h1).await.unwrap();

    assert!(!ctx.exists("Room", &r).await);
    assert_eq!(
        ctx.data("Room", &survivor).await.unwrap(),
        json!({"houses": ["h2"]})
    );
}

// ============================================================================
// Compiler idempotence and depth independence
// ============================================================================

#[tokio::test]
async fn test_reregistration_does_not_duplicate_effects() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(false, false));
    ctx.register(room(false, false));

    assert_eq!(ctx.db.registry().references_to("House").len(), 1);

    let h = ctx.put("House", "h", json!({})).await;
    ctx.put("Room", "r", json!({"house": "h"})).await;

    let result = ctx.db.delete("House", &h).await.unwrap();
    assert_eq!(result.nullified.len(), 1);
}

fn nested_room(levels: usize, required: bool, cascade: bool) -> ModelDef {
    let mut field = reference("house", "House", required, cascade);
    for level in (0..levels).rev() {
        field = FieldDef::object(format!("level{}", level), vec![field]);
    }
    ModelDef::new("Room").with_field(field)
}

fn nested_doc(levels: usize, house: Value) -> Value {
    let mut doc = json!({"house": house});
    for level in (0..levels).rev() {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(format!("level{}", level), doc);
        doc = Value::Object(wrapper);
    }
    doc
}

#[tokio::test]
async fn test_depth_independence() {
    for levels in [0, 3] {
        // Block
        let mut ctx = TestContext::new();
        ctx.register(house());
        ctx.register(nested_room(levels, true, false));
        let h = ctx.put("House", "h", json!({})).await;
        ctx.put("Room", "r", nested_doc(levels, json!("h"))).await;

        assert!(ctx.db.delete("House", &h).await.unwrap_err().is_constraint());
        assert_eq!(
            ctx.db.registry().references_to("House")[0].path.len(),
            levels + 1
        );

        // Nullify
        let mut ctx = TestContext::new();
        ctx.register(house());
        ctx.register(nested_room(levels, false, false));
        let h = ctx.put("House", "h", json!({})).await;
        let r = ctx.put("Room", "r", nested_doc(levels, json!("h"))).await;

        ctx.db.delete("House", &h).await.unwrap();
        assert_eq!(ctx.data("Room", &r).await.unwrap(), nested_doc(levels, Value::Null));

        // Cascade
        let mut ctx = TestContext::new();
        ctx.register(house());
        ctx.register(nested_room(levels, true, true));
        let h = ctx.put("House", "h", json!({})).await;
        let r = ctx.put("Room", "r", nested_doc(levels, json!("h"))).await;

        ctx.db.delete("House", &h).await.unwrap();
        assert!(!ctx.exists("Room", &r).await);
    }
}

// ============================================================================
// Array isolation
// ============================================================================

fn street() -> ModelDef {
    ModelDef::new("Street").with_field(FieldDef::object_array(
        "rooms",
        vec![
            FieldDef::new("name", FieldType::scalar(ScalarType::String)),
            reference("house", "House", false, false),
        ],
    ))
}

#[tokio::test]
async fn test_nullify_touches_only_matching_element() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(street());

    let h1 = ctx.put("House", "h1", json!({})).await;
    ctx.put("House", "h2", json!({})).await;
    let s = ctx
        .put(
            "Street",
            "s",
            json!({"rooms": [{"name": "a", "house": "h1"}, {"name": "b", "house": "h2"}]}),
        )
        .await;

    ctx.db.delete("House", &h1).await.unwrap();

    assert_eq!(
        ctx.data("Street", &s).await.unwrap(),
        json!({"rooms": [{"name": "a", "house": null}, {"name": "b", "house": "h2"}]})
    );
}

fn estate() -> ModelDef {
    ModelDef::new("Estate").with_field(FieldDef::object_array(
        "floors",
        vec![FieldDef::object(
            "wing",
            vec![FieldDef::object_array(
                "rooms",
                vec![reference("house", "House", false, false)],
            )],
        )],
    ))
}

async fn nested_array_isolation(style: QueryStyle) {
    let mut ctx = TestContext::with_engine(EngineConfig::default().with_query_style(style));
    ctx.register(house());
    ctx.register(estate());

    let h1 = ctx.put("House", "h1", json!({})).await;
    let e = ctx
        .put(
            "Estate",
            "e",
            json!({"floors": [
                {"wing": {"rooms": [{"house": "h1"}, {"house": "h2"}]}},
                {"wing": {"rooms": [{"house": "h3"}, {"house": "h1"}]}}
            ]}),
        )
        .await;
    let untouched = ctx
        .put(
            "Estate",
            "u",
            json!({"floors": [{"wing": {"rooms": [{"house": "h2"}]}}]}),
        )
        .await;

    let result = ctx.db.delete("House", &h1).await.unwrap();
    assert_eq!(result.nullified[0].modified, 1);

    assert_eq!(
        ctx.data("Estate", &e).await.unwrap(),
        json!({"floors": [
            {"wing": {"rooms": [{"house": null}, {"house": "h2"}]}},
            {"wing": {"rooms": [{"house": "h3"}, {"house": null}]}}
        ]})
    );
    assert_eq!(
        ctx.data("Estate", &untouched).await.unwrap(),
        json!({"floors": [{"wing": {"rooms": [{"house": "h2"}]}}]})
    );
}

#[tokio::test]
async fn test_nested_array_isolation_implicit_queries() {
    nested_array_isolation(QueryStyle::Implicit).await;
}

#[tokio::test]
async fn test_nested_array_isolation_explicit_queries() {
    nested_array_isolation(QueryStyle::Explicit).await;
}

#[tokio::test]
async fn test_nullify_pulls_from_array_of_references() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(ModelDef::new("Room").with_field(
        FieldDef::reference_array("houses", "House").with_required(false),
    ));

    let h1 = ctx.put("House", "h1", json!({})).await;
    let r = ctx.put("Room", "r", json!({"houses": ["h1", "h2", "h1"]})).await;

    ctx.db.delete("House", &h1).await.unwrap();
    assert_eq!(ctx.data("Room", &r).await.unwrap(), json!({"houses": ["h2"]}));
}

// ============================================================================
// Soft delete
// ============================================================================

fn soft_housing(ctx: &mut TestContext) {
    ctx.register(house().with_soft_delete());
    ctx.register(room(true, true).with_soft_delete());
}

#[tokio::test]
async fn test_soft_cascade_is_reversible() {
    let mut ctx = TestContext::new();
    soft_housing(&mut ctx);

    let h = ctx.put("House", "h", json!({})).await;
    let r1 = ctx.put("Room", "r1", json!({"house": "h"})).await;
    let r2 = ctx.put("Room", "r2", json!({"house": "h"})).await;

    let result = ctx.db.soft_delete("House", &h).await.unwrap();
    assert_eq!(result.soft_deleted.len(), 3);
    for (model, id) in [("House", &h), ("Room", &r1), ("Room", &r2)] {
        assert!(ctx.is_soft_deleted(model, id).await);
    }

    let result = ctx.db.restore("House", &h).await.unwrap();
    assert_eq!(result.restored.len(), 3);
    for (model, id) in [("House", &h), ("Room", &r1), ("Room", &r2)] {
        assert!(!ctx.is_soft_deleted(model, id).await);
    }

    // References survive both transitions.
    assert_eq!(ctx.data("Room", &r1).await.unwrap(), json!({"house": "h"}));
}

#[tokio::test]
async fn test_soft_delete_blocked_leaves_document_live() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    ctx.register(room(true, false));

    let h = ctx.put("House", "h", json!({})).await;
    ctx.put("Room", "r", json!({"house": "h"})).await;

    assert!(ctx.db.soft_delete("House", &h).await.unwrap_err().is_constraint());
    assert!(!ctx.is_soft_deleted("House", &h).await);
}

#[tokio::test]
async fn test_restore_is_never_blocked() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    ctx.register(room(true, false));

    let h = ctx.put("House", "h", json!({})).await;
    ctx.db.soft_delete("House", &h).await.unwrap();

    // A blocking reference appears while the house is soft-deleted.
    ctx.put("Room", "r", json!({"house": "h"})).await;

    ctx.db.restore("House", &h).await.unwrap();
    assert!(!ctx.is_soft_deleted("House", &h).await);
}

#[tokio::test]
async fn test_soft_delete_never_nullifies() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    ctx.register(room(false, false));

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;

    let result = ctx.db.soft_delete("House", &h).await.unwrap();
    assert!(result.nullified.is_empty());
    assert_eq!(ctx.data("Room", &r).await.unwrap(), json!({"house": "h"}));
}

#[tokio::test]
async fn test_soft_deleted_referrer_blocks_hard_delete() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, false).with_soft_delete());

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.db.soft_delete("Room", &r).await.unwrap();

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    assert_eq!(err.as_constraint().unwrap().blocking_document_id, r);
    assert!(ctx.exists("House", &h).await);

    // Restoring the room finds its house still there.
    ctx.db.restore("Room", &r).await.unwrap();
    assert_eq!(ctx.data("Room", &r).await.unwrap(), json!({"house": "h"}));
    assert!(ctx.exists("House", &h).await);
}

#[tokio::test]
async fn test_soft_deleted_referrer_does_not_block_soft_delete() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    ctx.register(room(true, false).with_soft_delete());

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.db.soft_delete("Room", &r).await.unwrap();

    ctx.db.soft_delete("House", &h).await.unwrap();
    assert!(ctx.is_soft_deleted("House", &h).await);
}

#[tokio::test]
async fn test_soft_cascade_skips_models_without_soft_delete() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    ctx.register(room(true, true));

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;

    let result = ctx.db.soft_delete("House", &h).await.unwrap();
    assert_eq!(result.soft_deleted.len(), 1);
    assert!(ctx.exists("Room", &r).await);
    assert!(!ctx.is_soft_deleted("Room", &r).await);
}

#[tokio::test]
async fn test_skipped_soft_cascade_still_blocks() {
    let mut ctx = TestContext::new();
    ctx.register(house().with_soft_delete());
    // No soft delete: reached by the house cascade but left live.
    ctx.register(
        ModelDef::new("Room")
            .with_field(reference("house", "House", true, true))
            .with_field(reference("wing", "Wing", true, false)),
    );
    ctx.register(
        ModelDef::new("Wing")
            .with_field(reference("house", "House", true, true))
            .with_soft_delete(),
    );

    let h = ctx.put("House", "h", json!({})).await;
    let w = ctx.put("Wing", "w", json!({"house": "h"})).await;
    let r = ctx.put("Room", "r", json!({"house": "h", "wing": "w"})).await;

    let err = ctx.db.soft_delete("House", &h).await.unwrap_err();
    let constraint = err.as_constraint().unwrap();
    assert_eq!(constraint.source_model, "Room");
    assert_eq!(constraint.blocking_document_id, r);
    assert_eq!(constraint.target_id, w);

    assert!(!ctx.is_soft_deleted("House", &h).await);
    assert!(!ctx.is_soft_deleted("Wing", &w).await);
    assert!(!ctx.is_soft_deleted("Room", &r).await);
}

// ============================================================================
// Block atomicity
// ============================================================================

fn tenant() -> ModelDef {
    ModelDef::new("Tenant").with_field(reference("home", "House", true, false))
}

#[tokio::test]
async fn test_block_prevents_earlier_nullify() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    // Registered first so its descriptor precedes the blocking one.
    ctx.register(room(false, false));
    ctx.register(tenant());

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.put("Tenant", "t", json!({"home": "h"})).await;

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    assert_eq!(err.as_constraint().unwrap().source_model, "Tenant");

    assert!(ctx.exists("House", &h).await);
    assert_eq!(ctx.data("Room", &r).await.unwrap(), json!({"house": "h"}));
}

#[tokio::test]
async fn test_block_prevents_earlier_cascade() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, true));
    ctx.register(tenant());

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.put("Tenant", "t", json!({"home": "h"})).await;

    assert!(ctx.db.delete("House", &h).await.unwrap_err().is_constraint());
    assert!(ctx.exists("House", &h).await);
    assert!(ctx.exists("Room", &r).await);
}

#[tokio::test]
async fn test_block_inside_cascade_propagates() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    ctx.register(room(true, true));
    ctx.register(ModelDef::new("Lamp").with_field(reference("room", "Room", true, false)));

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    let lamp = ctx.put("Lamp", "l", json!({"room": "r"})).await;

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    let constraint = err.as_constraint().unwrap();
    assert_eq!(constraint.source_model, "Lamp");
    assert_eq!(constraint.blocking_document_id, lamp);
    assert_eq!(constraint.target_id, r);

    assert!(ctx.exists("House", &h).await);
    assert!(ctx.exists("Room", &r).await);
}

#[tokio::test]
async fn test_completed_cascade_survives_later_block() {
    let mut ctx = TestContext::new();
    ctx.register(house());
    // Cascades first, to a model with no inbound references.
    ctx.register(room(true, true));
    // Cascades second, to a model a lamp blocks.
    ctx.register(ModelDef::new("Wing").with_field(reference("house", "House", true, true)));
    ctx.register(ModelDef::new("Lamp").with_field(reference("wing", "Wing", true, false)));

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    let w = ctx.put("Wing", "w", json!({"house": "h"})).await;
    ctx.put("Lamp", "l", json!({"wing": "w"})).await;

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    assert_eq!(err.as_constraint().unwrap().source_model, "Lamp");

    // The room cascade had already completed and is not undone.
    assert!(!ctx.exists("Room", &r).await);
    assert!(ctx.exists("Wing", &w).await);
    assert!(ctx.exists("House", &h).await);
}

// ============================================================================
// Cascade guards
// ============================================================================

fn chain(ctx: &mut TestContext) {
    ctx.register(house());
    ctx.register(room(true, true));
    ctx.register(ModelDef::new("Lamp").with_field(reference("room", "Room", true, true)));
}

#[tokio::test]
async fn test_multi_level_cascade() {
    let mut ctx = TestContext::new();
    chain(&mut ctx);

    let h = ctx.put("House", "h", json!({})).await;
    ctx.put("Room", "r", json!({"house": "h"})).await;
    let lamp = ctx.put("Lamp", "l", json!({"room": "r"})).await;

    let result = ctx.db.delete("House", &h).await.unwrap();
    assert_eq!(result.deleted.len(), 3);
    assert!(!ctx.exists("Lamp", &lamp).await);
}

#[tokio::test]
async fn test_cascade_depth_limit() {
    let mut ctx = TestContext::with_engine(EngineConfig::default().with_max_cascade_depth(1));
    chain(&mut ctx);

    let h = ctx.put("House", "h", json!({})).await;
    ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.put("Lamp", "l", json!({"room": "r"})).await;

    let err = ctx.db.delete("House", &h).await.unwrap_err();
    assert!(matches!(
        err,
        Error::CascadeDepthExceeded { depth: 2, limit: 1 }
    ));
    assert!(ctx.exists("House", &h).await);
}

#[tokio::test]
async fn test_cascade_cycle_terminates() {
    let mut ctx = TestContext::new();
    ctx.register(ModelDef::new("Node").with_field(reference("next", "Node", true, true)));

    let a = ctx.put("Node", "a", json!({"next": "b"})).await;
    let b = ctx.put("Node", "b", json!({"next": "a"})).await;

    let result = ctx.db.delete("Node", &a).await.unwrap();
    assert_eq!(result.deleted.len(), 2);
    assert!(!ctx.exists("Node", &a).await);
    assert!(!ctx.exists("Node", &b).await);
}

// ============================================================================
// Schema files
// ============================================================================

#[tokio::test]
async fn test_register_schema_bundle() {
    let mut ctx = TestContext::new();
    let bundle = SchemaBundle::from_json(
        r#"{
            "models": [
                {"name": "House", "fields": []},
                {
                    "name": "Room",
                    "fields": [{
                        "name": "house",
                        "field_type": {"scalar": {"reference": {"target": "House"}}},
                        "cascade": true
                    }]
                }
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(ctx.db.register_schema(bundle).unwrap(), 1);

    let h = ctx.put("House", "h", json!({})).await;
    let r = ctx.put("Room", "r", json!({"house": "h"})).await;
    ctx.db.delete("House", &h).await.unwrap();
    assert!(!ctx.exists("Room", &r).await);
}
