//! Render deduplication switched off.
//!
//! The engine configuration is process-wide, so this lives in its own test
//! binary with a single test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lattice_computed::{
    create_class_computed, json, runloop, EngineConfig, ObjectClass, RenderIntrospection, Value,
};

struct RendersEverything;

impl RenderIntrospection for RendersEverything {
    fn already_rendered(&self, _key: &str) -> bool {
        true
    }
}

/// Test that with render deduplication disabled, a refresh is announced even
/// when the render layer already captured the property.
#[test]
fn refresh_is_announced_when_dedup_is_disabled() {
    let config = EngineConfig::from_json(r#"{ "render_dedup": false }"#).unwrap();
    EngineConfig::install(config);
    assert!(!EngineConfig::current().render_dedup);

    let sum = create_class_computed([false], |values: &[Value]| {
        json!(values.iter().filter_map(Value::as_i64).sum::<i64>())
    });
    let class = ObjectClass::builder("Rendered")
        .computed("total", sum.define(["y"]))
        .build();
    let object = class.create(json!({ "y": 0 }));
    object.set_render_introspection(Arc::new(RendersEverything));
    assert_eq!(object.get("total"), json!(0));

    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    object.add_observer(["total"], move |_, _| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });

    runloop::run(|| object.set("y", json!(3)).unwrap()).unwrap();

    // the write's own pass, then the refresh the render layer did not suppress
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(object.get("total"), json!(3));
}
