//! Document Store Tests
//!
//! Tests for write and read semantics:
//! - Fresh ids and timestamps on first write
//! - Merge preserves, overwrites and recurses
//! - Get / Delete / NotFound
//! - Serialized writes keep concurrent patches

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use searchdoc::document::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use searchdoc::{Document, DocumentStore, MemoryEngine, StoreConfig, StoreErrorCode};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

fn store() -> DocumentStore {
    DocumentStore::new("items", Arc::new(MemoryEngine::new()))
}

// =============================================================================
// Put Tests
// =============================================================================

/// Documents without an id receive distinct ids.
#[test]
fn test_fresh_ids_are_unique() {
    let store = store();
    let mut ids = HashSet::new();
    for _ in 0..50 {
        let out = store.put(doc(json!({"name": "a"}))).unwrap();
        assert!(ids.insert(out.id().unwrap().to_string()));
    }
}

/// Put name "a", then name "b" on the same id.
#[test]
fn test_update_scenario() {
    let store = store();
    let first = store.put(doc(json!({"name": "a"}))).unwrap();
    let id1 = first.id().unwrap().to_string();
    assert_eq!(
        first.timestamp(CREATED_AT_FIELD),
        first.timestamp(UPDATED_AT_FIELD)
    );

    store.put(doc(json!({"id": &id1, "name": "b"}))).unwrap();

    let got = store.get(&id1).unwrap();
    assert_eq!(got["name"], "b");
    assert_eq!(
        got.timestamp(CREATED_AT_FIELD),
        first.timestamp(CREATED_AT_FIELD)
    );
    assert!(got.timestamp(UPDATED_AT_FIELD) > first.timestamp(UPDATED_AT_FIELD));
}

/// Nested objects merge; arrays are replaced, not concatenated.
#[test]
fn test_deep_merge_rules() {
    let store = store();
    store
        .put(doc(json!({
            "id": "u1",
            "profile": {"city": "Oslo", "langs": ["no", "en"]},
            "score": 1
        })))
        .unwrap();

    let out = store
        .put(doc(json!({"id": "u1", "profile": {"langs": ["de"], "age": 40}})))
        .unwrap();

    assert_eq!(
        out["profile"],
        json!({"city": "Oslo", "langs": ["de"], "age": 40})
    );
    assert_eq!(out["score"], 1);
}

/// updated_at keeps advancing across rapid writes.
#[test]
fn test_updated_at_strictly_advances() {
    let store = store();
    let mut last = store
        .put(doc(json!({"id": "k"})))
        .unwrap()
        .timestamp(UPDATED_AT_FIELD)
        .unwrap();
    for i in 0..20 {
        let out = store.put(doc(json!({"id": "k", "i": i}))).unwrap();
        let updated = out.timestamp(UPDATED_AT_FIELD).unwrap();
        assert!(updated > last);
        assert!(updated >= out.timestamp(CREATED_AT_FIELD).unwrap());
        last = updated;
    }
}

/// Non-string ids are rejected without writing anything.
#[test]
fn test_invalid_id_rejected() {
    let store = store();
    for bad in [json!(1), json!(true), json!(["a"]), json!({"k": "v"})] {
        let err = store.put(doc(json!({"id": bad}))).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::InvalidArgument);
    }
    assert_eq!(store.metrics().snapshot().puts, 0);
}

// =============================================================================
// Get / Delete Tests
// =============================================================================

#[test]
fn test_get_never_written() {
    let err = store().get("nope").unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::NotFound);
}

#[test]
fn test_delete_then_get() {
    let store = store();
    store.put(doc(json!({"id": "gone"}))).unwrap();
    store.delete("gone");
    assert!(store.get("gone").unwrap_err().is_not_found());

    // Deleting again, or something never written, is fine
    store.delete("gone");
    store.delete("never");
}

/// A deleted id starts over.
#[test]
fn test_put_after_delete_is_fresh() {
    let store = store();
    store.put(doc(json!({"id": "x", "old": true}))).unwrap();
    store.delete("x");
    let out = store.put(doc(json!({"id": "x", "new": true}))).unwrap();
    assert!(!out.contains("old"));
    assert_eq!(out["new"], true);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// With serialized writes, concurrent patches on one id all survive.
#[test]
fn test_serialized_writes_keep_every_field() {
    let config = StoreConfig {
        serialize_writes: true,
        write_lock_stripes: 4,
        ..StoreConfig::default()
    };
    let store = DocumentStore::builder("items", Arc::new(MemoryEngine::new()))
        .config(config)
        .build();
    store.put(doc(json!({"id": "shared"}))).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let mut patch = Document::new();
                    patch.insert("id", "shared");
                    patch.insert(format!("f{}_{}", t, i), i);
                    store.put(patch).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let out = store.get("shared").unwrap();
    for t in 0..8 {
        for i in 0..10 {
            assert!(out.contains(&format!("f{}_{}", t, i)));
        }
    }
}
