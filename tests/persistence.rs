//! Persistence Tests
//!
//! Tests for collections kept in on-disk indexes:
//! - Documents survive reopening a catalog
//! - Deletes survive reopening
//! - Timestamps are preserved across reopen
//! - Full-text search works on a reopened index

use searchdoc::document::CREATED_AT_FIELD;
use searchdoc::{Catalog, Document, Query, QueryExpr, StoreConfig};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let created = {
        let catalog = Catalog::open(dir.path(), StoreConfig::default());
        let users = catalog.store("users").unwrap();
        let out = users.put(doc(json!({"id": "u1", "name": "ada"}))).unwrap();
        users.put(doc(json!({"id": "u2", "name": "bob"}))).unwrap();
        users.delete("u2");
        out.timestamp(CREATED_AT_FIELD)
    };

    let catalog = Catalog::open(dir.path(), StoreConfig::default());
    let users = catalog.store("users").unwrap();

    let u1 = users.get("u1").unwrap();
    assert_eq!(u1["name"], "ada");
    assert_eq!(u1.timestamp(CREATED_AT_FIELD), created);
    assert!(users.get("u2").unwrap_err().is_not_found());
}

#[test]
fn test_merge_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let catalog = Catalog::open(dir.path(), StoreConfig::default());
        catalog
            .store("cfg")
            .unwrap()
            .put(doc(json!({"id": "c", "a": {"x": 1}})))
            .unwrap();
    }

    let catalog = Catalog::open(dir.path(), StoreConfig::default());
    let merged = catalog
        .store("cfg")
        .unwrap()
        .put(doc(json!({"id": "c", "a": {"y": 2}})))
        .unwrap();
    assert_eq!(merged["a"], json!({"x": 1, "y": 2}));
}

#[test]
fn test_corrupt_index_is_engine_error() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("broken");
    std::fs::create_dir_all(&index_dir).unwrap();
    std::fs::write(index_dir.join("meta.json"), "{not json").unwrap();

    let catalog = Catalog::open(dir.path(), StoreConfig::default());
    let err = catalog.store("broken").unwrap_err();
    assert_eq!(err.code().code(), "SEARCHDOC_ENGINE_FAILED");
}

#[test]
fn test_full_text_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let catalog = Catalog::open(dir.path(), StoreConfig::default());
        let books = catalog.store("books").unwrap();
        books.put(doc(json!({"id": "b1", "title": "The Left Hand of Darkness"}))).unwrap();
        books.put(doc(json!({"id": "b2", "title": "The Dispossessed"}))).unwrap();
    }

    let catalog = Catalog::open(dir.path(), StoreConfig::default());
    let result = catalog
        .store("books")
        .unwrap()
        .search(&Query::new(QueryExpr::text(Some("title"), "darkness")))
        .unwrap();
    assert_eq!(result.totals, 1);
    assert_eq!(result.docs[0]["id"], "b1");
}
