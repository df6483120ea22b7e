//! Join resolution
//!
//! Every join replaces the foreign key under `on` with the documents it
//! points at, stored under `as`. The parent query's joins travel into each
//! sub-query, so chains resolve recursively.
//!
//! A join that cannot be applied never fails the parent search. The document
//! keeps its `on` field and the failure is logged, counted and collected on
//! the result, nested failures included. Whether the caller gets to see them
//! is decided once, by the join failure mode of the store the search started
//! on.
//!
//! Recursion is bounded twice: a trail of the documents currently being
//! expanded catches keys pointing back at an ancestor, and `max_join_depth`
//! caps nesting.

use serde_json::Value;

use super::{DocumentStore, Join, JoinFailure, JoinFailureReason, Query, SearchResult};
use crate::document::Document;
use crate::engine::QueryExpr;
use crate::observability::{log_event, Event};

/// Documents currently being expanded, outermost first
#[derive(Debug, Default)]
pub(crate) struct JoinTrail {
    path: Vec<(String, Option<String>)>,
}

impl JoinTrail {
    fn push(&mut self, collection: &str, id: Option<&str>) {
        self.path
            .push((collection.to_string(), id.map(str::to_string)));
    }

    fn pop(&mut self) {
        self.path.pop();
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.path
            .iter()
            .any(|(c, i)| c == collection && i.as_deref() == Some(id))
    }

    fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Expands `query.joins` on every document of `result`
pub(crate) fn resolve(
    store: &DocumentStore,
    query: &Query,
    result: &mut SearchResult,
    trail: &mut JoinTrail,
) {
    if query.joins.is_empty() {
        return;
    }

    for doc in result.docs.iter_mut() {
        trail.push(store.name(), doc.id());
        for join in &query.joins {
            if let Err(reason) = apply(store, query, join, doc, trail, &mut result.join_failures)
            {
                let failure = JoinFailure {
                    collection: store.name().to_string(),
                    document_id: doc.id().map(str::to_string),
                    on: join.on.clone(),
                    as_: join.as_.clone(),
                    reason,
                };
                report(store, failure, &mut result.join_failures);
            }
        }
        trail.pop();
    }
}

fn apply(
    store: &DocumentStore,
    parent: &Query,
    join: &Join,
    doc: &mut Document,
    trail: &mut JoinTrail,
    failures: &mut Vec<JoinFailure>,
) -> Result<(), JoinFailureReason> {
    if join.on.is_empty() || join.as_.is_empty() {
        return Ok(());
    }

    let keys = match doc.get(&join.on) {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => foreign_keys(value).ok_or(JoinFailureReason::InvalidForeignKey)?,
    };

    let target = target_of(store, join)?;
    if let Some(key) = keys.iter().find(|key| trail.contains(target.name(), key)) {
        return Err(JoinFailureReason::Cycle(key.clone()));
    }

    let max_depth = store.config().max_join_depth;
    if trail.depth() > max_depth {
        return Err(JoinFailureReason::DepthExceeded(max_depth));
    }

    let sub = sub_query(parent, join, &keys);
    let joined = target
        .search_within(&sub, trail)
        .map_err(|e| JoinFailureReason::Engine(e.to_string()))?;

    failures.extend(joined.join_failures);
    doc.remove(&join.on);
    doc.insert(
        join.as_.clone(),
        Value::Array(joined.docs.into_iter().map(Document::into_value).collect()),
    );
    store.metrics().increment_joins_resolved();
    Ok(())
}

/// A string is one key, an array of strings many; anything else is invalid
fn foreign_keys(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(key) => Some(vec![key.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn target_of(store: &DocumentStore, join: &Join) -> Result<DocumentStore, JoinFailureReason> {
    match (&join.source, &join.from) {
        (Some(source), _) => Ok(source.clone()),
        (None, Some(name)) if name != store.name() => {
            Err(JoinFailureReason::UnboundSource(name.clone()))
        }
        (None, _) => Ok(store.clone()),
    }
}

/// Template of the join narrowed to `keys`, carrying the parent's joins
fn sub_query(parent: &Query, join: &Join, keys: &[String]) -> Query {
    let mut sub = join.where_.as_deref().cloned().unwrap_or_default();

    let by_id = QueryExpr::ids(keys.iter().cloned());
    sub.expr = Some(match sub.expr.take() {
        Some(template) => QueryExpr::conjunction([template, by_id]),
        None => by_id,
    });

    // An id match can never return more documents than keys
    if sub.size < 1 {
        sub.size = keys.len().max(1);
    }
    sub.joins = parent.joins.clone();
    sub
}

fn report(store: &DocumentStore, failure: JoinFailure, failures: &mut Vec<JoinFailure>) {
    store.metrics().increment_joins_failed();

    let reason = failure.reason.to_string();
    log_event(
        Event::JoinFailed,
        &[
            ("collection", failure.collection.as_str()),
            ("id", failure.document_id.as_deref().unwrap_or("")),
            ("on", failure.on.as_str()),
            ("reason", reason.as_str()),
        ],
    );

    failures.push(failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::config::{JoinFailureMode, StoreConfig};
    use crate::engine::MemoryEngine;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn store_with(name: &str, config: StoreConfig) -> DocumentStore {
        DocumentStore::builder(name, Arc::new(MemoryEngine::new()))
            .config(config)
            .build()
    }

    fn store(name: &str) -> DocumentStore {
        store_with(name, StoreConfig::default())
    }

    #[test]
    fn test_trail() {
        let mut trail = JoinTrail::default();
        trail.push("a", Some("1"));
        trail.push("b", None);
        assert_eq!(trail.depth(), 2);
        assert!(trail.contains("a", "1"));
        assert!(!trail.contains("b", "1"));
        trail.pop();
        trail.pop();
        assert_eq!(trail.depth(), 0);
    }

    #[test]
    fn test_foreign_keys() {
        assert_eq!(foreign_keys(&json!("k")), Some(vec!["k".to_string()]));
        assert_eq!(
            foreign_keys(&json!(["a", "b"])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(foreign_keys(&json!(["a", 1])), None);
        assert_eq!(foreign_keys(&json!(7)), None);
        assert_eq!(foreign_keys(&json!({"id": "k"})), None);
    }

    #[test]
    fn test_sub_query_conjoins_template() {
        let parent = Query::all().join(Join::new("author", "authors"));
        let join = Join::new("author", "authors")
            .where_query(Query::new(QueryExpr::term("active", true)).size(5));

        let sub = sub_query(&parent, &join, &["u1".to_string()]);
        assert_eq!(
            sub.expr,
            Some(QueryExpr::conjunction([
                QueryExpr::term("active", true),
                QueryExpr::ids(["u1"]),
            ]))
        );
        assert_eq!(sub.size, 5);
        assert_eq!(sub.joins.len(), 1);
    }

    #[test]
    fn test_sub_query_without_template() {
        let join = Join::new("tags", "tag_docs");
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let sub = sub_query(&Query::all(), &join, &keys);
        assert_eq!(sub.expr, Some(QueryExpr::ids(["a", "b", "c"])));
        assert_eq!(sub.size, 3);
        assert!(sub.joins.is_empty());
    }

    #[test]
    fn test_parent_child_join() {
        let parents = store("parents");
        let children = store("children");
        children.put(doc(json!({"id": "c1", "name": "kid"}))).unwrap();
        parents
            .put(doc(json!({"id": "p1", "child": "c1"})))
            .unwrap();

        let query = Query::all().join(Join::new("child", "children").source(&children));
        let result = parents.search(&query).unwrap();

        let p = &result.docs[0];
        assert!(!p.contains("child"));
        let embedded = p.get("children").unwrap().as_array().unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0]["name"], "kid");
        assert!(result.join_failures.is_empty());
        assert_eq!(parents.metrics().snapshot().joins_resolved, 1);
    }

    #[test]
    fn test_missing_or_null_key_is_skipped() {
        let items = store("items");
        items.put(doc(json!({"id": "a"}))).unwrap();
        items.put(doc(json!({"id": "b", "parent": null}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("parent", "parents")))
            .unwrap();
        for d in &result.docs {
            assert!(!d.contains("parents"));
        }
        assert!(result.join_failures.is_empty());
    }

    #[test]
    fn test_empty_on_or_as_is_skipped() {
        let items = store("items");
        items.put(doc(json!({"id": "a", "next": "a"}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("", "x")).join(Join::new("next", "")))
            .unwrap();
        assert_eq!(result.docs[0].get("next"), Some(&json!("a")));
        assert!(result.join_failures.is_empty());
    }

    #[test]
    fn test_invalid_foreign_key_leaves_doc() {
        let items = store("items");
        items.put(doc(json!({"id": "a", "next": 12}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("next", "nexts")))
            .unwrap();
        assert_eq!(result.docs[0].get("next"), Some(&json!(12)));
        assert!(!result.docs[0].contains("nexts"));
        assert_eq!(result.join_failures.len(), 1);
        assert_eq!(
            result.join_failures[0].reason,
            JoinFailureReason::InvalidForeignKey
        );
        assert_eq!(items.metrics().snapshot().joins_failed, 1);
    }

    #[test]
    fn test_self_cycle_detected() {
        let items = store("items");
        items.put(doc(json!({"id": "a", "next": "a"}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("next", "nexts")))
            .unwrap();
        assert_eq!(result.docs[0].get("next"), Some(&json!("a")));
        assert_eq!(
            result.join_failures[0].reason,
            JoinFailureReason::Cycle("a".into())
        );
    }

    #[test]
    fn test_two_step_cycle_bubbles_up() {
        let items = store("items");
        items.put(doc(json!({"id": "a", "next": "b"}))).unwrap();
        items.put(doc(json!({"id": "b", "next": "a"}))).unwrap();

        let query = Query::new(QueryExpr::ids(["a"])).join(Join::new("next", "nexts"));
        let result = items.search(&query).unwrap();

        let a = &result.docs[0];
        let nexts = a.get("nexts").unwrap().as_array().unwrap();
        assert_eq!(nexts[0]["id"], "b");
        assert_eq!(nexts[0]["next"], "a");

        assert_eq!(result.join_failures.len(), 1);
        let failure = &result.join_failures[0];
        assert_eq!(failure.document_id.as_deref(), Some("b"));
        assert_eq!(failure.reason, JoinFailureReason::Cycle("a".into()));
    }

    #[test]
    fn test_depth_guard() {
        let config = StoreConfig {
            max_join_depth: 2,
            ..StoreConfig::default()
        };
        let items = store_with("items", config);
        for (id, next) in [("n0", "n1"), ("n1", "n2"), ("n2", "n3"), ("n3", "n4")] {
            items.put(doc(json!({"id": id, "next": next}))).unwrap();
        }

        let query = Query::new(QueryExpr::ids(["n0"])).join(Join::new("next", "nexts"));
        let result = items.search(&query).unwrap();

        let n1 = &result.docs[0]["nexts"][0];
        assert_eq!(n1["id"], "n1");
        let n2 = &n1["nexts"][0];
        assert_eq!(n2["id"], "n2");
        assert_eq!(n2["next"], "n3");

        assert_eq!(result.join_failures.len(), 1);
        assert_eq!(
            result.join_failures[0].reason,
            JoinFailureReason::DepthExceeded(2)
        );
    }

    #[test]
    fn test_silent_mode_hides_failures() {
        let config = StoreConfig {
            join_failure_mode: JoinFailureMode::Silent,
            ..StoreConfig::default()
        };
        let items = store_with("items", config);
        items.put(doc(json!({"id": "a", "next": "a"}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("next", "nexts")))
            .unwrap();
        assert!(result.join_failures.is_empty());
        assert_eq!(result.docs[0].get("next"), Some(&json!("a")));
        assert_eq!(items.metrics().snapshot().joins_failed, 1);
    }

    #[test]
    fn test_silent_parent_hides_nested_failures() {
        let silent = StoreConfig {
            join_failure_mode: JoinFailureMode::Silent,
            ..StoreConfig::default()
        };
        let parents = store_with("parents", silent);
        let kids = store("kids");
        kids.put(doc(json!({"id": "c1", "child": 42}))).unwrap();
        parents.put(doc(json!({"id": "p1", "kid": "c1"}))).unwrap();

        let query = Query::all()
            .join(Join::new("kid", "kids").source(&kids))
            .join(Join::new("child", "children").source(&kids));
        let result = parents.search(&query).unwrap();

        assert!(result.join_failures.is_empty());
        assert_eq!(result.docs[0]["kids"][0]["child"], 42);
        assert_eq!(kids.metrics().snapshot().joins_failed, 1);
    }

    #[test]
    fn test_reporting_parent_sees_silent_child_failures() {
        let silent = StoreConfig {
            join_failure_mode: JoinFailureMode::Silent,
            ..StoreConfig::default()
        };
        let parents = store("parents");
        let kids = store_with("kids", silent);
        kids.put(doc(json!({"id": "c1", "child": 42}))).unwrap();
        parents.put(doc(json!({"id": "p1", "kid": "c1"}))).unwrap();

        let query = Query::all()
            .join(Join::new("kid", "kids").source(&kids))
            .join(Join::new("child", "children").source(&kids));
        let result = parents.search(&query).unwrap();

        assert_eq!(result.join_failures.len(), 1);
        let failure = &result.join_failures[0];
        assert_eq!(failure.collection, "kids");
        assert_eq!(failure.document_id.as_deref(), Some("c1"));
        assert_eq!(failure.reason, JoinFailureReason::InvalidForeignKey);
    }

    #[test]
    fn test_unbound_source() {
        let items = store("items");
        items.put(doc(json!({"id": "a", "owner": "u1"}))).unwrap();

        let join = Join::new("owner", "owners").from_collection("users");
        let result = items.search(&Query::all().join(join)).unwrap();
        assert_eq!(
            result.join_failures[0].reason,
            JoinFailureReason::UnboundSource("users".into())
        );
        assert_eq!(result.docs[0].get("owner"), Some(&json!("u1")));
    }

    #[test]
    fn test_missing_target_yields_empty_array() {
        let items = store("items");
        let others = store("others");
        items.put(doc(json!({"id": "a", "ref": "ghost"}))).unwrap();

        let result = items
            .search(&Query::all().join(Join::new("ref", "refs").source(&others)))
            .unwrap();
        assert_eq!(result.docs[0].get("refs"), Some(&json!([])));
        assert!(!result.docs[0].contains("ref"));
    }
}
