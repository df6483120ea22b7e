//! Merge of partial updates onto stored documents

use serde_json::{Map, Value};

use super::Document;

/// Merges `patch` on top of `base`.
///
/// Every field of `patch` overrides the base field. When both sides hold an
/// object the merge descends into it; arrays and scalars are replaced whole.
/// Fields only present in `base` are kept.
pub fn deep_merge(base: Document, patch: Document) -> Document {
    let mut merged = base.into_map();
    merge_maps(&mut merged, patch.into_map());
    Document::from(merged)
}

fn merge_maps(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, incoming) in patch {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_maps(existing, nested);
            }
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}
