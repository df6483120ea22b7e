//! Hit ordering for the in-memory engine
//!
//! Sort keys follow the usual search-engine convention:
//! - `field` ascending, `-field` descending
//! - `_id` orders by primary key, `_score` by relevance (ascending unless `-_score`)
//!
//! With no keys, hits are ordered by score descending. Ties always fall back
//! to primary key ascending so ordering is deterministic.

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{EngineError, EngineResult};
use super::matcher::field_values;
use crate::document::Document;

/// A parsed sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Id { descending: bool },
    Score { descending: bool },
    Field { path: String, descending: bool },
}

impl SortKey {
    /// Parses `"name"`, `"-name"`, `"_id"`, `"-_score"` and friends
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        if name.is_empty() {
            return Err(EngineError::InvalidQuery(format!("empty sort key {:?}", raw)));
        }
        Ok(match name {
            "_id" => SortKey::Id { descending },
            "_score" => SortKey::Score { descending },
            path => SortKey::Field {
                path: path.to_string(),
                descending,
            },
        })
    }
}

/// One matched document awaiting ordering
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub doc: &'a Document,
    pub score: f64,
}

/// Orders candidates in place
pub fn sort(candidates: &mut [Candidate<'_>], keys: &[SortKey]) {
    candidates.sort_by(|a, b| {
        let ordering = if keys.is_empty() {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
        } else {
            keys.iter()
                .map(|key| compare_by(key, a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        };
        ordering.then_with(|| a.id.cmp(b.id))
    });
}

fn compare_by(key: &SortKey, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let (ordering, descending) = match key {
        SortKey::Id { descending } => (a.id.cmp(b.id), *descending),
        SortKey::Score { descending } => (
            a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
            *descending,
        ),
        SortKey::Field { path, descending } => (
            compare_values(
                field_values(a.doc, path).first().copied(),
                field_values(b.doc, path).first().copied(),
            ),
            *descending,
        ),
    };
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

/// Missing < null < bool < number < string; arrays and objects compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<(String, Document)> {
        vec![
            ("c".into(), Document::from_value(json!({"age": 30, "name": "carol"})).unwrap()),
            ("a".into(), Document::from_value(json!({"age": 20, "name": "alice"})).unwrap()),
            ("b".into(), Document::from_value(json!({"name": "bob"})).unwrap()),
        ]
    }

    fn order(keys: &[&str], scores: [f64; 3]) -> Vec<String> {
        let store = docs();
        let mut candidates: Vec<Candidate<'_>> = store
            .iter()
            .zip(scores)
            .map(|((id, doc), score)| Candidate { id, doc, score })
            .collect();
        let keys: Vec<SortKey> = keys.iter().map(|k| SortKey::parse(k).unwrap()).collect();
        sort(&mut candidates, &keys);
        candidates.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(SortKey::parse("-_score").unwrap(), SortKey::Score { descending: true });
        assert_eq!(SortKey::parse("_id").unwrap(), SortKey::Id { descending: false });
        assert_eq!(
            SortKey::parse("+age").unwrap(),
            SortKey::Field { path: "age".into(), descending: false }
        );
        assert!(SortKey::parse("-").is_err());
        assert!(SortKey::parse("").is_err());
    }

    #[test]
    fn test_default_is_score_desc_then_id() {
        assert_eq!(order(&[], [1.0, 1.0, 2.0]), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_field_ascending_missing_first() {
        assert_eq!(order(&["age"], [1.0; 3]), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_field_descending() {
        assert_eq!(order(&["-name"], [1.0; 3]), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_multiple_keys() {
        assert_eq!(order(&["_score", "-_id"], [2.0, 1.0, 1.0]), vec!["b", "a", "c"]);
    }
}
