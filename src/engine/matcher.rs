//! Expression evaluation over one stored document
//!
//! Backs `MemoryEngine` and the range and prefix filters of `TantivyEngine`.
//! No type coercion: numbers compare with numbers, strings with strings.
//! Every match scores 1.0 and conjunctions add up.

use std::cmp::Ordering;

use serde_json::Value;

use super::expr::QueryExpr;
use crate::document::Document;

/// Evaluates an expression against a document stored under `id`, returning its score
pub(super) fn evaluate(expr: &QueryExpr, id: &str, doc: &Document) -> Option<f64> {
    match expr {
        QueryExpr::MatchAll => Some(1.0),
        QueryExpr::MatchNone => None,
        QueryExpr::Ids { ids } => ids.iter().any(|k| k == id).then_some(1.0),
        QueryExpr::Term { field, value } => field_values(doc, field)
            .into_iter()
            .any(|v| v == value)
            .then_some(1.0),
        QueryExpr::Match { field, text } => contains_words(doc, field.as_deref(), text),
        QueryExpr::Prefix { field, prefix } => {
            let prefix = prefix.to_lowercase();
            field_values(doc, field)
                .into_iter()
                .filter_map(Value::as_str)
                .any(|s| s.to_lowercase().starts_with(&prefix))
                .then_some(1.0)
        }
        QueryExpr::Range {
            field,
            gt,
            gte,
            lt,
            lte,
        } => field_values(doc, field)
            .into_iter()
            .any(|v| {
                bound_ok(v, gt.as_ref(), |o| o == Ordering::Greater)
                    && bound_ok(v, gte.as_ref(), |o| o != Ordering::Less)
                    && bound_ok(v, lt.as_ref(), |o| o == Ordering::Less)
                    && bound_ok(v, lte.as_ref(), |o| o != Ordering::Greater)
            })
            .then_some(1.0),
        QueryExpr::Conjunction { exprs } => {
            if exprs.is_empty() {
                return Some(1.0);
            }
            let mut total = 0.0;
            for sub in exprs {
                total += evaluate(sub, id, doc)?;
            }
            Some(total)
        }
        QueryExpr::Disjunction { exprs } => exprs
            .iter()
            .filter_map(|sub| evaluate(sub, id, doc))
            .fold(None, |total, score| Some(total.unwrap_or(0.0) + score)),
        QueryExpr::Not { expr } => match evaluate(expr, id, doc) {
            Some(_) => None,
            None => Some(1.0),
        },
    }
}

/// Resolves a dotted path to the values it names. Arrays contribute each element.
pub(super) fn field_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut current: Vec<&Value> = Vec::new();
    let mut segments = path.split('.');

    match segments.next().and_then(|first| doc.get(first)) {
        Some(v) => current.push(v),
        None => return Vec::new(),
    }

    for segment in segments {
        let mut next = Vec::new();
        for value in flatten(current) {
            if let Some(child) = value.as_object().and_then(|o| o.get(segment)) {
                next.push(child);
            }
        }
        current = next;
    }

    flatten(current)
}

fn flatten(values: Vec<&Value>) -> Vec<&Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Array(items) => out.extend(items.iter()),
            other => out.push(other),
        }
    }
    out
}

fn bound_ok(actual: &Value, bound: Option<&Value>, accept: impl Fn(Ordering) -> bool) -> bool {
    match bound {
        None => true,
        Some(bound) => compare(actual, bound).map(accept).unwrap_or(false),
    }
}

fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Case-insensitive containment of any word of `text`
fn contains_words(doc: &Document, field: Option<&str>, text: &str) -> Option<f64> {
    let text = text.to_lowercase();
    let words: Vec<&str> = text.split_whitespace().collect();

    let values: Vec<&Value> = match field {
        Some(path) => field_values(doc, path),
        None => doc.fields().flat_map(|(_, v)| flatten(vec![v])).collect(),
    };

    values
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::to_lowercase)
        .any(|value| words.iter().any(|word| value.contains(word)))
        .then_some(1.0)
}
