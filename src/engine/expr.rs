//! Query expressions understood by search engines
//!
//! The store never inspects expressions beyond building ID lookups and
//! conjunctions; everything else is passed through to the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A boolean/text/ID predicate over documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryExpr {
    /// Every document
    #[default]
    MatchAll,
    /// No document
    MatchNone,
    /// Documents whose primary key is one of `ids`
    Ids { ids: Vec<String> },
    /// Exact value equality on a field
    Term { field: String, value: Value },
    /// Full-text match; any field when `field` is absent
    Match {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        text: String,
    },
    /// String prefix on a field
    Prefix { field: String, prefix: String },
    /// Bounded numeric or string range on a field
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<Value>,
    },
    /// All sub-expressions must match
    Conjunction { exprs: Vec<QueryExpr> },
    /// At least one sub-expression must match
    Disjunction { exprs: Vec<QueryExpr> },
    /// The sub-expression must not match
    Not { expr: Box<QueryExpr> },
}

impl QueryExpr {
    /// Exact primary key lookup
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryExpr::Ids {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction of expressions
    pub fn conjunction(exprs: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::Conjunction {
            exprs: exprs.into_iter().collect(),
        }
    }

    pub fn disjunction(exprs: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::Disjunction {
            exprs: exprs.into_iter().collect(),
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        QueryExpr::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn text(field: Option<&str>, text: impl Into<String>) -> Self {
        QueryExpr::Match {
            field: field.map(str::to_string),
            text: text.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        QueryExpr::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Inclusive range; either bound may be omitted
    pub fn between(field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        QueryExpr::Range {
            field: field.into(),
            gt: None,
            gte,
            lt: None,
            lte,
        }
    }

    pub fn negate(expr: QueryExpr) -> Self {
        QueryExpr::Not {
            expr: Box::new(expr),
        }
    }
}
