//! Query building for the tantivy engine
//!
//! Translates a `QueryExpr` into a tantivy query:
//! - `ids` and `term` become term sets on `_id` and `_exact`
//! - `match` becomes a disjunction of analyzed terms on `_text` or `_all`
//! - boolean expressions become `BooleanQuery`s
//! - `prefix` and `range` are evaluated on stored sources and become an id set

use std::collections::BTreeMap;

use serde_json::Value;
use tantivy::collector::DocSetCollector;
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, TermQuery, TermSetQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::{Searcher, Term};

use super::errors::EngineResult;
use super::expr::QueryExpr;
use super::matcher::{evaluate, field_values};
use super::schema::{read_stored, string_leaves, DocumentFields, StoredDoc};
use crate::document::Document;

/// The analyzed terms of one `match` expression
#[derive(Debug)]
struct TextClause {
    path: Option<String>,
    tokens: Vec<String>,
}

/// Query builder for constructing tantivy queries from expressions
pub(super) struct QueryBuilder<'a> {
    searcher: &'a Searcher,
    fields: DocumentFields,
    analyzer: TextAnalyzer,
    stored: Option<Vec<StoredDoc>>,
    text_clauses: Vec<TextClause>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(searcher: &'a Searcher, fields: DocumentFields, analyzer: TextAnalyzer) -> Self {
        Self {
            searcher,
            fields,
            analyzer,
            stored: None,
            text_clauses: Vec::new(),
        }
    }

    /// Build a tantivy query from an expression
    pub fn build(&mut self, expr: &QueryExpr) -> EngineResult<Box<dyn Query>> {
        let query: Box<dyn Query> = match expr {
            QueryExpr::MatchAll => Box::new(AllQuery),
            QueryExpr::MatchNone => Box::new(EmptyQuery),
            QueryExpr::Ids { ids } => {
                let terms = ids
                    .iter()
                    .map(|id| Term::from_field_text(self.fields.id, id))
                    .collect();
                term_set(terms)
            }
            QueryExpr::Term { field, value } => {
                term_set(exact_terms(self.fields.exact, field, value))
            }
            QueryExpr::Match { field, text } => self.text_query(field.as_deref(), text),
            QueryExpr::Prefix { .. } | QueryExpr::Range { .. } => self.filtered(expr)?,
            QueryExpr::Conjunction { exprs } => {
                if exprs.is_empty() {
                    return Ok(Box::new(AllQuery));
                }
                let mut clauses = Vec::with_capacity(exprs.len());
                for sub in exprs {
                    clauses.push((Occur::Must, self.build(sub)?));
                }
                Box::new(BooleanQuery::new(clauses))
            }
            QueryExpr::Disjunction { exprs } => {
                if exprs.is_empty() {
                    return Ok(Box::new(EmptyQuery));
                }
                let mut clauses = Vec::with_capacity(exprs.len());
                for sub in exprs {
                    clauses.push((Occur::Should, self.build(sub)?));
                }
                Box::new(BooleanQuery::new(clauses))
            }
            QueryExpr::Not { expr } => {
                let excluded = self.build(expr)?;
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, excluded),
                ]))
            }
        };
        Ok(query)
    }

    /// Terms of every `match` expression found in `doc`, keyed by field
    pub fn locations(&mut self, doc: &Document) -> BTreeMap<String, Vec<String>> {
        let clauses = std::mem::take(&mut self.text_clauses);
        let mut locations: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for clause in &clauses {
            let candidates: Vec<(&str, &str)> = match &clause.path {
                Some(path) => field_values(doc, path)
                    .into_iter()
                    .filter_map(Value::as_str)
                    .map(|text| (path.as_str(), text))
                    .collect(),
                None => {
                    let mut leaves = Vec::new();
                    for (name, value) in doc.fields() {
                        string_leaves(name, value, &mut leaves);
                    }
                    leaves
                }
            };

            for (name, text) in candidates {
                let present = self.tokens(text);
                for token in clause.tokens.iter().filter(|t| present.contains(t)) {
                    let found = locations.entry(name.to_string()).or_default();
                    if !found.contains(token) {
                        found.push(token.clone());
                    }
                }
            }
        }

        self.text_clauses = clauses;
        locations
    }

    fn text_query(&mut self, path: Option<&str>, text: &str) -> Box<dyn Query> {
        let tokens = self.tokens(text);

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let term = match path {
                Some(path) => {
                    let mut term = Term::from_field_json_path(self.fields.text, path, false);
                    term.append_type_and_str(token);
                    term
                }
                None => Term::from_field_text(self.fields.all, token),
            };
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>,
            ));
        }

        self.text_clauses.push(TextClause {
            path: path.map(str::to_string),
            tokens,
        });

        if clauses.is_empty() {
            Box::new(EmptyQuery)
        } else {
            Box::new(BooleanQuery::new(clauses))
        }
    }

    /// Distinct analyzed tokens of `text`
    fn tokens(&mut self, text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut stream = self.analyzer.token_stream(text);
        while stream.advance() {
            let token = &stream.token().text;
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }

    /// Ids of the stored documents satisfying `expr`
    fn filtered(&mut self, expr: &QueryExpr) -> EngineResult<Box<dyn Query>> {
        let id_field = self.fields.id;
        let terms = self
            .stored()?
            .iter()
            .filter(|stored| evaluate(expr, &stored.id, &stored.doc).is_some())
            .map(|stored| Term::from_field_text(id_field, &stored.id))
            .collect();
        Ok(term_set(terms))
    }

    fn stored(&mut self) -> EngineResult<&[StoredDoc]> {
        if self.stored.is_none() {
            let addresses = self.searcher.search(&AllQuery, &DocSetCollector)?;
            let mut docs = Vec::with_capacity(addresses.len());
            for address in addresses {
                docs.push(read_stored(self.searcher, &self.fields, address)?);
            }
            self.stored = Some(docs);
        }
        Ok(self.stored.as_deref().unwrap_or_default())
    }
}

fn term_set(terms: Vec<Term>) -> Box<dyn Query> {
    if terms.is_empty() {
        Box::new(EmptyQuery)
    } else {
        Box::new(TermSetQuery::new(terms))
    }
}

/// Every typed term a JSON value may have been indexed under
fn exact_terms(field: Field, path: &str, value: &Value) -> Vec<Term> {
    let term = || Term::from_field_json_path(field, path, false);
    let mut terms = Vec::new();

    match value {
        Value::String(text) => {
            let mut t = term();
            t.append_type_and_str(text);
            terms.push(t);
        }
        Value::Bool(flag) => {
            let mut t = term();
            t.append_type_and_fast_value(*flag);
            terms.push(t);
        }
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                let mut t = term();
                t.append_type_and_fast_value(int);
                terms.push(t);
            } else if let Some(unsigned) = number.as_u64() {
                let mut t = term();
                t.append_type_and_fast_value(unsigned);
                terms.push(t);
            }
            if let Some(float) = number.as_f64() {
                let mut t = term();
                t.append_type_and_fast_value(float);
                terms.push(t);

                // 5.0 may be stored as the integer 5
                if number.as_i64().is_none()
                    && float.fract() == 0.0
                    && float >= i64::MIN as f64
                    && float <= i64::MAX as f64
                {
                    let mut t = term();
                    t.append_type_and_fast_value(float as i64);
                    terms.push(t);
                }
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => {}
    }
    terms
}
