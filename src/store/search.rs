//! Query composition and result shaping
//!
//! A `Query` is turned into an engine `SearchRequest`, every hit is annotated
//! with `_score`, `_size` and `_offset`, and joins are expanded afterwards.

use std::time::Duration;

use super::join::{self, JoinTrail};
use super::{DocumentStore, Query, SearchResult, StoreError, StoreResult};
use crate::config::JoinFailureMode;
use crate::document::{Document, OFFSET_FIELD, SCORE_FIELD, SIZE_FIELD};
use crate::engine::{Hit, SearchRequest, SearchResponse};
use crate::observability::{log_event, Event};

impl DocumentStore {
    /// Runs a query and returns the shaped, join-expanded result.
    ///
    /// Zero matches is not an error. Engine failures are. Join failures from
    /// any depth are listed only when this store is in report mode.
    pub fn search(&self, query: &Query) -> StoreResult<SearchResult> {
        let mut result = self.search_within(query, &mut JoinTrail::default())?;
        if self.config().join_failure_mode == JoinFailureMode::Silent {
            result.join_failures.clear();
        }
        Ok(result)
    }

    /// `search` on behalf of a join chain whose ancestors are in `trail`
    pub(crate) fn search_within(
        &self,
        query: &Query,
        trail: &mut JoinTrail,
    ) -> StoreResult<SearchResult> {
        let request = self.compose(query);
        self.metrics().increment_searches();

        let response = match self.engine().run_query(&request) {
            Ok(response) => response,
            Err(e) => {
                self.metrics().increment_search_failures();
                log_event(
                    Event::SearchFailed,
                    &[("collection", self.name()), ("error", e.to_string().as_str())],
                );
                return Err(StoreError::engine(
                    format!("search in '{}' failed", self.name()),
                    e,
                ));
            }
        };

        let mut result = shape(response);
        let totals = result.totals.to_string();
        log_event(
            Event::SearchComplete,
            &[("collection", self.name()), ("totals", totals.as_str())],
        );

        join::resolve(self, query, &mut result, trail);
        Ok(result)
    }

    pub(super) fn compose(&self, query: &Query) -> SearchRequest {
        let size = if query.size < 1 {
            self.config().default_page_size
        } else {
            query.size
        };

        SearchRequest::new(query.expr.clone().unwrap_or_default(), query.offset, size)
            .with_sort(query.sort.clone())
            .with_locations()
    }
}

fn shape(response: SearchResponse) -> SearchResult {
    SearchResult {
        totals: response.total,
        docs: response.hits.into_iter().map(annotate).collect(),
        time: nanos(response.took),
        join_failures: Vec::new(),
    }
}

fn annotate(hit: Hit) -> Document {
    let mut doc = hit.fields;
    doc.insert(SCORE_FIELD, hit.score);
    doc.insert(SIZE_FIELD, hit.size);
    doc.insert(OFFSET_FIELD, hit.rank);
    doc
}

fn nanos(took: Duration) -> u64 {
    u64::try_from(took.as_nanos()).unwrap_or(u64::MAX)
}
