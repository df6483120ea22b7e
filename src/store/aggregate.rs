//! count / sum / avg over the full result set of a query
//!
//! Aggregation degrades instead of failing: an unknown function or an engine
//! error yields 0. `aggregate_detailed` exposes what was suppressed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DocumentStore, Query};
use crate::observability::{log_event, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
}

impl AggregateFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
        }
    }
}

impl FromStr for AggregateFn {
    type Err = String;

    /// Case-insensitive
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFn::Count),
            "sum" => Ok(AggregateFn::Sum),
            "avg" => Ok(AggregateFn::Avg),
            _ => Err(format!("unknown aggregate function '{}'", name)),
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    /// None when the function name was not recognized
    pub function: Option<AggregateFn>,
    pub value: f64,
    /// Documents matching the query
    pub matched: u64,
    /// Documents whose field held a number
    pub contributed: u64,
    /// Scanned documents without a numeric value
    pub skipped: u64,
    /// Error that forced the value to 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentStore {
    /// Aggregates `field` over every document matching `query`.
    ///
    /// Returns 0 for unknown functions, empty results and engine failures.
    pub fn aggregate(&self, query: &Query, field: &str, function: &str) -> f64 {
        self.aggregate_detailed(query, field, function).value
    }

    /// `aggregate` with match counts and the suppressed error, if any
    pub fn aggregate_detailed(&self, query: &Query, field: &str, function: &str) -> Aggregation {
        self.metrics().increment_aggregations();

        let function = match function.parse::<AggregateFn>() {
            Ok(function) => function,
            Err(reason) => return self.degraded(None, 0, field, reason),
        };

        let count_query = Query {
            offset: 0,
            size: 1,
            joins: Vec::new(),
            ..query.clone()
        };
        let matched = match self.search(&count_query) {
            Ok(result) => result.totals,
            Err(e) => return self.degraded(Some(function), 0, field, e.to_string()),
        };

        let mut aggregation = Aggregation {
            function: Some(function),
            matched,
            ..Aggregation::default()
        };

        if matched > 0 {
            match function {
                AggregateFn::Count => {
                    aggregation.value = matched as f64;
                    aggregation.contributed = matched;
                }
                AggregateFn::Sum | AggregateFn::Avg => {
                    let (sum, contributed, skipped) = match self.scan(query, field) {
                        Ok(totals) => totals,
                        Err(reason) => {
                            return self.degraded(Some(function), matched, field, reason)
                        }
                    };
                    aggregation.contributed = contributed;
                    aggregation.skipped = skipped;
                    aggregation.value = if function == AggregateFn::Avg {
                        sum / matched as f64
                    } else {
                        sum
                    };
                    self.metrics().add_aggregate_values_skipped(skipped);
                }
            }
        }

        let value = aggregation.value.to_string();
        log_event(
            Event::AggregateComplete,
            &[
                ("collection", self.name()),
                ("field", field),
                ("function", function.as_str()),
                ("value", value.as_str()),
            ],
        );
        aggregation
    }

    /// Sums the numeric values of `field` in one unpaginated page.
    /// Returns (sum, contributing docs, skipped docs).
    fn scan(&self, query: &Query, field: &str) -> Result<(f64, u64, u64), String> {
        let scan = Query {
            offset: 0,
            size: self.config().aggregate_scan_size,
            joins: Vec::new(),
            ..query.clone()
        };
        let request = self.compose(&scan).with_fields(vec![field.to_string()]);

        self.metrics().increment_searches();
        let response = self.engine().run_query(&request).map_err(|e| {
            self.metrics().increment_search_failures();
            e.to_string()
        })?;

        let mut sum = 0.0;
        let mut contributed = 0;
        let mut skipped = 0;
        for hit in &response.hits {
            match hit.fields.get(field).and_then(|v| v.as_f64()) {
                Some(n) => {
                    sum += n;
                    contributed += 1;
                }
                None => skipped += 1,
            }
        }
        Ok((sum, contributed, skipped))
    }

    fn degraded(
        &self,
        function: Option<AggregateFn>,
        matched: u64,
        field: &str,
        reason: String,
    ) -> Aggregation {
        log_event(
            Event::AggregateDegraded,
            &[
                ("collection", self.name()),
                ("field", field),
                ("reason", reason.as_str()),
            ],
        );
        Aggregation {
            function,
            matched,
            error: Some(reason),
            ..Aggregation::default()
        }
    }
}
