//! Request dispatch
//!
//! ```text
//! {"op":"put","collection":"users","data":{"name":"ada"}}
//! {"op":"get","collection":"users","id":"..."}
//! {"op":"delete","collection":"users","id":"..."}
//! {"op":"search","collection":"posts","query":{"join":[{"from":"users","on":"author","as":"authors"}]}}
//! {"op":"aggregate","collection":"posts","query":{},"field":"likes","fn":"avg"}
//! {"op":"stats"}
//! ```

use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use super::io::{error_response, ok_response};
use crate::catalog::Catalog;
use crate::document::Document;
use crate::observability::{log_event, Event};
use crate::store::Query;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Put {
        collection: String,
        data: Document,
    },
    Get {
        collection: String,
        id: String,
    },
    Delete {
        collection: String,
        id: String,
    },
    Search {
        collection: String,
        #[serde(default)]
        query: Query,
    },
    Aggregate {
        collection: String,
        #[serde(default)]
        query: Query,
        field: String,
        #[serde(rename = "fn")]
        function: String,
    },
    Stats,
}

impl Request {
    fn op(&self) -> &'static str {
        match self {
            Request::Put { .. } => "put",
            Request::Get { .. } => "get",
            Request::Delete { .. } => "delete",
            Request::Search { .. } => "search",
            Request::Aggregate { .. } => "aggregate",
            Request::Stats => "stats",
        }
    }
}

/// Executes one request against the catalog and returns its `data` payload
pub fn handle_request(catalog: &Catalog, request: Request) -> CliResult<Value> {
    match request {
        Request::Put { collection, data } => {
            let doc = catalog.store(&collection)?.put(data)?;
            Ok(doc.into_value())
        }
        Request::Get { collection, id } => {
            let doc = catalog.store(&collection)?.get(&id)?;
            Ok(doc.into_value())
        }
        Request::Delete { collection, id } => {
            catalog.store(&collection)?.delete(&id);
            Ok(json!({"deleted": id}))
        }
        Request::Search {
            collection,
            mut query,
        } => {
            let store = catalog.store(&collection)?;
            catalog.bind(&mut query)?;
            Ok(serde_json::to_value(store.search(&query)?)?)
        }
        Request::Aggregate {
            collection,
            query,
            field,
            function,
        } => {
            let store = catalog.store(&collection)?;
            Ok(serde_json::to_value(
                store.aggregate_detailed(&query, &field, &function),
            )?)
        }
        Request::Stats => Ok(json!({
            "collections": catalog.names(),
            "metrics": catalog.metrics().snapshot(),
        })),
    }
}

/// Parses and executes one request line, always producing a response object
pub fn handle_line(catalog: &Catalog, line: &str) -> Value {
    let outcome = serde_json::from_str::<Request>(line)
        .map_err(|e| CliError::bad_request(e.to_string()))
        .and_then(|request| {
            let op = request.op();
            handle_request(catalog, request).map_err(|e| {
                log_event(
                    Event::RequestFailed,
                    &[("op", op), ("code", e.code_str()), ("message", e.message())],
                );
                e
            })
        });

    match outcome {
        Ok(data) => ok_response(data),
        Err(e) => error_response(e.code_str(), e.message()),
    }
}
