//! Generic filter/count/sum/find over a named collection.
//!
//! Requests arrive as loose JSON (the tool-call payload shape the agent
//! emits) and are parsed into a closed request enum before evaluation.
//! Every outcome — including validation problems — is a JSON envelope with
//! a `success` flag; nothing here panics or propagates a fault.

use crate::dataset::{CollectionName, Dataset};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// A validated query, one variant per operation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    Find {
        collection: CollectionName,
        filter: Map<String, Value>,
        projection: Option<Map<String, Value>>,
    },
    Count {
        collection: CollectionName,
        filter: Map<String, Value>,
    },
    Sum {
        collection: CollectionName,
        filter: Map<String, Value>,
        field: String,
    },
}

impl QueryRequest {
    /// Parse the raw tool-call payload `{collection, filter?, projection?,
    /// operation?, field?}`. Errors are returned as display-safe strings.
    pub fn parse(raw: &Value) -> Result<Self, String> {
        let collection_str = raw
            .get("collection")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let collection: CollectionName = collection_str
            .parse()
            .map_err(|other| format!("Invalid collection name: {}", other))?;

        let filter = match raw.get("filter") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let projection = match raw.get("projection") {
            Some(Value::Object(map)) => Some(map.clone()),
            _ => None,
        };

        let operation = raw
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("find");

        match operation {
            "find" => Ok(QueryRequest::Find {
                collection,
                filter,
                projection,
            }),
            "count" => Ok(QueryRequest::Count { collection, filter }),
            "sum" => {
                let field = raw
                    .get("field")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| "'field' required for sum operation".to_string())?;
                Ok(QueryRequest::Sum {
                    collection,
                    filter,
                    field,
                })
            }
            other => Err(format!("Unknown operation: {}", other)),
        }
    }

    /// Evaluate against the dataset, producing a success/failure envelope.
    pub fn execute(&self, dataset: &Dataset) -> Value {
        match self {
            QueryRequest::Find {
                collection,
                filter,
                projection,
            } => {
                let matched = filter_records(dataset.collection(*collection), filter);
                if matched.is_empty() {
                    // Empty result is a structured failure, not an empty
                    // success. Deliberate convention; callers depend on it.
                    return json!({ "success": false, "error": "No data found for this query." });
                }
                let data: Vec<Value> = match projection {
                    Some(mask) => matched.iter().map(|r| project(r, mask)).collect(),
                    None => matched.into_iter().cloned().collect(),
                };
                json!({ "success": true, "data": data })
            }
            QueryRequest::Count { collection, filter } => {
                let matched = filter_records(dataset.collection(*collection), filter);
                json!({ "success": true, "count": matched.len() })
            }
            QueryRequest::Sum {
                collection,
                filter,
                field,
            } => {
                let matched = filter_records(dataset.collection(*collection), filter);
                let total: f64 = matched
                    .iter()
                    .filter_map(|r| r.get(field).and_then(Value::as_f64))
                    .sum();
                json!({ "success": true, "sum": number(total) })
            }
        }
    }
}

/// Parse and evaluate a raw payload in one step; parse failures become
/// failure envelopes.
pub fn execute_raw(dataset: &Dataset, raw: &Value) -> Value {
    match QueryRequest::parse(raw) {
        Ok(request) => {
            tracing::debug!(?request, "Executing collection query");
            request.execute(dataset)
        }
        Err(message) => {
            tracing::debug!(%message, "Rejected collection query");
            json!({ "success": false, "error": message })
        }
    }
}

/// Records where every filter condition holds. Missing fields count as
/// non-matches.
fn filter_records<'a>(records: &'a [Value], filter: &Map<String, Value>) -> Vec<&'a Value> {
    records
        .iter()
        .filter(|record| {
            filter
                .iter()
                .all(|(key, expected)| match record.get(key) {
                    Some(actual) => condition_matches(actual, expected),
                    None => false,
                })
        })
        .collect()
}

/// A filter value is either a literal (equality match) or an operator object
/// like `{"$gte": "2023-07-10", "$lte": "2023-07-16"}` whose clauses must all
/// hold.
fn condition_matches(actual: &Value, expected: &Value) -> bool {
    match expected.as_object() {
        Some(ops) if ops.keys().any(|k| k.starts_with('$')) => ops
            .iter()
            .all(|(op, bound)| operator_matches(actual, op, bound)),
        _ => values_equal(actual, expected),
    }
}

/// Comparison operators over numbers (with coercion) or strings; ISO dates
/// compare correctly as strings. Unknown operators and mixed types never
/// match.
fn operator_matches(actual: &Value, op: &str, bound: &Value) -> bool {
    let ordering = match (actual.as_f64(), bound.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (actual.as_str(), bound.as_str()) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        "$gte" => ordering != Ordering::Less,
        "$lte" => ordering != Ordering::Greater,
        "$gt" => ordering == Ordering::Greater,
        "$lt" => ordering == Ordering::Less,
        _ => false,
    }
}

/// Equality with numeric coercion, so a filter of `200` matches a stored
/// `200.0` and vice versa.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Keep only fields whose projection flag is truthy.
fn project(record: &Value, mask: &Map<String, Value>) -> Value {
    let empty = Map::new();
    let fields = record.as_object().unwrap_or(&empty);
    let kept: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| mask.get(*key).is_some_and(is_truthy))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(kept)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// Render a whole-number total as an integer, anything else as a float.
fn number(total: f64) -> Value {
    if total.fract() == 0.0 && total.abs() < i64::MAX as f64 {
        json!(total as i64)
    } else {
        json!(total)
    }
}
