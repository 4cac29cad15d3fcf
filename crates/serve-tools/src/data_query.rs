use async_trait::async_trait;
use serde_json::{json, Value};
use serve_core::error::ServeError;
use serve_core::tool_registry::Tool;
use serve_data::{execute_raw, Dataset};
use std::sync::Arc;

/// Read-only collection queries against the in-memory dataset.
pub struct DataQueryTool {
    dataset: Arc<Dataset>,
}

impl DataQueryTool {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for DataQueryTool {
    fn name(&self) -> &str {
        "data_query"
    }

    fn description(&self) -> &str {
        "Query business records by collection. Collections: clients, orders, payments, \
         courses, classes, attendance. Supports find (returns matching records), \
         count (returns how many match), and sum (totals a numeric field). \
         The filter matches fields by exact equality."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "enum": ["clients", "orders", "payments", "courses", "classes", "attendance"],
                    "description": "Collection to query"
                },
                "operation": {
                    "type": "string",
                    "enum": ["find", "count", "sum"],
                    "description": "Operation to run. Default: find"
                },
                "filter": {
                    "type": "object",
                    "description": "Exact-equality field filter, e.g. {\"status\": \"active\"}"
                },
                "projection": {
                    "type": "object",
                    "description": "Fields to include in find results, e.g. {\"name\": true}"
                },
                "field": {
                    "type": "string",
                    "description": "Numeric field to total (sum only)"
                }
            },
            "required": ["collection"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ServeError> {
        let envelope = execute_raw(&self.dataset, &args);
        Ok(envelope.to_string())
    }
}
