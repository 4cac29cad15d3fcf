use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};
use serve_analytics::{metrics, Metric};
use serve_core::error::ServeError;
use serve_core::tool_registry::Tool;
use serve_data::Dataset;
use std::sync::Arc;

/// The business-metric catalog, exposed to the dashboard agent as a
/// `{queryType}` lookup.
pub struct AnalyticsQueryTool {
    dataset: Arc<Dataset>,
}

impl AnalyticsQueryTool {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Tool for AnalyticsQueryTool {
    fn name(&self) -> &str {
        "analytics_query"
    }

    fn description(&self) -> &str {
        "Business analytics and metrics. Input is a JSON object with a queryType field. \
         Valid queryTypes: \"revenue\", \"monthlyRevenue\", \"outstandingPayments\", \
         \"activeClients\", \"inactiveClients\", \"newClientsThisMonth\", \
         \"birthdayReminders\", \"enrollmentTrends\", \"topServices\", \
         \"courseCompletionRates\", \"attendanceReports\", \"dropOffRates\", \
         \"completionRates\", \"clientStatusCount\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "queryType": {
                    "type": "string",
                    "description": "The metric to compute, e.g. \"revenue\""
                }
            },
            "required": ["queryType"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ServeError> {
        let Some(name) = args.get("queryType").and_then(Value::as_str) else {
            let envelope = json!({
                "success": false,
                "error": "Missing queryType parameter",
                "example": { "queryType": "revenue" }
            });
            return Ok(envelope.to_string());
        };

        let today = Local::now().date_naive();
        let envelope = match name.parse::<Metric>() {
            Ok(metric) => metric.compute_routed(&self.dataset, today),
            Err(_) => metrics::unknown_metric(name),
        };
        Ok(envelope.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> AnalyticsQueryTool {
        AnalyticsQueryTool::new(Arc::new(Dataset::fixture()))
    }

    #[tokio::test]
    async fn test_revenue_query() {
        let out = tool()
            .execute(json!({"queryType": "revenue"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["revenue"], 550);
        // Routed envelopes also carry the generic alias.
        assert_eq!(value["result"], value["revenue"]);
    }

    #[tokio::test]
    async fn test_missing_query_type() {
        let out = tool().execute(json!({})).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Missing queryType parameter");
        assert_eq!(value["example"]["queryType"], "revenue");
    }

    #[tokio::test]
    async fn test_unknown_query_type_lists_catalog() {
        let out = tool()
            .execute(json!({"queryType": "margins"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Unknown queryType: margins");
        let available = value["availableTypes"].as_array().unwrap();
        assert!(available.iter().any(|v| v == "topServices"));
    }
}
