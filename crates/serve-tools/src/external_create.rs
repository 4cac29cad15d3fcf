use async_trait::async_trait;
use serde_json::{json, Value};
use serve_core::error::ServeError;
use serve_core::tool_registry::Tool;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Stub for the external creation API: validates the payload, synthesizes a
/// mock id, and echoes the record back. Nothing is persisted; created
/// records are not visible to later queries.
pub struct ExternalCreateTool;

fn mock_id(data: &Value) -> String {
    let mut hasher = DefaultHasher::new();
    data.to_string().hash(&mut hasher);
    format!("mock_{}", hasher.finish())
}

#[async_trait]
impl Tool for ExternalCreateTool {
    fn name(&self) -> &str {
        "external_create"
    }

    fn description(&self) -> &str {
        "Create a new client or order via the external API. Input: \
         {\"type\": \"client\"|\"order\", \"data\": {...record fields...}}. \
         Returns the created record with its assigned id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "Kind of record to create, e.g. \"client\" or \"order\""
                },
                "data": {
                    "type": "object",
                    "description": "Fields of the record to create"
                }
            },
            "required": ["type", "data"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ServeError> {
        let data = args.get("data").cloned().unwrap_or_else(|| json!({}));
        let Value::Object(mut record) = data else {
            let envelope = json!({
                "success": false,
                "error": "'data' must be a dictionary"
            });
            return Ok(envelope.to_string());
        };

        let id = mock_id(&Value::Object(record.clone()));
        record.insert("id".into(), json!(id));
        let envelope = json!({ "success": true, "created": record });
        Ok(envelope.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_echoes_record_with_mock_id() {
        let out = ExternalCreateTool
            .execute(json!({
                "type": "client",
                "data": {"name": "Priya Sharma", "email": "priya@example.com"}
            }))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["created"]["name"], "Priya Sharma");
        assert!(value["created"]["id"]
            .as_str()
            .unwrap()
            .starts_with("mock_"));
    }

    #[tokio::test]
    async fn test_non_object_data_is_rejected() {
        let out = ExternalCreateTool
            .execute(json!({"type": "order", "data": "not an object"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "'data' must be a dictionary");
    }

    #[tokio::test]
    async fn test_id_is_stable_for_identical_payloads() {
        let args = json!({"type": "order", "data": {"service": "Course A"}});
        let a = ExternalCreateTool.execute(args.clone()).await.unwrap();
        let b = ExternalCreateTool.execute(args).await.unwrap();
        let a: Value = serde_json::from_str(&a).unwrap();
        let b: Value = serde_json::from_str(&b).unwrap();
        assert_eq!(a["created"]["id"], b["created"]["id"]);
    }
}
