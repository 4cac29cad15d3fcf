//! The tools exposed to the two agents.
//!
//! Every tool returns a JSON envelope string with a `success` flag; hard
//! faults are converted by the registry so the model always sees a tool
//! result it can reason about.

pub mod analytics_query;
pub mod data_query;
pub mod external_create;
pub mod knowledge;

pub use analytics_query::AnalyticsQueryTool;
pub use data_query::DataQueryTool;
pub use external_create::ExternalCreateTool;
pub use knowledge::{KnowledgeBase, KnowledgeSearchTool};

use serve_core::ToolRegistry;
use serve_data::Dataset;
use std::sync::Arc;

/// Toolset for the customer-support agent: record lookup, external
/// creation, knowledge retrieval.
pub fn support_registry(dataset: Arc<Dataset>, knowledge: Arc<KnowledgeBase>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DataQueryTool::new(dataset)));
    registry.register(Arc::new(ExternalCreateTool));
    registry.register(Arc::new(KnowledgeSearchTool::new(knowledge)));
    registry
}

/// Toolset for the business-analytics agent: record lookup, the metric
/// catalog, knowledge retrieval.
pub fn dashboard_registry(dataset: Arc<Dataset>, knowledge: Arc<KnowledgeBase>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DataQueryTool::new(dataset.clone())));
    registry.register(Arc::new(AnalyticsQueryTool::new(dataset)));
    registry.register(Arc::new(KnowledgeSearchTool::new(knowledge)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serve_core::config::{KnowledgeConfig, ProviderConfig};

    fn offline_knowledge(dataset: &Dataset) -> Arc<KnowledgeBase> {
        let config = KnowledgeConfig {
            enabled: false,
            ..Default::default()
        };
        Arc::new(KnowledgeBase::new(
            &config,
            &ProviderConfig::default(),
            dataset,
        ))
    }

    #[test]
    fn test_support_registry_toolset() {
        let dataset = Arc::new(Dataset::fixture());
        let knowledge = offline_knowledge(&dataset);
        let registry = support_registry(dataset, knowledge);
        let mut names = registry.list_names();
        names.sort();
        assert_eq!(names, ["data_query", "external_create", "knowledge_search"]);
    }

    #[test]
    fn test_dashboard_registry_toolset() {
        let dataset = Arc::new(Dataset::fixture());
        let knowledge = offline_knowledge(&dataset);
        let registry = dashboard_registry(dataset, knowledge);
        let mut names = registry.list_names();
        names.sort();
        assert_eq!(names, ["analytics_query", "data_query", "knowledge_search"]);
    }
}
