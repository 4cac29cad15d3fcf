use serve_core::agent_loop::AgentLoop;
use serve_core::config::AppConfig;
use serve_core::memory::ConversationStore;
use serve_data::Dataset;
use serve_tools::{dashboard_registry, support_registry, KnowledgeBase};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agents::{DASHBOARD_PROMPT, SUPPORT_PROMPT};

/// Shared application state for the server.
///
/// The dataset is read-only for the life of the process, so it is shared
/// bare behind an `Arc`. The conversation store is the only mutable state
/// and sits behind an `RwLock`; concurrent appends to the same session are
/// last-writer-wins.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub dataset: Arc<Dataset>,
    pub memory: Arc<RwLock<ConversationStore>>,
    pub support_agent: Arc<AgentLoop>,
    pub dashboard_agent: Arc<AgentLoop>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let dataset = Arc::new(Dataset::fixture());
        let knowledge = Arc::new(KnowledgeBase::new(
            &config.knowledge,
            &config.provider,
            &dataset,
        ));
        tracing::info!(
            available = knowledge.is_available(),
            "Knowledge search capability resolved"
        );

        let support_tools = Arc::new(support_registry(dataset.clone(), knowledge.clone()));
        let dashboard_tools = Arc::new(dashboard_registry(dataset.clone(), knowledge));

        let support_agent = Arc::new(AgentLoop::new(
            config.provider.clone(),
            SUPPORT_PROMPT,
            support_tools,
        ));
        let dashboard_agent = Arc::new(AgentLoop::new(
            config.provider.clone(),
            DASHBOARD_PROMPT,
            dashboard_tools,
        ));

        let memory = ConversationStore::new(config.memory.max_turns, config.memory.retention_hours);

        Self {
            config,
            dataset,
            memory: Arc::new(RwLock::new(memory)),
            support_agent,
            dashboard_agent,
        }
    }
}
