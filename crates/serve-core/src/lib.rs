pub mod agent_loop;
pub mod config;
pub mod error;
pub mod memory;
pub mod tool_registry;
pub mod types;

pub use agent_loop::AgentLoop;
pub use config::AppConfig;
pub use error::ServeError;
pub use memory::ConversationStore;
pub use tool_registry::ToolRegistry;
