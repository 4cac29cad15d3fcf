use thiserror::Error;

/// Faults that can escape the agent machinery. Query-engine and metric
/// failures are not here: those are reported as `success: false` envelopes
/// to the model and the HTTP client, never as errors.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Schema build error: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, ServeError>;
