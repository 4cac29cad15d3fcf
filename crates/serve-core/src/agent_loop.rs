use crate::config::ProviderConfig;
use crate::error::ServeError;
use crate::tool_registry::ToolRegistry;
use crate::types::{Message, Role};

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObjectArgs,
};
use async_openai::Client;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum number of tool-calling iterations before we force a text response.
const MAX_TOOL_ITERATIONS: usize = 10;

/// The agent loop — orchestrates chat-completion calls and tool execution
/// until the model produces a plain text answer.
pub struct AgentLoop {
    client: Client<OpenAIConfig>,
    provider: ProviderConfig,
    system_prompt: String,
    tool_registry: Arc<ToolRegistry>,
}

impl AgentLoop {
    pub fn new(
        provider: ProviderConfig,
        system_prompt: impl Into<String>,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(&provider.api_base)
            .with_api_key(
                provider
                    .resolve_api_key()
                    .unwrap_or_else(|| "not-configured".to_string()),
            );

        let client = Client::with_config(openai_config);
        Self {
            client,
            provider,
            system_prompt: system_prompt.into(),
            tool_registry,
        }
    }

    /// Run the agent for a single turn. Takes the composed message history
    /// and returns the final assistant message.
    pub async fn run(&self, messages: &[Message]) -> Result<Message, ServeError> {
        let tool_schemas = self.tool_registry.schemas();

        let mut running_messages = self.build_request_messages(messages)?;
        let mut iteration = 0;

        loop {
            iteration += 1;
            if iteration > MAX_TOOL_ITERATIONS {
                warn!(
                    "Hit max tool iterations ({}), forcing text response",
                    MAX_TOOL_ITERATIONS
                );
                break;
            }

            debug!("Agent loop iteration {}", iteration);

            let mut request_builder = CreateChatCompletionRequestArgs::default();
            request_builder
                .model(&self.provider.model)
                .messages(running_messages.clone())
                .temperature(self.provider.temperature)
                .max_completion_tokens(self.provider.max_tokens);

            if !tool_schemas.is_empty() {
                let tools: Vec<_> = tool_schemas
                    .iter()
                    .map(|s| {
                        let func = FunctionObjectArgs::default()
                            .name(&s.name)
                            .description(&s.description)
                            .parameters(s.parameters.clone())
                            .build()
                            .map_err(|e| {
                                ServeError::Schema(format!("function '{}': {}", s.name, e))
                            })?;
                        ChatCompletionToolArgs::default()
                            .r#type(ChatCompletionToolType::Function)
                            .function(func)
                            .build()
                            .map_err(|e| ServeError::Schema(format!("tool '{}': {}", s.name, e)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                request_builder.tools(tools);
            }

            let request = request_builder
                .build()
                .map_err(|e| ServeError::Provider(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| ServeError::Provider(e.to_string()))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| ServeError::Provider("No choices in response".into()))?;

            let assistant_msg = &choice.message;
            let content = assistant_msg.content.clone().unwrap_or_default();

            if let Some(tool_calls) = &assistant_msg.tool_calls {
                if !tool_calls.is_empty() {
                    // Record the assistant's tool-call turn in the running history.
                    let assistant_openai = ChatCompletionRequestAssistantMessageArgs::default()
                        .content(&*content)
                        .tool_calls(tool_calls.clone())
                        .build()
                        .map_err(|e| ServeError::Provider(e.to_string()))?;
                    running_messages
                        .push(ChatCompletionRequestMessage::Assistant(assistant_openai));

                    for tc in tool_calls {
                        debug!("Tool call: {}", tc.function.name);

                        // Invalid argument JSON is reported back to the model
                        // as a tool result, not raised.
                        let output = match serde_json::from_str::<serde_json::Value>(
                            &tc.function.arguments,
                        ) {
                            Ok(args) => {
                                self.tool_registry
                                    .execute(&tc.function.name, &tc.id, args)
                                    .await
                            }
                            Err(e) => crate::types::ToolOutput {
                                tool_call_id: tc.id.clone(),
                                content: format!("Invalid JSON arguments: {}", e),
                                is_error: true,
                            },
                        };

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tc.id)
                            .content(&*output.content)
                            .build()
                            .map_err(|e| ServeError::Provider(e.to_string()))?;
                        running_messages.push(ChatCompletionRequestMessage::Tool(tool_msg));
                    }

                    // The model needs to process the tool results.
                    continue;
                }
            }

            // No tool calls — this is the final text response.
            return Ok(Message::assistant(&content));
        }

        Ok(Message::assistant(
            "I do not know based on the available data.",
        ))
    }

    /// Convert our Message types to request messages, injecting the agent's
    /// system prompt if the history doesn't carry one.
    fn build_request_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, ServeError> {
        let mut result = Vec::new();

        let has_system = messages.iter().any(|m| m.role == Role::System);
        if !has_system && !self.system_prompt.is_empty() {
            let sys_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.as_str())
                .build()
                .map_err(|e| ServeError::Provider(e.to_string()))?;
            result.push(ChatCompletionRequestMessage::System(sys_msg));
        }

        for msg in messages {
            match msg.role {
                Role::System => {
                    let m = ChatCompletionRequestSystemMessageArgs::default()
                        .content(msg.content.as_str())
                        .build()
                        .map_err(|e| ServeError::Provider(e.to_string()))?;
                    result.push(ChatCompletionRequestMessage::System(m));
                }
                Role::User => {
                    let m = ChatCompletionRequestUserMessageArgs::default()
                        .content(msg.content.as_str())
                        .build()
                        .map_err(|e| ServeError::Provider(e.to_string()))?;
                    result.push(ChatCompletionRequestMessage::User(m));
                }
                Role::Assistant => {
                    let m = ChatCompletionRequestAssistantMessageArgs::default()
                        .content(msg.content.as_str())
                        .build()
                        .map_err(|e| ServeError::Provider(e.to_string()))?;
                    result.push(ChatCompletionRequestMessage::Assistant(m));
                }
                Role::Tool => {
                    let m = ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(msg.tool_call_id.as_deref().unwrap_or(""))
                        .content(msg.content.as_str())
                        .build()
                        .map_err(|e| ServeError::Provider(e.to_string()))?;
                    result.push(ChatCompletionRequestMessage::Tool(m));
                }
            }
        }

        Ok(result)
    }
}
