//! LLM integration.
//!
//! Uses Google Gemini function calling as the hosted model.

mod gemini;
mod provider;
pub mod session;

pub use gemini::GeminiProvider;
pub use provider::{
    ChatMessage, FinishReason, LlmProvider, Role, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse, ToolDefinition, ToolResult,
};
pub use session::{ConversationSession, Turn};

use std::sync::Arc;

use crate::config::GeminiConfig;

/// Create the LLM provider from configuration.
pub fn create_llm_provider(config: &GeminiConfig) -> Arc<dyn LlmProvider> {
    Arc::new(GeminiProvider::new(config.clone()))
}
