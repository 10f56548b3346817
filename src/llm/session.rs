//! Multi-turn conversation with a hosted model.
//!
//! The model API is stateless, so the session owns the history and resends
//! it on every turn together with the registered tool definitions.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, LlmProvider, ToolCall, ToolCompletionRequest, ToolDefinition, ToolResult,
};
use crate::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};

/// One model turn: optional text plus any requested tool calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Turn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The turn's text, or an empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// An ongoing conversation.
pub struct ConversationSession {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<ToolDefinition>,
    history: Vec<ChatMessage>,
    observer: Arc<dyn Observer>,
}

impl ConversationSession {
    /// Start an empty conversation that offers `tools` to the model.
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            provider,
            tools,
            history: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Submit user text and get the model's next turn.
    pub async fn submit(&mut self, text: impl Into<String>) -> Result<Turn, LlmError> {
        self.advance(vec![ChatMessage::user(text)]).await
    }

    /// Answer a single tool call.
    pub async fn respond_to_tool(
        &mut self,
        call: &ToolCall,
        result: Value,
    ) -> Result<Turn, LlmError> {
        self.respond_to_tools(vec![ToolResult::for_call(call, result)])
            .await
    }

    /// Answer every tool call of the previous turn in one function-response turn.
    pub async fn respond_to_tools(&mut self, results: Vec<ToolResult>) -> Result<Turn, LlmError> {
        self.advance(results.into_iter().map(ChatMessage::from).collect())
            .await
    }

    /// Messages exchanged so far.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Marker for [`rollback`](Self::rollback).
    pub fn checkpoint(&self) -> usize {
        self.history.len()
    }

    /// Drop every message recorded after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        self.history.truncate(checkpoint);
    }

    /// Forget the whole conversation.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    async fn advance(&mut self, messages: Vec<ChatMessage>) -> Result<Turn, LlmError> {
        let checkpoint = self.checkpoint();
        self.history.extend(messages);

        self.observer.record_event(&ObserverEvent::LlmRequest {
            provider: self.provider.name().to_string(),
            model: self.provider.model_name().to_string(),
            message_count: self.history.len(),
        });

        let request = ToolCompletionRequest::new(self.history.clone(), self.tools.clone());
        let started = Instant::now();
        // An empty model turn cannot be replayed to the provider later.
        let result = self.provider.complete_with_tools(request).await.and_then(|response| {
            let has_text = response.content.as_deref().is_some_and(|t| !t.is_empty());
            if has_text || !response.tool_calls.is_empty() {
                Ok(response)
            } else {
                Err(LlmError::InvalidResponse {
                    provider: self.provider.name().to_string(),
                    reason: format!(
                        "model returned an empty turn (finish reason: {:?})",
                        response.finish_reason
                    ),
                })
            }
        });

        self.observer.record_event(&ObserverEvent::LlmResponse {
            provider: self.provider.name().to_string(),
            model: self.provider.model_name().to_string(),
            duration: started.elapsed(),
            success: result.is_ok(),
            error_message: result.as_ref().err().map(|e| e.to_string()),
        });

        match result {
            Ok(response) => {
                self.observer.record_metric(&ObserverMetric::TokensUsed(
                    u64::from(response.input_tokens) + u64::from(response.output_tokens),
                ));
                self.history.push(ChatMessage::assistant_with_tool_calls(
                    response.content.clone().unwrap_or_default(),
                    response.tool_calls.clone(),
                ));
                Ok(Turn {
                    text: response.content,
                    tool_calls: response.tool_calls,
                })
            }
            Err(e) => {
                self.rollback(checkpoint);
                Err(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::ScriptedProvider;
    use super::*;
    use crate::llm::provider::Role;

    #[tokio::test]
    async fn submit_records_user_and_model_turns() {
        let provider = Arc::new(ScriptedProvider::new().then_text("hello there"));
        let mut session = ConversationSession::new(provider.clone(), vec![]);

        let turn = session.submit("hi").await.unwrap();
        assert_eq!(turn.text(), "hello there");
        assert!(!turn.has_tool_calls());

        let roles: Vec<Role> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn tool_response_is_sent_with_history() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("listSecrets", json!({}))
                .then_text("done"),
        );
        let mut session = ConversationSession::new(provider.clone(), vec![]);

        let turn = session.submit("list").await.unwrap();
        let call = turn.tool_calls[0].clone();
        let turn = session
            .respond_to_tool(&call, json!({"items": []}))
            .await
            .unwrap();
        assert_eq!(turn.text(), "done");

        let last = provider.last_request().unwrap();
        let tool_msg = last.messages.last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.name.as_deref(), Some("listSecrets"));
        assert_eq!(last.messages.len(), 3);
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_untouched() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_text("first")
                .then_error("network down")
                .then_text("recovered"),
        );
        let mut session = ConversationSession::new(provider.clone(), vec![]);

        session.submit("one").await.unwrap();
        assert!(session.submit("two").await.is_err());
        assert_eq!(session.history().len(), 2);

        let turn = session.submit("three").await.unwrap();
        assert_eq!(turn.text(), "recovered");
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn empty_turn_is_rejected_and_not_recorded() {
        let provider = Arc::new(ScriptedProvider::new().then_empty().then_text("ok"));
        let mut session = ConversationSession::new(provider.clone(), vec![]);

        let err = session.submit("one").await.unwrap_err();
        assert!(err.to_string().contains("ContentFilter"));
        assert!(session.history().is_empty());

        session.submit("two").await.unwrap();
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let provider = Arc::new(ScriptedProvider::new().then_text("ok"));
        let mut session = ConversationSession::new(provider, vec![]);
        session.submit("x").await.unwrap();
        session.reset();
        assert!(session.history().is_empty());
    }
}
