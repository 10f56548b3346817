//! The tool-dispatch loop.
//!
//! ```text
//!  utterance ──► submit ──► model turn ──┬── no tool calls ──► answer
//!                  ▲                     │
//!                  │                     └── tool calls ──► vault ──┐
//!                  └──────────── function responses ◄───────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::config::AgentConfig;
use crate::error::LlmError;
use crate::llm::{ConversationSession, LlmProvider, ToolResult, Turn};
use crate::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};
use crate::tools::{self, VaultTool};
use crate::vault::VaultClient;

/// Fixed instruction sent ahead of every user utterance.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant that helps users manage and retrieve secrets from Akeyless Secret Management.

You have access to several tools to interact with Akeyless:
- getStaticSecret: For manually managed key-value secrets
- getRotatedSecret: For automatically rotated secrets (passwords, API keys)
- getDynamicSecret: For on-demand generated secrets with TTL (temporary credentials)
- listSecrets: To browse and list secrets
- getSecretMetadata: To get detailed information about secrets
- countSecretsByType: To count secrets by type

When users ask about secrets, use the appropriate tool to fetch the information. \
Be helpful, clear, and security-conscious in your responses.";

/// One user's conversation with the vault assistant.
///
/// Owns its conversation and its vault client; create one per interactive
/// session.
pub struct Agent {
    session: ConversationSession,
    vault: VaultClient,
    observer: Arc<dyn Observer>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Arc<dyn LlmProvider>, vault: VaultClient) -> Self {
        Self {
            session: ConversationSession::new(provider, VaultTool::definitions()),
            vault,
            observer: Arc::new(NoopObserver),
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.session = self.session.with_observer(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    /// The vault client this agent calls.
    pub fn vault(&self) -> &VaultClient {
        &self.vault
    }

    /// Answer one utterance.
    ///
    /// Never fails: model errors are rendered as `Error: ...` and the
    /// conversation is restored to its state before the utterance.
    pub async fn chat(&mut self, utterance: &str) -> String {
        let checkpoint = self.session.checkpoint();
        let started = Instant::now();

        let answer = match self.run_turns(utterance).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Conversation turn failed");
                self.observer.record_event(&ObserverEvent::Error {
                    component: "llm".to_string(),
                    message: e.to_string(),
                });
                self.session.rollback(checkpoint);
                format!("Error: {e}")
            }
        };

        self.observer
            .record_metric(&ObserverMetric::RequestLatency(started.elapsed()));
        self.observer.record_event(&ObserverEvent::TurnComplete);
        answer
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    async fn run_turns(&mut self, utterance: &str) -> Result<String, LlmError> {
        let prompt = format!("{SYSTEM_INSTRUCTION}\n\nUser: {utterance}");
        let mut turn = self.session.submit(prompt).await?;
        let mut rounds = 0;

        while turn.has_tool_calls() {
            if rounds == self.config.max_tool_rounds {
                tracing::warn!(rounds, "Model kept requesting tools, giving up");
                return Err(LlmError::InvalidResponse {
                    provider: "agent".to_string(),
                    reason: format!(
                        "model requested tools for {rounds} rounds without answering"
                    ),
                });
            }
            rounds += 1;
            turn = self.answer_tool_calls(turn).await?;
        }

        Ok(turn.text.unwrap_or_default())
    }

    async fn answer_tool_calls(&mut self, turn: Turn) -> Result<Turn, LlmError> {
        let mut results = Vec::with_capacity(turn.tool_calls.len());
        for call in &turn.tool_calls {
            let result = tools::dispatch(call, &self.vault, self.observer.as_ref()).await;
            results.push(ToolResult::for_call(call, result));
        }
        self.session.respond_to_tools(results).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{GeminiConfig, VaultConfig};
    use crate::llm::Role;
    use crate::llm::session::testing::ScriptedProvider;

    async fn vault_server() -> MockServer {
        MockServer::start().await
    }

    fn vault_for(server: &MockServer) -> VaultClient {
        VaultClient::new(VaultConfig::new("p-test", "k", server.uri()))
    }

    #[tokio::test]
    async fn plain_answer_is_returned_verbatim_without_vault_calls() {
        let server = vault_server().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = Arc::new(ScriptedProvider::new().then_text("Hello! Ask me about secrets."));
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        let answer = agent.chat("hi").await;
        assert_eq!(answer, "Hello! Ask me about secrets.");
        assert_eq!(provider.request_count(), 1);

        let first = provider.last_request().unwrap();
        assert!(first.messages[0].content.starts_with(SYSTEM_INSTRUCTION));
        assert!(first.messages[0].content.ends_with("\n\nUser: hi"));
        assert_eq!(first.tools.len(), 6);
    }

    #[tokio::test]
    async fn static_secret_round_trip() {
        let server = vault_server().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/get-secret-value"))
            .and(body_json(json!({"token": "t", "names": ["db/pass"], "json": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"db/pass": "hunter2"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("getStaticSecret", json!({"secret_name": "db/pass"}))
                .then_text("The password is hunter2."),
        );
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        let answer = agent.chat("what is db/pass?").await;
        assert_eq!(answer, "The password is hunter2.");
        assert_eq!(provider.request_count(), 2);

        let second = provider.last_request().unwrap();
        let tool_msg = second.messages.last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        let fed_back: serde_json::Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(
            fed_back,
            json!({"name": "db/pass", "type": "simple", "value": "hunter2"})
        );
    }

    #[tokio::test]
    async fn unknown_function_is_reported_to_model() {
        let server = vault_server().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("wipeVault", json!({}))
                .then_text("I can't do that."),
        );
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        assert_eq!(agent.chat("delete everything").await, "I can't do that.");

        let second = provider.last_request().unwrap();
        let fed_back: serde_json::Value =
            serde_json::from_str(&second.messages.last().unwrap().content).unwrap();
        assert_eq!(fed_back, json!({"error": "Unknown function: wipeVault"}));
    }

    #[tokio::test]
    async fn model_failure_becomes_error_text_and_session_recovers() {
        let server = vault_server().await;
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_error("connection reset")
                .then_text("Back online."),
        );
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        let answer = agent.chat("hello").await;
        assert!(answer.starts_with("Error: "));
        assert!(answer.contains("connection reset"));

        assert_eq!(agent.chat("hello again").await, "Back online.");
        let last = provider.last_request().unwrap();
        assert_eq!(last.messages.len(), 1);
    }

    #[tokio::test]
    async fn failure_mid_tool_loop_rolls_back_whole_utterance() {
        let server = vault_server().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/list-items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("listSecrets", json!({}))
                .then_error("timeout")
                .then_text("fine"),
        );
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        assert!(agent.chat("list").await.starts_with("Error: "));
        assert_eq!(agent.chat("again").await, "fine");
        assert_eq!(provider.last_request().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn empty_model_turn_becomes_error_and_is_forgotten() {
        let server = vault_server().await;
        let provider = Arc::new(ScriptedProvider::new().then_empty().then_text("Hi again."));
        let mut agent = Agent::new(provider.clone(), vault_for(&server));

        let answer = agent.chat("hello").await;
        assert!(answer.starts_with("Error: "));
        assert!(answer.contains("empty turn"));

        assert_eq!(agent.chat("hello?").await, "Hi again.");
        assert_eq!(provider.last_request().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn blocked_gemini_answer_does_not_break_later_requests() {
        let vault = vault_server().await;
        let gemini = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .expect(2)
            .mount(&gemini)
            .await;

        let provider = crate::llm::create_llm_provider(&GeminiConfig {
            api_key: secrecy::SecretString::from("k".to_string()),
            model: "gemini-2.5-flash".to_string(),
            base_url: gemini.uri(),
        });
        let mut agent = Agent::new(provider, vault_for(&vault));

        assert!(agent.chat("first").await.contains("finish reason: SAFETY"));
        assert!(agent.chat("second").await.starts_with("Error: "));

        let requests = gemini.received_requests().await.unwrap();
        let second: serde_json::Value = requests[1].body_json().unwrap();
        let contents = second["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert!(
            contents
                .iter()
                .all(|c| !c["parts"].as_array().unwrap().is_empty())
        );
    }

    #[tokio::test]
    async fn runaway_tool_loop_is_cut_off() {
        let server = vault_server().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/list-items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(2)
            .mount(&server)
            .await;

        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("listSecrets", json!({}))
                .then_tool_call("listSecrets", json!({}))
                .then_tool_call("listSecrets", json!({})),
        );
        let mut agent = Agent::new(provider.clone(), vault_for(&server))
            .with_config(AgentConfig { max_tool_rounds: 2 });

        let answer = agent.chat("loop").await;
        assert!(answer.contains("without answering"));
        assert_eq!(provider.request_count(), 3);
    }
}
