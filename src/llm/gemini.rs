//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API (`generateContent`) with
//! function declarations. The API is stateless: every request carries the
//! full conversation, which [`ConversationSession`](super::ConversationSession)
//! keeps.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::GeminiConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, FinishReason, LlmProvider, Role, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse,
};

const PROVIDER: &str = "gemini";

/// Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn api_url(&self) -> String {
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, model
        )
    }

    async fn send_request(&self, body: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                });
            }

            // Try to parse as JSON error
            if let Ok(error) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("{} ({})", error.error.message, error.error.status),
                });
            }

            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete_with_tools(
        &self,
        req: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let (system_instruction, contents) = convert_messages(&req.messages);

        let tools = if req.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: req
                    .tools
                    .into_iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name,
                        description: t.description,
                        parameters: t.parameters,
                    })
                    .collect(),
            }])
        };

        let request = GeminiRequest {
            contents,
            tools,
            system_instruction,
        };

        let response = self.send_request(&request).await?;
        parse_response(response)
    }
}

/// Convert conversation messages to Gemini `contents`.
///
/// System messages become the `systemInstruction`. Consecutive tool
/// results are merged into one user turn of `functionResponse` parts, which
/// is how Gemini expects answers to parallel function calls.
fn convert_messages(messages: &[ChatMessage]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system: Vec<GeminiPart> = Vec::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system.push(GeminiPart::text(&msg.content)),
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(&msg.content)],
            }),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(GeminiPart::text(&msg.content));
                }
                for call in &msg.tool_calls {
                    parts.push(GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        }),
                        ..Default::default()
                    });
                }
                // Gemini rejects contents without parts.
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
            }
            Role::Tool => {
                let result: Value = serde_json::from_str(&msg.content)
                    .unwrap_or_else(|_| Value::String(msg.content.clone()));
                let part = GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name: msg.name.clone().unwrap_or_default(),
                        response: json!({ "result": result }),
                    }),
                    ..Default::default()
                };

                let merge = contents.last().is_some_and(|last| {
                    last.role.as_deref() == Some("user")
                        && !last.parts.is_empty()
                        && last.parts.iter().all(|p| p.function_response.is_some())
                });
                match contents.last_mut() {
                    Some(last) if merge => last.parts.push(part),
                    _ => contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let system_instruction = if system.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: system,
        })
    };

    (system_instruction, contents)
}

fn parse_response(response: GeminiResponse) -> Result<ToolCompletionResponse, LlmError> {
    let (input_tokens, output_tokens) = response
        .usage_metadata
        .as_ref()
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason,
        });
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            let arguments = if call.args.is_null() {
                Value::Object(Default::default())
            } else {
                call.args
            };
            tool_calls.push(ToolCall {
                id: format!("call_{}", tool_calls.len()),
                name: call.name,
                arguments,
            });
        }
    }

    if text.is_empty() && tool_calls.is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!(
                "model returned no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }

    let finish_reason = if !tool_calls.is_empty() {
        FinishReason::ToolUse
    } else {
        match candidate.finish_reason.as_deref() {
            Some("STOP") | None => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
                FinishReason::ContentFilter
            }
            Some(_) => FinishReason::Unknown,
        }
    };

    Ok(ToolCompletionResponse {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        input_tokens,
        output_tokens,
        finish_reason,
    })
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
    #[serde(default)]
    status: String,
}
