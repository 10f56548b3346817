//! Vault tools exposed to the model.
//!
//! The registry is closed: [`VaultTool`] has one variant per gateway
//! operation. Names the model invents outside the registry are rejected at
//! parse time and answered with an `Unknown function` error.

use std::time::Instant;

use serde_json::{Value, json};

use crate::error::ToolError;
use crate::llm::{ToolCall, ToolDefinition};
use crate::observability::{Observer, ObserverEvent};
use crate::vault::{self, VaultClient};

/// A parsed, validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultTool {
    GetStaticSecret { secret_name: String },
    GetRotatedSecret { secret_name: String },
    GetDynamicSecret { secret_name: String },
    ListSecrets { path: String, secret_type: Option<String> },
    GetSecretMetadata { secret_name: String },
    CountSecretsByType { path: String },
}

impl VaultTool {
    /// Registered tool names, in declaration order.
    pub const NAMES: [&'static str; 6] = [
        "getStaticSecret",
        "getRotatedSecret",
        "getDynamicSecret",
        "listSecrets",
        "getSecretMetadata",
        "countSecretsByType",
    ];

    /// The registered name of this invocation's tool.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetStaticSecret { .. } => Self::NAMES[0],
            Self::GetRotatedSecret { .. } => Self::NAMES[1],
            Self::GetDynamicSecret { .. } => Self::NAMES[2],
            Self::ListSecrets { .. } => Self::NAMES[3],
            Self::GetSecretMetadata { .. } => Self::NAMES[4],
            Self::CountSecretsByType { .. } => Self::NAMES[5],
        }
    }

    /// Tool descriptors registered with the model.
    pub fn definitions() -> Vec<ToolDefinition> {
        let secret_name_schema = || {
            json!({
                "type": "object",
                "required": ["secret_name"],
                "properties": {
                    "secret_name": {
                        "type": "string",
                        "description": "Full path of the secret, e.g. /prod/db/password"
                    }
                }
            })
        };

        vec![
            ToolDefinition {
                name: Self::NAMES[0].to_string(),
                description: "Retrieves the value of a static secret from Akeyless. \
                              Static secrets are manually managed key-value or blob secrets."
                    .to_string(),
                parameters: secret_name_schema(),
            },
            ToolDefinition {
                name: Self::NAMES[1].to_string(),
                description: "Retrieves a rotated secret from Akeyless. Rotated secrets are \
                              passwords or API keys that the vault refreshes on a schedule."
                    .to_string(),
                parameters: secret_name_schema(),
            },
            ToolDefinition {
                name: Self::NAMES[2].to_string(),
                description: "Generates and retrieves a dynamic secret from Akeyless: \
                              temporary credentials created on demand with a limited lifetime."
                    .to_string(),
                parameters: secret_name_schema(),
            },
            ToolDefinition {
                name: Self::NAMES[3].to_string(),
                description: "Lists all secrets in Akeyless at a given path, optionally \
                              filtered by type."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Folder to list (default: /)"
                        },
                        "secret_type": {
                            "type": "string",
                            "description": "Optional type filter: static, rotated or dynamic"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: Self::NAMES[4].to_string(),
                description: "Gets detailed metadata about a secret (type, creation date, \
                              tags, rotation settings)."
                    .to_string(),
                parameters: secret_name_schema(),
            },
            ToolDefinition {
                name: Self::NAMES[5].to_string(),
                description: "Counts the total number of secrets and breaks them down by type \
                              (static, rotated, dynamic, other), with the names in each group."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Folder to count (default: /)"
                        }
                    }
                }),
            },
        ]
    }

    /// Parse a model tool call. snake_case spellings of the registered
    /// names are accepted too.
    pub fn from_call(call: &ToolCall) -> Result<Self, ToolError> {
        let args = &call.arguments;
        let secret_name = || require_str(&call.name, args, "secret_name");
        let path = || optional_str(&call.name, args, "path").map(|p| p.unwrap_or("/").to_string());

        let tool = match call.name.as_str() {
            "getStaticSecret" | "get_static_secret" => Self::GetStaticSecret {
                secret_name: secret_name()?,
            },
            "getRotatedSecret" | "get_rotated_secret" => Self::GetRotatedSecret {
                secret_name: secret_name()?,
            },
            "getDynamicSecret" | "get_dynamic_secret" => Self::GetDynamicSecret {
                secret_name: secret_name()?,
            },
            "listSecrets" | "list_secrets" => Self::ListSecrets {
                path: path()?,
                secret_type: optional_str(&call.name, args, "secret_type")?
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            },
            "getSecretMetadata" | "get_secret_metadata" => Self::GetSecretMetadata {
                secret_name: secret_name()?,
            },
            "countSecretsByType" | "count_secrets_by_type" => {
                Self::CountSecretsByType { path: path()? }
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(tool)
    }

    /// Run the matching gateway operation and render its outcome.
    pub async fn execute(&self, vault: &VaultClient) -> Value {
        match self {
            Self::GetStaticSecret { secret_name } => {
                vault::tagged(vault.get_static_secret(secret_name).await)
            }
            Self::GetRotatedSecret { secret_name } => {
                vault::tagged(vault.get_rotated_secret(secret_name).await)
            }
            Self::GetDynamicSecret { secret_name } => {
                vault::tagged(vault.get_dynamic_secret(secret_name).await)
            }
            Self::ListSecrets { path, secret_type } => {
                vault::tagged(vault.list_items(path, secret_type.as_deref()).await)
            }
            Self::GetSecretMetadata { secret_name } => {
                vault::tagged(vault.describe_item(secret_name).await)
            }
            Self::CountSecretsByType { path } => vault::tagged(vault.count_by_type(path).await),
        }
    }
}

/// Execute a model tool call. Never fails: unknown tools and bad
/// arguments become `{"error": ...}` results without touching the vault.
pub async fn dispatch(call: &ToolCall, vault: &VaultClient, observer: &dyn Observer) -> Value {
    let tool = match VaultTool::from_call(call) {
        Ok(tool) => tool,
        Err(e) => {
            tracing::warn!(tool = %call.name, error = %e, "Rejected tool call");
            observer.record_event(&ObserverEvent::Error {
                component: "tools".to_string(),
                message: e.to_string(),
            });
            return json!({ "error": e.to_string() });
        }
    };

    tracing::info!(tool = tool.name(), "Using tool");
    observer.record_event(&ObserverEvent::ToolCallStart {
        tool: tool.name().to_string(),
    });
    let started = Instant::now();

    let result = tool.execute(vault).await;

    observer.record_event(&ObserverEvent::ToolCallEnd {
        tool: tool.name().to_string(),
        duration: started.elapsed(),
        success: result.get("error").is_none(),
    });
    result
}

fn require_str(tool: &str, args: &Value, key: &str) -> Result<String, ToolError> {
    optional_str(tool, args, key)?
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments {
            name: tool.to_string(),
            reason: format!("missing '{key}'"),
        })
}

fn optional_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::InvalidArguments {
            name: tool.to_string(),
            reason: format!("'{key}' must be a string, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::VaultConfig;
    use crate::observability::traits::RecordingObserver;
    use crate::observability::{NoopObserver, ObserverEvent};

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_0".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn definitions_cover_registry() {
        let defs = VaultTool::definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, VaultTool::NAMES);
        for def in &defs {
            assert_eq!(def.parameters["type"], "object");
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn parse_registered_and_snake_case_names() {
        let tool = VaultTool::from_call(&call("getStaticSecret", json!({"secret_name": "db/pass"})))
            .unwrap();
        assert_eq!(
            tool,
            VaultTool::GetStaticSecret {
                secret_name: "db/pass".into()
            }
        );

        let tool = VaultTool::from_call(&call("get_secret_metadata", json!({"secret_name": "x"})))
            .unwrap();
        assert_eq!(tool.name(), "getSecretMetadata");
    }

    #[test]
    fn list_and_count_default_to_root() {
        let tool = VaultTool::from_call(&call("listSecrets", json!({}))).unwrap();
        assert_eq!(
            tool,
            VaultTool::ListSecrets {
                path: "/".into(),
                secret_type: None
            }
        );

        let tool = VaultTool::from_call(&call(
            "listSecrets",
            json!({"path": "/prod", "secret_type": "rotated"}),
        ))
        .unwrap();
        assert_eq!(
            tool,
            VaultTool::ListSecrets {
                path: "/prod".into(),
                secret_type: Some("rotated".into())
            }
        );

        let tool = VaultTool::from_call(&call("countSecretsByType", Value::Null)).unwrap();
        assert_eq!(tool, VaultTool::CountSecretsByType { path: "/".into() });
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = VaultTool::from_call(&call("deleteSecret", json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Unknown function: deleteSecret");
    }

    #[test]
    fn missing_or_mistyped_argument() {
        let err = VaultTool::from_call(&call("getStaticSecret", json!({}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err =
            VaultTool::from_call(&call("getRotatedSecret", json!({"secret_name": 5}))).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_never_calls_vault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let vault = VaultClient::new(VaultConfig::new("p", "k", server.uri()));

        let result = dispatch(&call("rotateEverything", json!({})), &vault, &NoopObserver).await;
        assert_eq!(result, json!({"error": "Unknown function: rotateEverything"}));
    }

    #[tokio::test]
    async fn dispatch_renders_vault_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let vault = VaultClient::new(VaultConfig::new("p", "k", server.uri()));

        let result = dispatch(
            &call("getDynamicSecret", json!({"secret_name": "aws"})),
            &vault,
            &NoopObserver,
        )
        .await;
        assert!(result["error"].as_str().unwrap().starts_with("authentication failed"));
    }

    #[tokio::test]
    async fn dispatch_reports_tool_start_and_end() {
        let server = MockServer::start().await;
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
        let vault = VaultClient::new(VaultConfig::new("p", "k", server.uri()));
        let observer = RecordingObserver::default();

        let result = dispatch(&call("list_secrets", json!({})), &vault, &observer).await;
        assert_eq!(result, json!({"items": []}));

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ObserverEvent::ToolCallStart { tool } if tool == "listSecrets"));
        assert!(matches!(
            &events[1],
            ObserverEvent::ToolCallEnd { tool, success: true, .. } if tool == "listSecrets"
        ));
    }

    #[tokio::test]
    async fn dispatch_marks_vault_failure_unsuccessful() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let vault = VaultClient::new(VaultConfig::new("p", "k", server.uri()));
        let observer = RecordingObserver::default();

        dispatch(&call("countSecretsByType", json!({})), &vault, &observer).await;

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            ObserverEvent::ToolCallEnd { tool, success: false, .. } if tool == "countSecretsByType"
        ));
    }

    #[tokio::test]
    async fn dispatch_reports_rejected_call_as_error() {
        let server = MockServer::start().await;
        let vault = VaultClient::new(VaultConfig::new("p", "k", server.uri()));
        let observer = RecordingObserver::default();

        dispatch(&call("rotateEverything", json!({})), &vault, &observer).await;

        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ObserverEvent::Error { component, message }
                if component == "tools" && message == "Unknown function: rotateEverything"
        ));
    }
}
