//! Error types for vault-chat.

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to parse configuration: {0}")]
    ParseError(String),
}

/// Errors from the Akeyless vault gateway.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("{endpoint} returned HTTP {status}")]
    RequestFailed {
        endpoint: String,
        status: u16,
        /// Response body, when the vault sent one.
        detail: Option<String>,
    },

    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl VaultError {
    /// Response body attached to the failure, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::RequestFailed { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("{provider} rate limited the request")]
    RateLimited { provider: String },

    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tool dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}

/// Interactive channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to start {name}: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("{name} channel closed")]
    Closed { name: String },
}
