//! Configuration for vault-chat.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::observability::ObservabilityConfig;

/// Default Akeyless API gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://api.akeyless.io";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Generative Language API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variables that must be present for the assistant to start.
pub const REQUIRED_ENV_VARS: [&str; 3] = [
    "AKEYLESS_ACCESS_ID",
    "AKEYLESS_ACCESS_KEY",
    "GEMINI_API_KEY",
];

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub vault: VaultConfig,
    pub llm: GeminiConfig,
    pub agent: AgentConfig,
    pub dashboard: DashboardConfig,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            vault: VaultConfig::from_env()?,
            llm: GeminiConfig::from_env()?,
            agent: AgentConfig::from_env()?,
            dashboard: DashboardConfig::from_env()?,
            observability: ObservabilityConfig {
                backend: optional_env("OBSERVABILITY_BACKEND")?.unwrap_or_else(|| "none".into()),
            },
        })
    }
}

/// Akeyless credentials. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub access_id: String,
    pub access_key: SecretString,
    /// Base URL of the API gateway, without trailing slash.
    pub gateway_url: String,
}

impl VaultConfig {
    pub fn new(
        access_id: impl Into<String>,
        access_key: impl Into<String>,
        gateway_url: impl AsRef<str>,
    ) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: SecretString::from(access_key.into()),
            gateway_url: gateway_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let gateway_url =
            optional_env("AKEYLESS_GATEWAY_URL")?.unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        Ok(Self::new(
            required_env("AKEYLESS_ACCESS_ID")?,
            required_env("AKEYLESS_ACCESS_KEY")?,
            gateway_url,
        ))
    }

    /// Get the access key (exposes the secret).
    pub fn access_key(&self) -> &str {
        self.access_key.expose_secret()
    }
}

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    /// Model to use (e.g., "gemini-2.5-flash")
    pub model: String,
    /// Base URL for the Generative Language API
    pub base_url: String,
}

impl GeminiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: SecretString::from(required_env("GEMINI_API_KEY")?),
            model: optional_env("GEMINI_MODEL")?
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: optional_env("GEMINI_BASE_URL")?
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Tool-dispatch loop behavior.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on model tool-call rounds for a single utterance.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 16 }
    }
}

impl AgentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_tool_rounds = parse_optional_env("AGENT_MAX_TOOL_ROUNDS", 16usize)?;
        if max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_TOOL_ROUNDS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self { max_tool_rounds })
    }
}

/// Web dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the API. Generated at startup when unset.
    pub auth_token: Option<String>,
    pub sessions: SessionLimits,
}

/// Bounds on open dashboard sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions unused for this long are dropped.
    pub idle_ttl: Duration,
    /// New sessions are refused beyond this many.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            max_sessions: 64,
        }
    }
}

impl SessionLimits {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let ttl_secs = parse_optional_env("DASHBOARD_SESSION_TTL_SECS", defaults.idle_ttl.as_secs())?;
        let max_sessions = parse_optional_env("DASHBOARD_MAX_SESSIONS", defaults.max_sessions)?;
        if max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DASHBOARD_MAX_SESSIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            idle_ttl: Duration::from_secs(ttl_secs),
            max_sessions,
        })
    }
}

impl DashboardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("DASHBOARD_HOST")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_env("DASHBOARD_PORT")?
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "DASHBOARD_PORT".to_string(),
                    message: format!("must be a valid port number: {e}"),
                })?
                .unwrap_or(8501),
            auth_token: optional_env("DASHBOARD_AUTH_TOKEN")?,
            sessions: SessionLimits::from_env()?,
        })
    }
}

// Helper functions

fn required_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_config_trims_trailing_slash() {
        let cfg = VaultConfig::new("p-123", "key", "https://gw.example.com/");
        assert_eq!(cfg.gateway_url, "https://gw.example.com");
        assert_eq!(cfg.access_key(), "key");
    }

    #[test]
    fn vault_config_debug_redacts_key() {
        let cfg = VaultConfig::new("p-123", "super-secret-key", DEFAULT_GATEWAY_URL);
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("p-123"));
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let err = required_env("VAULT_CHAT_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "VAULT_CHAT_TEST_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn parse_optional_env_falls_back_to_default() {
        let value: usize =
            parse_optional_env("VAULT_CHAT_TEST_SURELY_UNSET_ROUNDS", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn session_limit_defaults() {
        let limits = SessionLimits::default();
        assert_eq!(limits.idle_ttl, Duration::from_secs(3600));
        assert_eq!(limits.max_sessions, 64);
    }

    #[test]
    fn agent_config_default_rounds() {
        assert_eq!(AgentConfig::default().max_tool_rounds, 16);
    }
}
