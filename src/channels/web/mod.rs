//! Browser dashboard for the vault assistant.
//!
//! Provides a single-page web UI with:
//! - Chat with the agent, one agent per browser session
//! - A secret browser over the vault listing
//! - Per-type analytics
//!
//! ```text
//! Browser ─── POST /api/sessions/{id}/chat ──► Agent ──► Gemini / vault
//!         ─── GET  /api/secrets ─────────────► VaultClient
//!         ─── GET  /api/stats ───────────────► VaultClient
//!         ◄── GET  / ─────────────────────────  Static HTML/CSS/JS
//! ```

pub mod auth;
pub mod server;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::error::ChannelError;

use self::server::DashboardState;

/// The dashboard HTTP channel.
pub struct Dashboard {
    config: DashboardConfig,
    state: Arc<DashboardState>,
    /// The actual auth token in use (generated or from config).
    auth_token: String,
}

impl Dashboard {
    /// Create a new dashboard.
    ///
    /// If no auth token is configured, generates a random one.
    pub fn new(config: DashboardConfig, state: DashboardState) -> Self {
        let auth_token = config
            .auth_token
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(generate_token);

        Self {
            config,
            state: Arc::new(state),
            auth_token,
        }
    }

    /// Get the auth token (for printing to console on startup).
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Bind and start serving. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, ChannelError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ChannelError::StartupFailed {
                name: "dashboard".to_string(),
                reason: format!(
                    "Invalid address '{}:{}': {}",
                    self.config.host, self.config.port, e
                ),
            })?;

        server::start_server(addr, self.state.clone(), self.auth_token.clone()).await
    }

    /// Signal the server to stop accepting connections.
    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        match self.state.shutdown_tx.write().await.take() {
            Some(tx) => {
                let _ = tx.send(());
                Ok(())
            }
            None => Err(ChannelError::Closed {
                name: "dashboard".to_string(),
            }),
        }
    }
}

fn generate_token() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::llm::session::testing::ScriptedProvider;
    use crate::vault::VaultClient;

    fn dashboard(auth_token: Option<&str>) -> Dashboard {
        let config = DashboardConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            auth_token: auth_token.map(String::from),
            sessions: Default::default(),
        };
        let vault = VaultClient::new(VaultConfig::new("p-test", "k", "http://127.0.0.1:1"));
        Dashboard::new(
            config,
            DashboardState::new(Arc::new(ScriptedProvider::new()), vault),
        )
    }

    #[test]
    fn configured_token_is_used() {
        assert_eq!(dashboard(Some("fixed")).auth_token(), "fixed");
    }

    #[test]
    fn token_is_generated_when_missing() {
        let a = dashboard(None);
        let b = dashboard(Some(""));
        assert_eq!(a.auth_token().len(), 32);
        assert!(a.auth_token().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a.auth_token(), b.auth_token());
    }

    #[tokio::test]
    async fn shutdown_before_start_is_an_error() {
        assert!(dashboard(None).shutdown().await.is_err());
    }

    #[tokio::test]
    async fn start_then_shutdown() {
        let dash = dashboard(Some("t"));
        let addr = dash.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        dash.shutdown().await.unwrap();
    }
}
