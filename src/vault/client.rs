//! Akeyless REST API client.

use serde_json::{Value, json};

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::vault::path::{clean_secret_name, normalize_list_path};
use crate::vault::types::{SecretCountSummary, SecretItem};

/// Vault gateway client.
///
/// Holds only the immutable credentials; each operation fetches a fresh
/// session token before its request.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    config: VaultConfig,
}

impl VaultClient {
    fn user_agent() -> String {
        format!("vault-chat/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Create a client for the given credentials.
    pub fn new(config: VaultConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Base URL of the gateway in use.
    pub fn gateway_url(&self) -> &str {
        &self.config.gateway_url
    }

    /// Exchange the access id/key for a session token.
    pub async fn authenticate(&self) -> Result<String, VaultError> {
        let body = json!({
            "access-id": self.config.access_id,
            "access-key": self.config.access_key(),
        });

        let response = self.post("/auth", &body).await.map_err(|e| {
            tracing::warn!(error = %e, "Akeyless authentication failed");
            VaultError::AuthFailed {
                reason: match e.detail() {
                    Some(detail) => format!("{e}: {detail}"),
                    None => e.to_string(),
                },
            }
        })?;

        response
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| VaultError::AuthFailed {
                reason: "response did not include a token".to_string(),
            })
    }

    /// Fetch a static secret and classify its value.
    pub async fn get_static_secret(&self, name: &str) -> Result<SecretItem, VaultError> {
        self.get_named_value("/get-secret-value", name).await
    }

    /// Fetch the current value of a rotated secret.
    pub async fn get_rotated_secret(&self, name: &str) -> Result<SecretItem, VaultError> {
        self.get_named_value("/get-rotated-secret-value", name).await
    }

    /// Generate a dynamic secret. The response shape depends on the
    /// producer, so it is returned as-is.
    pub async fn get_dynamic_secret(&self, name: &str) -> Result<Value, VaultError> {
        let token = self.authenticate().await?;
        let body = json!({ "token": token, "name": clean_secret_name(name) });
        self.post("/get-dynamic-secret-value", &body).await
    }

    /// List items under `path`, optionally filtered by item type.
    pub async fn list_items(
        &self,
        path: &str,
        type_filter: Option<&str>,
    ) -> Result<Value, VaultError> {
        let token = self.authenticate().await?;
        let mut body = json!({ "token": token, "path": normalize_list_path(path) });
        if let Some(filter) = type_filter.filter(|f| !f.is_empty()) {
            body["type"] = json!(filter);
        }
        self.post("/list-items", &body).await
    }

    /// Fetch item metadata.
    pub async fn describe_item(&self, name: &str) -> Result<Value, VaultError> {
        let token = self.authenticate().await?;
        let body = json!({ "token": token, "name": clean_secret_name(name) });
        self.post("/describe-item", &body).await
    }

    /// Count items under `path` by type. A listing failure is returned unchanged.
    pub async fn count_by_type(&self, path: &str) -> Result<SecretCountSummary, VaultError> {
        let listing = self.list_items(path, None).await?;
        Ok(SecretCountSummary::from_listing(&listing))
    }

    async fn get_named_value(&self, endpoint: &str, name: &str) -> Result<SecretItem, VaultError> {
        let token = self.authenticate().await?;
        let clean = clean_secret_name(name);
        let body = json!({ "token": token, "names": [clean], "json": false });
        let response = self.post(endpoint, &body).await?;
        tracing::debug!(endpoint, "Retrieved secret value");
        Ok(SecretItem::from_response(name, clean, response))
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, VaultError> {
        let url = format!("{}{endpoint}", self.config.gateway_url);
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, Self::user_agent())
            .json(body)
            .send()
            .await
            .map_err(|source| VaultError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = resp.status();
        tracing::debug!(endpoint, status = status.as_u16(), "Vault response");

        if !status.is_success() {
            let detail = resp.text().await.ok().filter(|t| !t.is_empty());
            return Err(VaultError::RequestFailed {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| VaultError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}
