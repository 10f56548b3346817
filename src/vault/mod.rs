//! Akeyless vault gateway.
//!
//! A stateless HTTP client over the vault's REST surface. Every operation
//! authenticates first (no token reuse) and returns a [`VaultError`] on any
//! failure; [`tagged`] turns an outcome into the JSON shape handed to the
//! model and the dashboard.

mod client;
mod path;
mod types;

pub use client::VaultClient;
pub use path::{clean_secret_name, normalize_list_path};
pub use types::{ItemType, SecretCountSummary, SecretItem, SecretValue};

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::VaultError;

/// Render a gateway outcome as JSON. Failures become `{"error": ...}`,
/// with `detail` carrying the vault's response body when there was one.
pub fn tagged<T: Serialize>(result: Result<T, VaultError>) -> Value {
    match result {
        Ok(value) => serde_json::to_value(value)
            .unwrap_or_else(|e| json!({ "error": format!("failed to encode result: {e}") })),
        Err(err) => error_value(&err),
    }
}

/// The `{"error": ...}` value for a failure.
pub fn error_value(err: &VaultError) -> Value {
    match err.detail() {
        Some(detail) => json!({ "error": err.to_string(), "detail": detail }),
        None => json!({ "error": err.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_error_carries_detail() {
        let err = VaultError::RequestFailed {
            endpoint: "/get-secret-value".into(),
            status: 404,
            detail: Some("item not found".into()),
        };
        let value = tagged::<Value>(Err(err));
        assert_eq!(value["error"], "/get-secret-value returned HTTP 404");
        assert_eq!(value["detail"], "item not found");
    }

    #[test]
    fn tagged_ok_passes_through() {
        let value = tagged::<Value>(Ok(json!({"items": []})));
        assert_eq!(value, json!({"items": []}));
    }
}
