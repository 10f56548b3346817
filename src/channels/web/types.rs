//! Request and response types for the dashboard API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub channel: &'static str,
}

// --- Sessions ---

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
}

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Who wrote a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
}

/// One line of the dashboard chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatEntry>,
}

// --- Secret browser ---

fn default_path() -> String {
    "/".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListSecretsQuery {
    #[serde(default = "default_path")]
    pub path: String,
    /// Type filter as shown in the browser; absent, empty or `all` means none.
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
}

impl ListSecretsQuery {
    pub fn type_filter(&self) -> Option<&str> {
        self.item_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("all"))
    }
}

#[derive(Debug, Deserialize)]
pub struct SecretValueQuery {
    pub name: String,
    pub item_type: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_path")]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_query(item_type: Option<&str>) -> ListSecretsQuery {
        ListSecretsQuery {
            path: "/".into(),
            item_type: item_type.map(String::from),
        }
    }

    #[test]
    fn type_filter_ignores_all_and_blank() {
        assert_eq!(list_query(None).type_filter(), None);
        assert_eq!(list_query(Some("All")).type_filter(), None);
        assert_eq!(list_query(Some("  ")).type_filter(), None);
        assert_eq!(list_query(Some("static")).type_filter(), Some("static"));
    }

    #[test]
    fn chat_entry_serializes_lowercase_role() {
        let entry = ChatEntry::new(ChatRole::Agent, "hi");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "agent");
        assert_eq!(json["content"], "hi");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn list_query_defaults_to_root() {
        let q: ListSecretsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.path, "/");
        assert!(q.item_type.is_none());
    }
}
