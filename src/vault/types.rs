//! Secret items and listing summaries returned by the vault gateway.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Kind of a vault item, derived from the listing's `item_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Static,
    Rotated,
    Dynamic,
    Other,
}

impl ItemType {
    pub const ALL: [ItemType; 4] = [Self::Static, Self::Rotated, Self::Dynamic, Self::Other];

    /// Classify a raw vault type string such as `STATIC_SECRET`.
    ///
    /// Case-insensitive substring match, checked in the order
    /// STATIC, ROTATED, DYNAMIC.
    pub fn classify(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("STATIC") {
            Self::Static
        } else if upper.contains("ROTATED") {
            Self::Rotated
        } else if upper.contains("DYNAMIC") {
            Self::Dynamic
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rotated => "rotated",
            Self::Dynamic => "dynamic",
            Self::Other => "other",
        }
    }
}

/// The value half of a fetched secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretValue {
    /// The raw value was a JSON object; its fields are exposed.
    Structured { fields: Map<String, Value> },
    /// Any other string value, unchanged.
    Simple { value: String },
    /// The vault answered with something other than a string for this name.
    Raw { value: Value },
}

impl SecretValue {
    /// Classify a raw string value. Only JSON objects count as structured;
    /// arrays, scalars and plain text stay simple.
    pub fn classify(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Self::Structured { fields },
            _ => Self::Simple {
                value: raw.to_string(),
            },
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }
}

/// A fetched static or rotated secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretItem {
    /// Name as the caller supplied it.
    pub name: String,
    #[serde(flatten)]
    pub value: SecretValue,
}

impl SecretItem {
    /// Build an item from a `get-*-secret-value` response body, which maps
    /// each requested name to its value.
    pub(crate) fn from_response(name: &str, clean_name: &str, body: Value) -> Self {
        let value = match body {
            Value::Object(mut map) if map.contains_key(clean_name) => {
                match map.remove(clean_name).unwrap_or(Value::Null) {
                    Value::String(raw) => SecretValue::classify(&raw),
                    other => SecretValue::Raw { value: other },
                }
            }
            other => SecretValue::Raw { value: other },
        };
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Secret counts per type, recomputed from a full listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretCountSummary {
    pub total: usize,
    names: BTreeMap<ItemType, Vec<String>>,
}

impl SecretCountSummary {
    /// Bucket every entry of a `list-items` response by its `item_type`.
    pub fn from_listing(listing: &Value) -> Self {
        let mut names: BTreeMap<ItemType, Vec<String>> =
            ItemType::ALL.iter().map(|t| (*t, Vec::new())).collect();

        let items = listing
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for item in items {
            let item_type = item.get("item_type").and_then(Value::as_str).unwrap_or("");
            let item_name = item
                .get("item_name")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            names
                .entry(ItemType::classify(item_type))
                .or_default()
                .push(item_name.to_string());
        }

        Self {
            total: items.len(),
            names,
        }
    }

    pub fn count(&self, item_type: ItemType) -> usize {
        self.names.get(&item_type).map_or(0, Vec::len)
    }

    pub fn names(&self, item_type: ItemType) -> &[String] {
        self.names.get(&item_type).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Serialize for SecretCountSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            counts: BTreeMap<&'static str, usize>,
            items_by_type: BTreeMap<&'static str, &'a [String]>,
        }

        let mut counts = BTreeMap::from([("total", self.total)]);
        let mut items_by_type = BTreeMap::new();
        for item_type in ItemType::ALL {
            counts.insert(item_type.as_str(), self.count(item_type));
            items_by_type.insert(item_type.as_str(), self.names(item_type));
        }

        Wire {
            counts,
            items_by_type,
        }
        .serialize(serializer)
    }
}
