use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Measurements grouped by host, then by item key.
///
/// An empty JSON array as value means "nothing to report for this key".
pub type HostMetrics = BTreeMap<String, BTreeMap<String, Value>>;

/// How item values are encoded inside the sender envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Plain trapper items, value sent verbatim.
    Items,
    /// Low-level discovery, value wrapped as `{"data": value}` and sent as a JSON string.
    Lld,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Items => "items",
            DataType::Lld => "lld",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "items" => Ok(DataType::Items),
            "lld" => Ok(DataType::Lld),
            other => Err(ValidationError::DataType(other.to_string())),
        }
    }
}

/// One fact reported to the trapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub host: String,
    pub key: String,
    pub value: Value,
    pub clock: i64,
}

impl Item {
    /// Builds an item whose value is stored as given.
    pub fn new(host: impl Into<String>, key: impl Into<String>, value: Value, clock: i64) -> Self {
        Self {
            host: host.into(),
            key: key.into(),
            value,
            clock,
        }
    }

    /// Builds a discovery item: `value` becomes the JSON string `{"data": value}`.
    pub fn discovery(
        host: impl Into<String>,
        key: impl Into<String>,
        value: Value,
        clock: i64,
    ) -> Result<Self, serde_json::Error> {
        let mut envelope = serde_json::Map::with_capacity(1);
        envelope.insert("data".to_string(), value);
        let encoded = serde_json::to_string(&Value::Object(envelope))?;
        Ok(Self::new(host, key, Value::String(encoded), clock))
    }

    /// Short human readable form of the value, for per-item diagnostics.
    pub fn value_display(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
