use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scalar metadata value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Value type of a [`MetadataValue`], used to derive padding defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
}

impl MetadataValue {
    #[must_use]
    pub fn kind(&self) -> MetadataKind {
        match self {
            Self::Null => MetadataKind::Null,
            Self::Bool(_) => MetadataKind::Bool,
            Self::Integer(_) => MetadataKind::Integer,
            Self::Float(_) => MetadataKind::Float,
            Self::Text(_) => MetadataKind::Text,
        }
    }

    /// Zero value for `kind`: empty string, `0`, `0.0`, `false`, or null.
    #[must_use]
    pub fn zero_of(kind: MetadataKind) -> Self {
        match kind {
            MetadataKind::Null => Self::Null,
            MetadataKind::Bool => Self::Bool(false),
            MetadataKind::Integer => Self::Integer(0),
            MetadataKind::Float => Self::Float(0.0),
            MetadataKind::Text => Self::Text(String::new()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Convert a stored payload value back into metadata.
    ///
    /// Arrays and objects are not produced by the loaders; if a store returns
    /// one it is kept as its JSON text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The `source` metadata field, if it is text.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(MetadataValue::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
    pub chunk_index: usize,
}
