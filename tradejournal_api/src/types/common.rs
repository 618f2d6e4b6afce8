use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a stored row. The store hands out integer keys for some
/// tables and UUID strings for others.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

/// A timestamp column as delivered by the store or a user import.
///
/// Kept unparsed: rows with unusable timestamps must still deserialize so the
/// normalizer can drop them individually instead of failing the whole page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// Fractional milliseconds since the Unix epoch.
    FractionalMillis(f64),
    Text(String),
    /// Anything else (booleans, objects). Never parses.
    Other(serde_json::Value),
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}
