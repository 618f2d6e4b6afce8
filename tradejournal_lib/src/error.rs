//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::source::SourceError;

/// Errors surfaced at the library boundary: upstream store and database
/// failures, plus configuration and input validation problems.
#[derive(Debug)]
pub enum JournalError {
    /// An error from the hosted record store client.
    Api(tradejournal_api::Error),
    /// A local journal database operation failed.
    Db(DbError),
    /// A record source or fee ledger call failed after retries.
    Source(SourceError),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    Config(ConfigError),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Db(e) => write!(f, "Database error: {}", e),
            Self::Source(e) => write!(f, "Source error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Db(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<tradejournal_api::Error> for JournalError {
    fn from(e: tradejournal_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<DbError> for JournalError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<SourceError> for JournalError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<ConfigError> for JournalError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
