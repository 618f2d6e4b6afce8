//! Error types for the API client.

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error or unexpected response).
    #[error("Request failed")]
    RequestFailed,
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// The requested table does not exist on the record store (HTTP 404).
    #[error("Table '{table}' does not exist")]
    TableMissing { table: String },
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed | Self::Timeout => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::TableMissing { .. } => false,
        }
    }
}
