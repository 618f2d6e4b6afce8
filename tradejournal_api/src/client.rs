//! HTTP client for the trade-journal record store REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    query::{Query, RowQuery, SortDirection},
    types::{FeeRecord, FuturesTradeRecord, SwapTradeRecord},
    Error,
};

const USER_AGENT: &str = concat!("tradejournal/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TRADES_TABLE: &str = "trades";
const SWAP_TRADES_TABLE: &str = "solana_trades";
const FEES_TABLE: &str = "trade_fees";

/// Trade ids per `in.(...)` fee request. Keeps the URL under common gateway
/// limits (about 8 KB) even for UUID ids.
pub const FEE_IDS_PER_REQUEST: usize = 150;

/// HTTP client for the record store.
///
/// Each request builds a fresh `reqwest::Client` with the configured
/// timeout. When an API key is set it is sent both as the `apikey` header
/// and as a bearer token, which is what the hosted store expects.
pub struct Client {
    /// Base URL for the API, without the `/rest/v1` suffix.
    base_api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl Client {
    /// Creates a new client pointing at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_api_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API key sent with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_url(&self, table: &str, query: &impl Query) -> Result<Url, Error> {
        let url = Url::parse(format!("{}/rest/v1/{}", &self.base_api_url, table).as_str())
            .map_err(|e| {
                tracing::error!("Invalid URL constructed: {}", e);
                Error::RequestFailed
            })?;
        Ok(query.add_to_url(&url))
    }

    async fn get<T, Q>(&self, table: &str, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let url = self.get_url(table, query)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;

        let mut request = client
            .get(url)
            .header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("authorization", format!("Bearer {}", key));
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!("Request to '{}' timed out", table);
                Error::Timeout
            } else {
                tracing::error!("Failed to get resource: {}", e);
                Error::RequestFailed
            }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::TableMissing {
                table: table.to_string(),
            });
        }

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let parsed = serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
            Error::RequestFailed
        })?;

        Ok(parsed)
    }

    /// Fetches every futures-style trade for `user_id`, ordered by entry time.
    pub async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, Error> {
        let query = RowQuery::new()
            .with_eq("user_id", user_id)
            .with_order("entry_date", SortDirection::Asc);
        self.get(TRADES_TABLE, &query).await
    }

    /// Fetches every swap trade for `user_id`, ordered by swap timestamp.
    ///
    /// Returns [`Error::TableMissing`] on stores that were provisioned
    /// before swap import existed.
    pub async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, Error> {
        let query = RowQuery::new()
            .with_eq("user_id", user_id)
            .with_order("timestamp", SortDirection::Asc);
        self.get(SWAP_TRADES_TABLE, &query).await
    }

    /// Fetches the fee ledger rows booked against any of `trade_ids`, one
    /// request per [`FEE_IDS_PER_REQUEST`] ids.
    pub async fn list_fees<S: AsRef<str>>(&self, trade_ids: &[S]) -> Result<Vec<FeeRecord>, Error> {
        let mut rows = Vec::new();
        for chunk in trade_ids.chunks(FEE_IDS_PER_REQUEST) {
            let query = RowQuery::new()
                .with_select("trade_id,amount")
                .with_in("trade_id", chunk);
            rows.extend(self.get::<Vec<FeeRecord>, _>(FEES_TABLE, &query).await?);
        }
        Ok(rows)
    }

    /// Sums the fee ledger amounts for `trade_ids`. Rows without an amount count as zero.
    pub async fn sum_fees<S: AsRef<str>>(&self, trade_ids: &[S]) -> Result<f64, Error> {
        let rows = self.list_fees(trade_ids).await?;
        Ok(rows.iter().filter_map(|r| r.amount).sum())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
