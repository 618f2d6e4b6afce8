//! Collaborator seams: where trades and supplemental fees come from.
//!
//! [`RecordSource`] and [`FeeLedger`] are implemented by the hosted record
//! store client and by the local SQLite [`Db`]. Both are driven through the
//! same [`RetryPolicy`]: every attempt is bounded by a timeout and transient
//! failures back off exponentially with jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tradejournal_api::types::{FuturesTradeRecord, SwapTradeRecord};

use crate::db::{Db, DbError};
use crate::normalize::normalize_trades;
use crate::trade::Trade;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Errors from a record source or fee ledger call.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("record store error: {0}")]
    Api(#[from] tradejournal_api::Error),
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            Self::Timeout(_) => true,
            Self::Db(_) | Self::Unavailable(_) => false,
        }
    }
}

/// Where raw trade rows come from, ordered by entry time.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, SourceError>;
    async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, SourceError>;
}

/// External ledger of fees a user booked against their trades.
#[allow(async_fn_in_trait)]
pub trait FeeLedger {
    async fn sum_fees(&self, user_id: &str, trade_ids: &[String]) -> Result<f64, SourceError>;
}

impl<T: RecordSource> RecordSource for &T {
    async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, SourceError> {
        (**self).list_trades(user_id).await
    }

    async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, SourceError> {
        (**self).list_swap_trades(user_id).await
    }
}

impl<T: FeeLedger> FeeLedger for &T {
    async fn sum_fees(&self, user_id: &str, trade_ids: &[String]) -> Result<f64, SourceError> {
        (**self).sum_fees(user_id, trade_ids).await
    }
}

impl RecordSource for tradejournal_api::Client {
    async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, SourceError> {
        Ok(tradejournal_api::Client::list_trades(self, user_id).await?)
    }

    async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, SourceError> {
        Ok(tradejournal_api::Client::list_swap_trades(self, user_id).await?)
    }
}

/// The hosted store only serves fee rows owned by the API key's user, so the
/// lookup filters on trade ids alone.
impl FeeLedger for tradejournal_api::Client {
    async fn sum_fees(&self, _user_id: &str, trade_ids: &[String]) -> Result<f64, SourceError> {
        Ok(tradejournal_api::Client::sum_fees(self, trade_ids).await?)
    }
}

impl RecordSource for Db {
    async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, SourceError> {
        Ok(Db::list_trades(self, user_id)?)
    }

    async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, SourceError> {
        Ok(Db::list_swap_trades(self, user_id)?)
    }
}

impl FeeLedger for Db {
    async fn sum_fees(&self, user_id: &str, trade_ids: &[String]) -> Result<f64, SourceError> {
        Ok(Db::sum_fees(self, user_id, trade_ids)?)
    }
}

/// Timeout and retry budget shared by record-source and fee-ledger calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }
}

/// Runs `operation` under `policy`.
///
/// - Each attempt is cut off after `policy.timeout`.
/// - Timeouts and transient errors wait `base_backoff * 2^attempt` plus up to
///   half of `base_backoff` of jitter, then retry.
/// - Permanent errors return immediately.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T, SourceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match timeout(policy.timeout, operation()).await {
            Ok(Ok(val)) => return Ok(val),
            Ok(Err(e)) => e,
            Err(_) => SourceError::Timeout(policy.timeout),
        };

        if !err.is_transient() || attempt >= policy.max_retries {
            return Err(err);
        }

        let delay = backoff_delay(policy.base_backoff, attempt);
        tracing::debug!(
            "Attempt {} failed ({}), retrying in {:?}",
            attempt + 1,
            err,
            delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}

/// `base * 2^attempt` plus up to `base / 2` of jitter, saturating at
/// `Duration::MAX` for oversized configured backoffs.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let backoff = base
        .checked_mul(1u32 << attempt.min(16))
        .unwrap_or(Duration::MAX);
    let jitter_cap = u64::try_from(base.as_millis() / 2).unwrap_or(u64::MAX);
    let jitter = if jitter_cap > 0 {
        Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_cap))
    } else {
        Duration::ZERO
    };
    backoff.saturating_add(jitter)
}

/// Outcome of loading a user's trades.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeLoad {
    /// Normalized trades, entry-time ascending. May be empty.
    Loaded(Vec<Trade>),
    /// The primary source could not be read; render an empty or sign-in state.
    NoData { reason: String },
}

impl TradeLoad {
    pub fn into_trades(self) -> Option<Vec<Trade>> {
        match self {
            TradeLoad::Loaded(trades) => Some(trades),
            TradeLoad::NoData { .. } => None,
        }
    }
}

/// Loads and normalizes both record collections for `user_id`.
///
/// A failing swap source degrades to no swap trades with a warning. A failing
/// futures source, or a blank user id, yields [`TradeLoad::NoData`].
pub async fn load_trades<S: RecordSource>(
    source: &S,
    user_id: &str,
    policy: &RetryPolicy,
) -> TradeLoad {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return TradeLoad::NoData {
            reason: "no user context".to_string(),
        };
    }

    let (futures, swaps) = tokio::join!(
        with_retry(policy, || source.list_trades(user_id)),
        with_retry(policy, || source.list_swap_trades(user_id)),
    );

    let futures = match futures {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Trade source unavailable for user {}: {}", user_id, e);
            return TradeLoad::NoData {
                reason: e.to_string(),
            };
        }
    };

    let swaps = swaps.unwrap_or_else(|e| {
        tracing::warn!("Swap trades unavailable, continuing without them: {}", e);
        Vec::new()
    });

    TradeLoad::Loaded(normalize_trades(&futures, &swaps))
}

/// Sums the supplemental fees `user_id` booked against `trades`. Any failure,
/// including a timeout, degrades to zero with a warning.
pub async fn supplemental_fees<L: FeeLedger>(
    ledger: &L,
    user_id: &str,
    trades: &[Trade],
    policy: &RetryPolicy,
) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let ids: Vec<String> = trades.iter().map(|t| t.id.clone()).collect();
    match with_retry(policy, || ledger.sum_fees(user_id, &ids)).await {
        Ok(total) if total.is_finite() => total,
        Ok(total) => {
            tracing::warn!("Fee ledger returned non-finite total {}, ignoring", total);
            0.0
        }
        Err(e) => {
            tracing::warn!("Supplemental fee lookup failed, using 0: {}", e);
            0.0
        }
    }
}
