//! Refresh sequencing: load, filter, then rebuild both reports.
//!
//! Every refresh takes a monotonically increasing token when it is triggered.
//! A refresh settles either with a snapshot or with "no data", and a finished
//! refresh is discarded once any refresh triggered after it has settled. A
//! slow fee lookup can therefore never overwrite a newer outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::TimeZone;
use serde::Serialize;

use crate::pnl::{build_pl_statement, PlStatement};
use crate::range::{filter_by_date_range, period_label, DateRange};
use crate::source::{load_trades, FeeLedger, RecordSource, RetryPolicy, TradeLoad};
use crate::tax::{build_tax_report, TaxReport};
use crate::trade::Trade;

/// Trigger-order ticket for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RefreshToken(u64);

impl RefreshToken {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Reports produced by one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub sequence: u64,
    pub period: String,
    /// The filtered trades both reports were built from.
    pub trades: Vec<Trade>,
    pub tax: TaxReport,
    /// `None` when the range holds no trades.
    pub pnl: Option<PlStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Committed(ReportSnapshot),
    /// A newer refresh settled or was triggered first; this result was discarded.
    Stale,
    NoData { reason: String },
}

/// Latest settled refresh. `snapshot` is `None` when it found no data.
#[derive(Debug, Default)]
struct Settled {
    sequence: u64,
    snapshot: Option<ReportSnapshot>,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    issued: AtomicU64,
    settled: Mutex<Settled>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RefreshToken {
        RefreshToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True if no refresh has been triggered since `token`.
    pub fn is_current(&self, token: RefreshToken) -> bool {
        self.issued.load(Ordering::SeqCst) == token.0
    }

    /// Stores `snapshot` unless a newer refresh already settled.
    pub fn commit(&self, token: RefreshToken, snapshot: ReportSnapshot) -> bool {
        self.settle(token, Some(snapshot))
    }

    /// Records that the refresh behind `token` found no data, clearing the
    /// previous snapshot unless a newer refresh already settled.
    pub fn settle_no_data(&self, token: RefreshToken) -> bool {
        self.settle(token, None)
    }

    fn settle(&self, token: RefreshToken, snapshot: Option<ReportSnapshot>) -> bool {
        let mut settled = self.settled.lock().unwrap_or_else(|e| e.into_inner());
        if settled.sequence > token.0 {
            tracing::debug!(
                "Discarding stale refresh #{} (#{} already settled)",
                token.0,
                settled.sequence
            );
            return false;
        }
        *settled = Settled {
            sequence: token.0,
            snapshot,
        };
        true
    }

    /// Snapshot of the newest settled refresh, if it had data.
    pub fn latest(&self) -> Option<ReportSnapshot> {
        self.settled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .clone()
    }
}

/// Parameters of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRequest {
    pub user_id: String,
    pub range: Option<DateRange>,
    pub tax_year: i32,
}

/// Ties a record source and fee ledger to the report builders.
pub struct ReportEngine<S, L, Tz> {
    source: S,
    ledger: L,
    tz: Tz,
    policy: RetryPolicy,
    coordinator: RefreshCoordinator,
}

impl<S, L, Tz> ReportEngine<S, L, Tz>
where
    S: RecordSource,
    L: FeeLedger,
    Tz: TimeZone,
{
    pub fn new(source: S, ledger: L, tz: Tz) -> Self {
        Self {
            source,
            ledger,
            tz,
            policy: RetryPolicy::default(),
            coordinator: RefreshCoordinator::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn latest(&self) -> Option<ReportSnapshot> {
        self.coordinator.latest()
    }

    pub async fn refresh(&self, request: &RefreshRequest) -> RefreshOutcome {
        let token = self.coordinator.begin();

        let trades = match load_trades(&self.source, &request.user_id, &self.policy).await {
            TradeLoad::Loaded(trades) => trades,
            TradeLoad::NoData { reason } => {
                return if self.coordinator.settle_no_data(token) {
                    RefreshOutcome::NoData { reason }
                } else {
                    RefreshOutcome::Stale
                };
            }
        };

        if !self.coordinator.is_current(token) {
            tracing::debug!("Refresh #{} superseded before building reports", token.sequence());
            return RefreshOutcome::Stale;
        }

        let in_range = filter_by_date_range(&trades, request.range.as_ref(), &self.tz);
        let period = period_label(request.range.as_ref());

        let tax_input = in_range.clone();
        let tax = build_tax_report(&tax_input, request.tax_year, &self.tz);
        let pnl = build_pl_statement(
            &in_range,
            &period,
            &self.ledger,
            &request.user_id,
            &self.policy,
        )
        .await;

        let snapshot = ReportSnapshot {
            sequence: token.sequence(),
            period,
            trades: in_range,
            tax,
            pnl,
        };

        if self.coordinator.commit(token, snapshot.clone()) {
            RefreshOutcome::Committed(snapshot)
        } else {
            RefreshOutcome::Stale
        }
    }
}
