//! Profit and loss statement over an already filtered trade set.

use serde::Serialize;

use crate::source::{supplemental_fees, FeeLedger, RetryPolicy};
use crate::trade::{sum_amounts, Trade};

/// Income-statement style summary of a period.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PlStatement {
    pub period: String,
    pub total_revenue: f64,
    /// Positive magnitude of losing trades.
    pub total_costs: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    /// Per-trade fees, one half of operating expenses.
    pub trade_fees: f64,
    /// Fees from the external ledger, the other half.
    pub supplemental_fees: f64,
    pub net_profit: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage in `0..=100`.
    pub win_rate: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
}

fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Builds the statement from `trades` and a supplemental fee total.
///
/// Returns `None` for an empty trade set so callers can render an empty state.
pub fn compute_pl_statement(
    trades: &[Trade],
    period: &str,
    supplemental: f64,
) -> Option<PlStatement> {
    if trades.is_empty() {
        return None;
    }

    let wins: Vec<&Trade> = trades.iter().filter(|t| t.is_win()).collect();
    let losses: Vec<&Trade> = trades.iter().filter(|t| t.is_loss()).collect();

    let total_revenue = sum_amounts(wins.iter().map(|t| t.pnl));
    let total_costs = sum_amounts(losses.iter().map(|t| t.pnl.abs()));
    let gross_profit = total_revenue - total_costs;
    let trade_fees = sum_amounts(trades.iter().map(|t| t.fees));
    let operating_expenses = trade_fees + supplemental;

    Some(PlStatement {
        period: period.to_string(),
        total_revenue,
        total_costs,
        gross_profit,
        operating_expenses,
        trade_fees,
        supplemental_fees: supplemental,
        net_profit: gross_profit - operating_expenses,
        trade_count: trades.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: average(wins.len() as f64 * 100.0, trades.len()),
        avg_win: average(total_revenue, wins.len()),
        avg_loss: average(total_costs, losses.len()),
    })
}

/// Looks up the supplemental fees `user_id` booked against `trades` in
/// `ledger`, then builds the statement. A failing or slow ledger contributes
/// zero.
pub async fn build_pl_statement<L: FeeLedger>(
    trades: &[Trade],
    period: &str,
    ledger: &L,
    user_id: &str,
    policy: &RetryPolicy,
) -> Option<PlStatement> {
    if trades.is_empty() {
        return None;
    }
    let supplemental = supplemental_fees(ledger, user_id, trades, policy).await;
    compute_pl_statement(trades, period, supplemental)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use crate::trade::{Side, TradeType};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    fn trade(id: &str, pnl: f64, fees: f64) -> Trade {
        Trade {
            id: id.to_string(),
            symbol: "ES".to_string(),
            side: Side::Long,
            quantity: 1.0,
            entry_price: 10.0,
            exit_price: Some(11.0),
            entry_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            exit_date: None,
            pnl,
            fees,
            trade_type: TradeType::Futures,
            swap: None,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            base_backoff: Duration::from_millis(10),
        }
    }

    struct CountingLedger {
        total: f64,
        calls: AtomicUsize,
    }

    impl FeeLedger for CountingLedger {
        async fn sum_fees(&self, _user_id: &str, _trade_ids: &[String]) -> Result<f64, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.total)
        }
    }

    struct BrokenLedger;

    impl FeeLedger for BrokenLedger {
        async fn sum_fees(&self, _user_id: &str, _trade_ids: &[String]) -> Result<f64, SourceError> {
            Err(SourceError::Unavailable("fees table missing".to_string()))
        }
    }

    struct StalledLedger;

    impl FeeLedger for StalledLedger {
        async fn sum_fees(&self, _user_id: &str, _trade_ids: &[String]) -> Result<f64, SourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(99.0)
        }
    }

    #[tokio::test]
    async fn single_winner_with_supplemental_fee() {
        let ledger = CountingLedger {
            total: 5.0,
            calls: AtomicUsize::new(0),
        };
        let trades = vec![trade("1", 200.0, 10.0)];
        let pl = build_pl_statement(&trades, "All time", &ledger, "u1", &policy())
            .await
            .unwrap();
        assert!((pl.gross_profit - 200.0).abs() < EPSILON);
        assert!((pl.operating_expenses - 15.0).abs() < EPSILON);
        assert!((pl.net_profit - 185.0).abs() < EPSILON);
        assert!((pl.win_rate - 100.0).abs() < EPSILON);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_set_yields_no_statement_and_skips_ledger() {
        let ledger = CountingLedger {
            total: 5.0,
            calls: AtomicUsize::new(0),
        };
        assert!(build_pl_statement(&[], "All time", &ledger, "u1", &policy())
            .await
            .is_none());
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ledger_failure_uses_trade_fees_only() {
        let trades = vec![trade("1", 50.0, 2.0), trade("2", -20.0, 3.0)];
        let pl = build_pl_statement(&trades, "All time", &BrokenLedger, "u1", &policy())
            .await
            .unwrap();
        assert!((pl.operating_expenses - 5.0).abs() < EPSILON);
        assert_eq!(pl.supplemental_fees, 0.0);
        assert!((pl.net_profit - 25.0).abs() < EPSILON);
    }

    #[tokio::test]
    async fn ledger_timeout_uses_trade_fees_only() {
        tokio::time::pause();
        let trades = vec![trade("1", 50.0, 2.0)];
        let pl = build_pl_statement(&trades, "All time", &StalledLedger, "u1", &policy())
            .await
            .unwrap();
        assert!((pl.operating_expenses - 2.0).abs() < EPSILON);
    }

    #[test]
    fn ratios_never_divide_by_zero() {
        let flat = compute_pl_statement(&[trade("1", 0.0, 0.0)], "p", 0.0).unwrap();
        assert_eq!(flat.win_rate, 0.0);
        assert_eq!(flat.avg_win, 0.0);
        assert_eq!(flat.avg_loss, 0.0);
        assert!(!flat.win_rate.is_nan());

        let winners_only = compute_pl_statement(&[trade("1", 30.0, 0.0)], "p", 0.0).unwrap();
        assert!((winners_only.avg_win - 30.0).abs() < EPSILON);
        assert_eq!(winners_only.avg_loss, 0.0);
    }

    #[test]
    fn averages_and_counts() {
        let trades = vec![
            trade("1", 30.0, 1.0),
            trade("2", 10.0, 1.0),
            trade("3", -8.0, 1.0),
            trade("4", -4.0, 1.0),
            trade("5", 0.0, 1.0),
        ];
        let pl = compute_pl_statement(&trades, "2025-01-01 to 2025-01-31", 1.5).unwrap();
        assert_eq!(pl.period, "2025-01-01 to 2025-01-31");
        assert_eq!(pl.trade_count, 5);
        assert_eq!(pl.winning_trades, 2);
        assert_eq!(pl.losing_trades, 2);
        assert!((pl.total_revenue - 40.0).abs() < EPSILON);
        assert!((pl.total_costs - 12.0).abs() < EPSILON);
        assert!((pl.avg_win - 20.0).abs() < EPSILON);
        assert!((pl.avg_loss - 6.0).abs() < EPSILON);
        assert!((pl.win_rate - 40.0).abs() < EPSILON);
        assert!((pl.operating_expenses - 6.5).abs() < EPSILON);
        assert!((pl.net_profit - 21.5).abs() < EPSILON);
    }
}
