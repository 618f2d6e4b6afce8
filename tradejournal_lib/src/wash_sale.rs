//! Wash-sale detection over realized trades.
//!
//! A losing trade is flagged when another realized trade on the same symbol
//! and side was entered after it, no later than 30 days past its entry. The
//! candidate search spans the whole list regardless of position, but only
//! later entries qualify: an earlier trade never counts as a repurchase.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::trade::{Side, Trade};

/// Repurchase window after a losing trade's entry.
pub const WASH_SALE_WINDOW_DAYS: i64 = 30;

/// A loss disallowed under the wash-sale rule.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WashSaleFlag {
    pub loss_trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub loss_entry_date: DateTime<Utc>,
    pub disallowed_amount: f64,
    pub repurchase_trade_id: String,
    pub repurchase_entry_date: DateTime<Utc>,
}

/// Total disallowed amount plus the individual flags, in input order.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct WashSaleResult {
    pub adjustments: f64,
    pub flags: Vec<WashSaleFlag>,
}

/// Flags disallowed losses among `realized` (expected in entry order).
///
/// Each loss is flagged at most once; the first qualifying repurchase in list
/// order is reported.
pub fn detect_wash_sales(realized: &[&Trade]) -> WashSaleResult {
    let window = TimeDelta::days(WASH_SALE_WINDOW_DAYS);

    let mut by_key: HashMap<(&str, Side), Vec<&Trade>> = HashMap::new();
    for trade in realized {
        by_key
            .entry((trade.symbol.as_str(), trade.side))
            .or_default()
            .push(*trade);
    }

    let mut result = WashSaleResult::default();
    for loss in realized.iter().filter(|t| t.is_loss()) {
        let deadline = loss.entry_date + window;
        let candidates = by_key
            .get(&(loss.symbol.as_str(), loss.side))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let repurchase = candidates
            .iter()
            .find(|r| r.entry_date > loss.entry_date && r.entry_date <= deadline);

        if let Some(repurchase) = repurchase {
            let disallowed = loss.pnl.abs();
            result.adjustments += disallowed;
            result.flags.push(WashSaleFlag {
                loss_trade_id: loss.id.clone(),
                symbol: loss.symbol.clone(),
                side: loss.side,
                loss_entry_date: loss.entry_date,
                disallowed_amount: disallowed,
                repurchase_trade_id: repurchase.id.clone(),
                repurchase_entry_date: repurchase.entry_date,
            });
        }
    }

    result
}
