//! Capital-gains tax report for one calendar year.

use chrono::{Datelike, TimeZone};
use serde::Serialize;

use crate::trade::{sum_amounts, Trade};
use crate::wash_sale::{detect_wash_sales, WashSaleFlag};

/// Holding period at or above which a gain is long-term.
pub const LONG_TERM_HOLDING_DAYS: i64 = 365;

const LONG_TERM_HOLDING_MS: i64 = LONG_TERM_HOLDING_DAYS * 24 * 60 * 60 * 1000;

/// Realized gains and losses for a tax year.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TaxReport {
    pub year: i32,
    pub total_realized_gains: f64,
    /// Positive magnitude.
    pub total_realized_losses: f64,
    pub net_capital_gains: f64,
    pub wash_sale_adjustments: f64,
    pub short_term_gains: f64,
    pub long_term_gains: f64,
    pub total_fees: f64,
    pub realized_trade_count: usize,
    pub wash_sales: Vec<WashSaleFlag>,
}

impl TaxReport {
    /// An all-zero report for `year`.
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            total_realized_gains: 0.0,
            total_realized_losses: 0.0,
            net_capital_gains: 0.0,
            wash_sale_adjustments: 0.0,
            short_term_gains: 0.0,
            long_term_gains: 0.0,
            total_fees: 0.0,
            realized_trade_count: 0,
            wash_sales: Vec::new(),
        }
    }
}

fn is_short_term(trade: &Trade) -> bool {
    trade
        .holding_period()
        .is_some_and(|held| held.num_milliseconds() < LONG_TERM_HOLDING_MS)
}

/// Builds the report for trades entered during `year` in `tz`.
///
/// Open positions are ignored. No realized trades yields [`TaxReport::empty`].
pub fn build_tax_report<Tz: TimeZone>(trades: &[Trade], year: i32, tz: &Tz) -> TaxReport {
    let realized: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.entry_date.with_timezone(tz).year() == year)
        .filter(|t| t.is_realized())
        .collect();

    if realized.is_empty() {
        return TaxReport::empty(year);
    }

    let total_realized_gains = sum_amounts(realized.iter().filter(|t| t.is_win()).map(|t| t.pnl));
    let total_realized_losses =
        sum_amounts(realized.iter().filter(|t| t.is_loss()).map(|t| t.pnl.abs()));

    let wash_sales = detect_wash_sales(&realized);

    let short_term_gains = sum_amounts(
        realized
            .iter()
            .filter(|t| t.is_win() && is_short_term(t))
            .map(|t| t.pnl),
    );

    TaxReport {
        year,
        total_realized_gains,
        total_realized_losses,
        net_capital_gains: total_realized_gains - total_realized_losses,
        wash_sale_adjustments: wash_sales.adjustments,
        short_term_gains,
        long_term_gains: total_realized_gains - short_term_gains,
        total_fees: sum_amounts(realized.iter().map(|t| t.fees)),
        realized_trade_count: realized.len(),
        wash_sales: wash_sales.flags,
    }
}
