//! Inclusive calendar-day range filter over trade entry times.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::trade::Trade;

/// An inclusive range of calendar days, interpreted in a caller-chosen zone.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// A single calendar day.
    pub fn day(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// Start of `from` (00:00:00.000) and end of `to` (23:59:59.999) in `tz`,
    /// as UTC instants. `None` when the range is inverted or a boundary does
    /// not exist locally.
    pub fn bounds<Tz: TimeZone>(&self, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.is_valid() {
            return None;
        }
        let start = tz
            .from_local_datetime(&self.from.and_hms_milli_opt(0, 0, 0, 0)?)
            .earliest()?;
        let end = tz
            .from_local_datetime(&self.to.and_hms_milli_opt(23, 59, 59, 999)?)
            .latest()?;
        Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    /// Human-readable label used as the P&L statement period.
    pub fn label(&self) -> String {
        if self.from == self.to {
            self.from.format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{} to {}",
                self.from.format("%Y-%m-%d"),
                self.to.format("%Y-%m-%d")
            )
        }
    }
}

/// Period label for an optional range.
pub fn period_label(range: Option<&DateRange>) -> String {
    match range {
        Some(range) if range.is_valid() => range.label(),
        _ => "All time".to_string(),
    }
}

/// Returns the trades whose entry falls within `range`, boundaries included.
///
/// An absent or unusable range returns every trade unchanged.
pub fn filter_by_date_range<Tz: TimeZone>(
    trades: &[Trade],
    range: Option<&DateRange>,
    tz: &Tz,
) -> Vec<Trade> {
    let Some(range) = range else {
        return trades.to_vec();
    };
    let Some((start, end)) = range.bounds(tz) else {
        tracing::warn!(
            "Ignoring unusable date range {} .. {}",
            range.from,
            range.to
        );
        return trades.to_vec();
    };

    trades
        .iter()
        .filter(|t| t.entry_date >= start && t.entry_date <= end)
        .cloned()
        .collect()
}
