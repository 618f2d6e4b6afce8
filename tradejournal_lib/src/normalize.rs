//! Record normalizer: futures rows and swap rows in, one chronologically
//! ordered list of canonical [`Trade`]s out.
//!
//! Records whose entry timestamp cannot be parsed are dropped. No other
//! field is fatal: missing numbers default to zero and a missing symbol
//! becomes `"N/A"`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tradejournal_api::types::{FuturesTradeRecord, RawTimestamp, SwapTradeRecord};

use crate::trade::{RawTrade, Side, SwapDetails, Trade, TradeType};

/// Symbol used when a futures row has none.
pub const UNKNOWN_SYMBOL: &str = "N/A";

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a timestamp column into an instant.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][+HH[:MM]]`, naive date-times
/// (read as UTC), bare dates (midnight UTC), and epoch milliseconds either as
/// a number or as a digit-only string.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Millis(ms) => DateTime::<Utc>::from_timestamp_millis(*ms),
        RawTimestamp::FractionalMillis(ms) if ms.is_finite() => {
            DateTime::<Utc>::from_timestamp_millis(ms.round() as i64)
        }
        RawTimestamp::FractionalMillis(_) => None,
        RawTimestamp::Text(text) => parse_timestamp_str(text),
        RawTimestamp::Other(_) => None,
    }
}

fn parse_timestamp_str(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::<Utc>::from_timestamp_millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Maps one futures row. `fallback_id` is used when the row has no id.
pub fn normalize_futures(record: &FuturesTradeRecord, fallback_id: &str) -> Option<Trade> {
    let entry_date = record.entry_date.as_ref().and_then(parse_timestamp)?;

    Some(Trade {
        id: record
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| fallback_id.to_string()),
        symbol: non_blank(record.symbol.as_deref())
            .unwrap_or(UNKNOWN_SYMBOL)
            .to_string(),
        side: record
            .side
            .as_deref()
            .map(Side::parse_lenient)
            .unwrap_or_default(),
        quantity: record.quantity.unwrap_or(0.0),
        entry_price: record.entry_price.unwrap_or(0.0),
        exit_price: record.exit_price,
        entry_date,
        exit_date: record.exit_date.as_ref().and_then(parse_timestamp),
        pnl: record.pnl.unwrap_or(0.0),
        fees: record.fees.unwrap_or(0.0),
        trade_type: TradeType::Futures,
        swap: None,
    })
}

/// Maps one swap row. Swaps have no short side and no exit leg: P&L is fixed
/// here as `amount_out - amount_in`.
pub fn normalize_swap(record: &SwapTradeRecord, fallback_id: &str) -> Option<Trade> {
    let entry_date = record.timestamp.as_ref().and_then(parse_timestamp)?;

    let token_in = non_blank(record.token_in.as_deref()).unwrap_or(UNKNOWN_SYMBOL);
    let token_out = non_blank(record.token_out.as_deref()).unwrap_or(UNKNOWN_SYMBOL);
    let amount_in = record.amount_in.unwrap_or(0.0);
    let amount_out = record.amount_out.unwrap_or(0.0);

    Some(Trade {
        id: record
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| fallback_id.to_string()),
        symbol: format!("{}/{}", token_in, token_out),
        side: Side::Long,
        quantity: amount_in,
        entry_price: 0.0,
        exit_price: None,
        entry_date,
        exit_date: None,
        pnl: amount_out - amount_in,
        fees: record.fees.unwrap_or(0.0),
        trade_type: TradeType::Solana,
        swap: Some(SwapDetails {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out,
            signature: record.signature.clone(),
        }),
    })
}

/// Maps a tagged raw record.
pub fn normalize_record(raw: &RawTrade, fallback_id: &str) -> Option<Trade> {
    match raw {
        RawTrade::Futures(record) => normalize_futures(record, fallback_id),
        RawTrade::Swap(record) => normalize_swap(record, fallback_id),
    }
}

/// Normalizes both sources and merges them, ordered by entry time ascending.
///
/// The sort is stable, so trades with identical entry instants keep their
/// source order (futures first, then swaps). Inputs are not modified.
pub fn normalize_trades(futures: &[FuturesTradeRecord], swaps: &[SwapTradeRecord]) -> Vec<Trade> {
    let raw: Vec<RawTrade> = futures
        .iter()
        .cloned()
        .map(RawTrade::from)
        .chain(swaps.iter().cloned().map(RawTrade::from))
        .collect();
    normalize_all(&raw)
}

/// Normalizes an already tagged collection. Same ordering rules as [`normalize_trades`].
pub fn normalize_all(records: &[RawTrade]) -> Vec<Trade> {
    let mut dropped = 0usize;
    let mut trades: Vec<Trade> = records
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let fallback_id = match raw {
                RawTrade::Futures(_) => format!("futures-{}", index),
                RawTrade::Swap(_) => format!("swap-{}", index),
            };
            let trade = normalize_record(raw, &fallback_id);
            if trade.is_none() {
                dropped += 1;
            }
            trade
        })
        .collect();

    if dropped > 0 {
        tracing::debug!("Dropped {} record(s) with unparseable entry dates", dropped);
    }

    trades.sort_by_key(|t| t.entry_date);
    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tradejournal_api::types::RecordId;

    fn futures(id: i64, entry: &str) -> FuturesTradeRecord {
        FuturesTradeRecord {
            id: Some(RecordId::Int(id)),
            symbol: Some("ES".to_string()),
            side: Some("long".to_string()),
            quantity: Some(1.0),
            entry_price: Some(10.0),
            exit_price: Some(11.0),
            entry_date: Some(RawTimestamp::from(entry)),
            exit_date: Some(RawTimestamp::from("2025-06-01T00:00:00Z")),
            pnl: Some(25.0),
            fees: Some(1.5),
            trade_type: Some("futures".to_string()),
            ..Default::default()
        }
    }

    fn swap(id: &str, timestamp: RawTimestamp) -> SwapTradeRecord {
        SwapTradeRecord {
            id: Some(RecordId::from(id)),
            token_in: Some("SOL".to_string()),
            token_out: Some("USDC".to_string()),
            amount_in: Some(100.0),
            amount_out: Some(112.5),
            timestamp: Some(timestamp),
            signature: Some("sig".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parses_supported_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        for text in [
            "2025-01-02T03:04:05Z",
            "2025-01-02T05:04:05+02:00",
            "2025-01-02 03:04:05",
            "2025-01-02T03:04:05",
            "2025-01-02 03:04:05+00",
            "1735787045000",
        ] {
            assert_eq!(
                parse_timestamp(&RawTimestamp::from(text)),
                Some(expected),
                "failed on {}",
                text
            );
        }
        assert_eq!(
            parse_timestamp(&RawTimestamp::Millis(1735787045000)),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::from("2025-01-02")),
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp(&RawTimestamp::from("")), None);
        assert_eq!(parse_timestamp(&RawTimestamp::from("yesterday")), None);
        assert_eq!(parse_timestamp(&RawTimestamp::from("2025-13-45")), None);
        assert_eq!(
            parse_timestamp(&RawTimestamp::FractionalMillis(f64::NAN)),
            None
        );
        assert_eq!(
            parse_timestamp(&RawTimestamp::Other(serde_json::Value::Bool(true))),
            None
        );
    }

    #[test]
    fn futures_defaults() {
        let record = FuturesTradeRecord {
            entry_date: Some(RawTimestamp::from("2025-03-01")),
            ..Default::default()
        };
        let trade = normalize_futures(&record, "fallback").unwrap();
        assert_eq!(trade.id, "fallback");
        assert_eq!(trade.symbol, UNKNOWN_SYMBOL);
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(trade.fees, 0.0);
        assert_eq!(trade.exit_price, None);
        assert!(!trade.is_realized());
    }

    #[test]
    fn blank_symbol_becomes_placeholder() {
        let mut record = futures(1, "2025-03-01");
        record.symbol = Some("   ".to_string());
        let trade = normalize_futures(&record, "x").unwrap();
        assert_eq!(trade.symbol, UNKNOWN_SYMBOL);
    }

    #[test]
    fn swap_synthesizes_symbol_and_pnl() {
        let trade = normalize_swap(&swap("s1", RawTimestamp::from("2025-02-01T00:00:00Z")), "x")
            .unwrap();
        assert_eq!(trade.symbol, "SOL/USDC");
        assert_eq!(trade.side, Side::Long);
        assert!((trade.pnl - 12.5).abs() < 1e-9);
        assert_eq!(trade.trade_type, TradeType::Solana);
        assert_eq!(trade.exit_price, None);
        let details = trade.swap.unwrap();
        assert_eq!(details.amount_out, 112.5);
        assert_eq!(details.signature.as_deref(), Some("sig"));
    }

    #[test]
    fn unparseable_entry_dates_are_dropped() {
        let good = futures(1, "2025-01-01T00:00:00Z");
        let bad = futures(2, "not a date");
        let mut missing = futures(3, "2025-01-01");
        missing.entry_date = None;
        let trades = normalize_trades(&[good, bad, missing], &[]);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, "1");
    }

    #[test]
    fn merged_output_is_sorted_by_entry() {
        let futures_rows = vec![
            futures(1, "2025-03-01T00:00:00Z"),
            futures(2, "2025-01-01T00:00:00Z"),
        ];
        let swap_rows = vec![
            swap("s1", RawTimestamp::from("2025-02-01T00:00:00Z")),
            swap("s2", RawTimestamp::from("2025-01-01T00:00:00Z")),
        ];
        let trades = normalize_trades(&futures_rows, &swap_rows);
        let ids: Vec<&str> = trades.iter().map(|t| t.id.as_str()).collect();
        // Equal instants keep source order: futures before swaps.
        assert_eq!(ids, vec!["2", "s2", "s1", "1"]);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let futures_rows = vec![futures(1, "2025-03-01"), futures(2, "2025-01-01")];
        let before = futures_rows.clone();
        let _ = normalize_trades(&futures_rows, &[]);
        assert_eq!(futures_rows, before);
    }

    #[test]
    fn missing_ids_get_positional_fallbacks() {
        let mut record = futures(1, "2025-01-01");
        record.id = None;
        let mut swap_row = swap("s", RawTimestamp::from("2025-01-02"));
        swap_row.id = None;
        let trades = normalize_trades(&[record], &[swap_row]);
        assert_eq!(trades[0].id, "futures-0");
        assert_eq!(trades[1].id, "swap-1");
    }
}
