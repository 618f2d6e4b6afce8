//! Canonical trade model shared by every report builder.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tradejournal_api::types::{FuturesTradeRecord, SwapTradeRecord};

/// Direction of a position.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Long,
    Short,
}

impl Side {
    /// Parses a side column leniently. `buy`/`sell` are accepted as aliases;
    /// anything unrecognised falls back to [`Side::Long`].
    pub fn parse_lenient(input: &str) -> Side {
        match input.trim().to_ascii_lowercase().as_str() {
            "short" | "sell" => Side::Short,
            _ => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// The source a trade was imported from.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Futures,
    Solana,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Futures => write!(f, "futures"),
            TradeType::Solana => write!(f, "solana"),
        }
    }
}

/// Swap-specific columns kept for display only.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SwapDetails {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub signature: Option<String>,
}

/// A trade after normalization. Nothing downstream of the normalizer looks
/// at the originating record shape again.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub entry_date: DateTime<Utc>,
    pub exit_date: Option<DateTime<Utc>>,
    pub pnl: f64,
    pub fees: f64,
    pub trade_type: TradeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<SwapDetails>,
}

impl Trade {
    /// A trade is realized once it has a positive exit price and an exit date.
    pub fn is_realized(&self) -> bool {
        self.exit_price.is_some_and(|p| p > 0.0) && self.exit_date.is_some()
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }

    /// Time between entry and exit, if the trade has exited.
    pub fn holding_period(&self) -> Option<TimeDelta> {
        self.exit_date.map(|exit| exit - self.entry_date)
    }
}

/// Sums amounts starting from positive zero, so an empty or all-zero input
/// never renders as `-0.00`.
pub(crate) fn sum_amounts(amounts: impl Iterator<Item = f64>) -> f64 {
    amounts.fold(0.0, |acc, amount| acc + amount)
}

/// A raw record from either source, before normalization.
#[derive(Clone, Debug)]
pub enum RawTrade {
    Futures(FuturesTradeRecord),
    Swap(SwapTradeRecord),
}

impl From<FuturesTradeRecord> for RawTrade {
    fn from(record: FuturesTradeRecord) -> Self {
        RawTrade::Futures(record)
    }
}

impl From<SwapTradeRecord> for RawTrade {
    fn from(record: SwapTradeRecord) -> Self {
        RawTrade::Swap(record)
    }
}
