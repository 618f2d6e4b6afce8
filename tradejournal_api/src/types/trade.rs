use serde::{Deserialize, Serialize};

use super::{RawTimestamp, RecordId};

/// A row of the `trades` table (futures-style, manually journaled or imported).
///
/// Every column except the id is optional: rows come from user uploads and
/// broker imports of varying quality.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FuturesTradeRecord {
    pub id: Option<RecordId>,

    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(default)]
    pub side: Option<String>,

    #[serde(default)]
    pub quantity: Option<f64>,

    #[serde(default, alias = "entryPrice")]
    pub entry_price: Option<f64>,

    #[serde(default, alias = "exitPrice")]
    pub exit_price: Option<f64>,

    #[serde(default, alias = "entryDate")]
    pub entry_date: Option<RawTimestamp>,

    #[serde(default, alias = "exitDate")]
    pub exit_date: Option<RawTimestamp>,

    #[serde(default)]
    pub pnl: Option<f64>,

    #[serde(default)]
    pub fees: Option<f64>,

    #[serde(default, alias = "tradeType")]
    pub trade_type: Option<String>,
}
