use serde::{Deserialize, Serialize};

use super::RecordId;

/// A row of the `trade_fees` ledger: an additional fee booked against a trade.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeeRecord {
    #[serde(alias = "tradeId")]
    pub trade_id: RecordId,

    #[serde(default)]
    pub amount: Option<f64>,
}
