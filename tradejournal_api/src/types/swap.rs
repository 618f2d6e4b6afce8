use serde::{Deserialize, Serialize};

use super::{RawTimestamp, RecordId};

/// A row of the `solana_trades` table: one DEX swap.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SwapTradeRecord {
    pub id: Option<RecordId>,

    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,

    #[serde(default, alias = "tokenIn")]
    pub token_in: Option<String>,

    #[serde(default, alias = "tokenOut")]
    pub token_out: Option<String>,

    #[serde(default, alias = "amountIn")]
    pub amount_in: Option<f64>,

    #[serde(default, alias = "amountOut")]
    pub amount_out: Option<f64>,

    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,

    #[serde(default)]
    pub fees: Option<f64>,

    #[serde(default)]
    pub signature: Option<String>,
}
