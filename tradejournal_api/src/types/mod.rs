mod common;
pub use self::common::{RawTimestamp, RecordId};

mod trade;
pub use self::trade::FuturesTradeRecord;

mod swap;
pub use self::swap::SwapTradeRecord;

mod fee;
pub use self::fee::FeeRecord;
