//! Typed client for the hosted trade-journal record store.
//!
//! Exposes the raw row shapes (futures trades, swap trades, fee ledger rows)
//! exactly as the store returns them. Normalization into the canonical trade
//! model happens in `tradejournal_lib`.

mod client;
mod errors;
mod query;
pub mod types;

pub use self::client::{Client, FEE_IDS_PER_REQUEST};
pub use self::errors::Error;
pub use self::query::{Query, RowQuery, SortDirection};
