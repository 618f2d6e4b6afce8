//! Trade journal analytics: normalization, date filtering, wash-sale
//! detection, tax and P&L reports, and export rows.
//!
//! Raw records come from the hosted record store (`tradejournal_api`) or a
//! local SQLite journal; both sit behind the [`RecordSource`] and
//! [`FeeLedger`] traits. The report builders themselves are pure functions
//! over normalized [`Trade`]s.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod normalize;
pub mod pnl;
pub mod range;
pub mod refresh;
pub mod source;
pub mod tax;
pub mod trade;
pub mod validation;
pub mod wash_sale;

pub use tradejournal_api;
pub use tradejournal_api::types;

pub use config::{ConfigError, JournalConfig};
pub use db::{Db, DbError, ImportSummary};
pub use error::JournalError;
pub use export::{ExportRow, ExportTable, ExportValue};
pub use normalize::{normalize_all, normalize_trades};
pub use pnl::{build_pl_statement, compute_pl_statement, PlStatement};
pub use range::{filter_by_date_range, period_label, DateRange};
pub use refresh::{
    RefreshCoordinator, RefreshOutcome, RefreshRequest, RefreshToken, ReportEngine, ReportSnapshot,
};
pub use source::{
    load_trades, with_retry, FeeLedger, RecordSource, RetryPolicy, SourceError, TradeLoad,
};
pub use tax::{build_tax_report, TaxReport};
pub use trade::{RawTrade, Side, Trade, TradeType};
pub use wash_sale::{detect_wash_sales, WashSaleFlag, WashSaleResult};
