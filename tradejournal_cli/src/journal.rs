//! Record source selection shared by the reporting subcommands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{Datelike, Local};
use clap::Args;
use tradejournal_lib::tradejournal_api::types::{FuturesTradeRecord, SwapTradeRecord};
use tradejournal_lib::tradejournal_api::Client;
use tradejournal_lib::{
    validation, DateRange, Db, FeeLedger, JournalConfig, RecordSource, SourceError,
};

/// Where to read trades from.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Local journal database (SQLite); takes precedence over the hosted store
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// User whose trades to load (defaults to TRADEJOURNAL_USER_ID)
    #[arg(long)]
    pub user: Option<String>,
}

/// Inclusive calendar-day range in local time.
#[derive(Args, Clone, Debug)]
pub struct RangeArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

impl RangeArgs {
    pub fn to_range(&self) -> Result<Option<DateRange>> {
        Ok(validation::validate_date_range(
            self.from.as_deref(),
            self.to.as_deref(),
        )?)
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Either the hosted record store or a local journal database.
pub enum JournalSource {
    Hosted(Client),
    Local(Db),
}

impl RecordSource for JournalSource {
    async fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, SourceError> {
        match self {
            JournalSource::Hosted(client) => Ok(client.list_trades(user_id).await?),
            JournalSource::Local(db) => Ok(db.list_trades(user_id)?),
        }
    }

    async fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, SourceError> {
        match self {
            JournalSource::Hosted(client) => Ok(client.list_swap_trades(user_id).await?),
            JournalSource::Local(db) => Ok(db.list_swap_trades(user_id)?),
        }
    }
}

impl FeeLedger for JournalSource {
    async fn sum_fees(&self, user_id: &str, trade_ids: &[String]) -> Result<f64, SourceError> {
        match self {
            JournalSource::Hosted(client) => Ok(client.sum_fees(trade_ids).await?),
            JournalSource::Local(db) => Ok(db.sum_fees(user_id, trade_ids)?),
        }
    }
}

pub fn open_db(path: &Path) -> Result<Db> {
    let db = Db::open(path)?;
    db.init()?;
    Ok(db)
}

pub fn hosted_client(config: &JournalConfig) -> Result<Client> {
    let Some(url) = config.api_url.as_deref() else {
        bail!(
            "no record store configured. Pass --db <journal.db> or set TRADEJOURNAL_API_URL"
        );
    };
    let mut client = Client::new(url).with_timeout(config.retry_policy().timeout);
    if let Some(key) = config.api_key.as_deref() {
        client = client.with_api_key(key);
    }
    Ok(client)
}

/// Picks `--db`, then the hosted store, then a configured `db_path`.
pub fn open_source(args: &SourceArgs, config: &JournalConfig) -> Result<JournalSource> {
    if let Some(path) = args.db.as_ref() {
        return Ok(JournalSource::Local(open_db(path)?));
    }
    if config.api_url.is_some() {
        return Ok(JournalSource::Hosted(hosted_client(config)?));
    }
    if let Some(path) = config.db_path.as_ref() {
        return Ok(JournalSource::Local(open_db(path)?));
    }
    bail!("no record store configured. Pass --db <journal.db> or set TRADEJOURNAL_API_URL")
}

pub fn resolve_user(args: &SourceArgs, config: &JournalConfig) -> Result<String> {
    match args.user.as_deref().or(config.user_id.as_deref()) {
        Some(user) => Ok(validation::validate_user_id(user)?),
        None => bail!("no user given. Pass --user or set TRADEJOURNAL_USER_ID"),
    }
}
