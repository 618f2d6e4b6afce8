//! The `import` subcommand: load trade exports into a local journal.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;
use tradejournal_lib::tradejournal_api::types::{FeeRecord, FuturesTradeRecord, SwapTradeRecord};
use tradejournal_lib::tradejournal_api::Error as ApiError;
use tradejournal_lib::{validation, JournalConfig};

use crate::journal::{hosted_client, open_db};

#[derive(Args)]
pub struct ImportArgs {
    /// SQLite database path
    #[arg(long, default_value = "tradejournal.db")]
    pub db: PathBuf,

    /// User the imported rows belong to (defaults to TRADEJOURNAL_USER_ID)
    #[arg(long)]
    pub user: Option<String>,

    /// JSON array of futures trade rows
    #[arg(long)]
    pub trades: Option<PathBuf>,

    /// JSON array of swap trade rows
    #[arg(long)]
    pub swaps: Option<PathBuf>,

    /// JSON array of fee ledger rows ({trade_id, amount}); replaces the user's
    /// earlier entries for the same trades
    #[arg(long)]
    pub fees: Option<PathBuf>,

    /// Copy the user's trades and fees from the hosted record store
    #[arg(long)]
    pub from_api: bool,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let rows = serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(rows)
}

pub async fn run(args: &ImportArgs, config: &JournalConfig) -> Result<()> {
    if args.trades.is_none() && args.swaps.is_none() && args.fees.is_none() && !args.from_api {
        bail!("nothing to import. Pass --trades, --swaps, --fees or --from-api");
    }

    let user_id = match args.user.as_deref().or(config.user_id.as_deref()) {
        Some(user) => validation::validate_user_id(user)?,
        None => bail!("no user given. Pass --user or set TRADEJOURNAL_USER_ID"),
    };

    let mut db = open_db(&args.db)?;

    let mut futures: Vec<FuturesTradeRecord> = Vec::new();
    let mut swaps: Vec<SwapTradeRecord> = Vec::new();
    let mut fees: Vec<FeeRecord> = Vec::new();

    if let Some(path) = args.trades.as_deref() {
        futures.extend(read_rows::<FuturesTradeRecord>(path)?);
    }
    if let Some(path) = args.swaps.as_deref() {
        swaps.extend(read_rows::<SwapTradeRecord>(path)?);
    }
    if let Some(path) = args.fees.as_deref() {
        fees.extend(read_rows::<FeeRecord>(path)?);
    }

    if args.from_api {
        let client = hosted_client(config)?;
        eprintln!("Fetching trades for {} from the record store...", user_id);
        let remote_trades = client.list_trades(&user_id).await?;
        let remote_swaps = match client.list_swap_trades(&user_id).await {
            Ok(rows) => rows,
            Err(ApiError::TableMissing { .. }) => {
                eprintln!("No swap trade table on the record store; skipping swaps");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let ids: Vec<String> = remote_trades
            .iter()
            .filter_map(|t| t.id.as_ref())
            .chain(remote_swaps.iter().filter_map(|s| s.id.as_ref()))
            .map(|id| id.to_string())
            .collect();
        fees.extend(client.list_fees(&ids).await?);
        futures.extend(remote_trades);
        swaps.extend(remote_swaps);
    }

    if !futures.is_empty() {
        let summary = db.insert_trades(&user_id, &futures)?;
        eprintln!(
            "Imported {} futures trades ({} skipped without id)",
            summary.inserted, summary.skipped
        );
    }
    if !swaps.is_empty() {
        let summary = db.insert_swap_trades(&user_id, &swaps)?;
        eprintln!(
            "Imported {} swap trades ({} skipped without id)",
            summary.inserted, summary.skipped
        );
    }
    if !fees.is_empty() {
        let count = db.insert_fees(&user_id, &fees)?;
        eprintln!("Imported {} fee entries (replacing earlier entries for those trades)", count);
    }

    eprintln!(
        "{} now holds {} trades for {}",
        args.db.display(),
        db.trade_count(&user_id)?,
        user_id
    );

    Ok(())
}
