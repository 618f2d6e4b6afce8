//! The `trades` subcommand: list normalized trades.

use anyhow::Result;
use chrono::Local;
use clap::Args;
use tradejournal_lib::{filter_by_date_range, load_trades, JournalConfig, TradeLoad, TradeType};

use crate::journal::{open_source, resolve_user, RangeArgs, SourceArgs};
use crate::output::{
    print_json, print_trades_csv, print_trades_markdown, print_trades_table, OutputFormat,
};

#[derive(Args)]
pub struct TradesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Only show one source: futures or solana
    #[arg(long)]
    pub r#type: Option<String>,

    /// Only show trades on this symbol (case-insensitive)
    #[arg(long)]
    pub symbol: Option<String>,
}

fn parse_trade_type(input: &str) -> Result<TradeType> {
    match input.trim().to_ascii_lowercase().as_str() {
        "futures" => Ok(TradeType::Futures),
        "solana" | "swap" => Ok(TradeType::Solana),
        other => anyhow::bail!("unknown trade type '{}'. Use futures or solana", other),
    }
}

pub async fn run(args: &TradesArgs, config: &JournalConfig, format: &OutputFormat) -> Result<()> {
    let range = args.range.to_range()?;
    let trade_type = args.r#type.as_deref().map(parse_trade_type).transpose()?;
    let user_id = resolve_user(&args.source, config)?;
    let source = open_source(&args.source, config)?;

    let trades = match load_trades(&source, &user_id, &config.retry_policy()).await {
        TradeLoad::Loaded(trades) => trades,
        TradeLoad::NoData { reason } => {
            eprintln!("No trade data available: {}", reason);
            return Ok(());
        }
    };

    let trades: Vec<_> = filter_by_date_range(&trades, range.as_ref(), &Local)
        .into_iter()
        .filter(|t| trade_type.map_or(true, |tt| t.trade_type == tt))
        .filter(|t| {
            args.symbol
                .as_deref()
                .map_or(true, |s| t.symbol.eq_ignore_ascii_case(s.trim()))
        })
        .collect();

    eprintln!("{} trades", trades.len());

    match format {
        OutputFormat::Table => print_trades_table(&trades, &Local),
        OutputFormat::Json => print_json(&trades),
        OutputFormat::Csv => print_trades_csv(&trades, &Local)?,
        OutputFormat::Markdown => print_trades_markdown(&trades, &Local),
    }

    Ok(())
}
