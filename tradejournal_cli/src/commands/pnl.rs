//! The `pnl` subcommand: profit and loss statement for a period.

use anyhow::Result;
use chrono::Local;
use clap::Args;
use tradejournal_lib::export::pl_statement_rows;
use tradejournal_lib::{
    build_pl_statement, filter_by_date_range, load_trades, period_label, JournalConfig, TradeLoad,
};

use crate::journal::{open_source, resolve_user, RangeArgs, SourceArgs};
use crate::output::{
    print_json, print_report_csv, print_report_markdown, print_report_table, OutputFormat,
};

#[derive(Args)]
pub struct PnlArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,
}

pub async fn run(args: &PnlArgs, config: &JournalConfig, format: &OutputFormat) -> Result<()> {
    let range = args.range.to_range()?;
    let user_id = resolve_user(&args.source, config)?;
    let source = open_source(&args.source, config)?;
    let policy = config.retry_policy();

    let trades = match load_trades(&source, &user_id, &policy).await {
        TradeLoad::Loaded(trades) => trades,
        TradeLoad::NoData { reason } => {
            eprintln!("No trade data available: {}", reason);
            return Ok(());
        }
    };

    let in_range = filter_by_date_range(&trades, range.as_ref(), &Local);
    let period = period_label(range.as_ref());

    let Some(statement) = build_pl_statement(&in_range, &period, &source, &user_id, &policy).await
    else {
        eprintln!("No trades in period: {}", period);
        return Ok(());
    };

    let rows = pl_statement_rows(&statement);
    match format {
        OutputFormat::Table => print_report_table(&rows),
        OutputFormat::Json => print_json(&statement),
        OutputFormat::Csv => print_report_csv(&rows)?,
        OutputFormat::Markdown => print_report_markdown(&rows),
    }

    Ok(())
}
