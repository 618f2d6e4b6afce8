//! The `tax` subcommand: realized gains report for one calendar year.

use anyhow::Result;
use chrono::Local;
use clap::Args;
use tradejournal_lib::export::tax_report_rows;
use tradejournal_lib::{
    build_tax_report, filter_by_date_range, load_trades, validation, JournalConfig, TradeLoad,
};

use crate::journal::{current_year, open_source, resolve_user, RangeArgs, SourceArgs};
use crate::output::{
    print_json, print_report_csv, print_report_markdown, print_report_table,
    print_wash_sales_csv, print_wash_sales_markdown, print_wash_sales_table, OutputFormat,
};

#[derive(Args)]
pub struct TaxArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Tax year (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Also list the individual wash-sale flags
    #[arg(long)]
    pub detail: bool,
}

pub async fn run(args: &TaxArgs, config: &JournalConfig, format: &OutputFormat) -> Result<()> {
    let year = validation::validate_year(args.year.unwrap_or_else(current_year))?;
    let range = args.range.to_range()?;
    let user_id = resolve_user(&args.source, config)?;
    let source = open_source(&args.source, config)?;

    let trades = match load_trades(&source, &user_id, &config.retry_policy()).await {
        TradeLoad::Loaded(trades) => trades,
        TradeLoad::NoData { reason } => {
            eprintln!("No trade data available: {}", reason);
            return Ok(());
        }
    };

    let in_range = filter_by_date_range(&trades, range.as_ref(), &Local);
    let report = build_tax_report(&in_range, year, &Local);

    eprintln!(
        "{} realized trades in {} ({} wash sales)",
        report.realized_trade_count,
        year,
        report.wash_sales.len()
    );

    let rows = tax_report_rows(&report);
    match format {
        OutputFormat::Table => print_report_table(&rows),
        OutputFormat::Json => print_json(&report),
        OutputFormat::Csv => print_report_csv(&rows)?,
        OutputFormat::Markdown => print_report_markdown(&rows),
    }

    if args.detail && !report.wash_sales.is_empty() && *format != OutputFormat::Json {
        println!();
        match format {
            OutputFormat::Csv => print_wash_sales_csv(&report.wash_sales, &Local)?,
            OutputFormat::Markdown => print_wash_sales_markdown(&report.wash_sales, &Local),
            _ => print_wash_sales_table(&report.wash_sales, &Local),
        }
    }

    Ok(())
}
