mod commands;
mod journal;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tradejournal_lib::JournalConfig;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "tradejournal")]
#[command(about = "Tax and P&L reports from a futures and swap trade journal")]
struct Cli {
    /// Output format: table, json, csv, or md
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// YAML config file (api_url, api_key, user_id, db_path, timeout_secs, max_retries)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capital-gains report for a tax year, with wash-sale adjustments
    Tax(commands::tax::TaxArgs),
    /// Profit and loss statement for a date range
    Pnl(commands::pnl::PnlArgs),
    /// Write report files (CSV or JSON) for a year and range
    Export(commands::export::ExportArgs),
    /// Load trade exports or a hosted journal into a local SQLite database
    Import(commands::import::ImportArgs),
    /// List normalized trades
    Trades(commands::trades::TradesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tradejournal=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(&cli.output);
    let config = JournalConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Tax(args) => commands::tax::run(args, &config, &format).await?,
        Commands::Pnl(args) => commands::pnl::run(args, &config, &format).await?,
        Commands::Export(args) => commands::export::run(args, &config).await?,
        Commands::Import(args) => commands::import::run(args, &config).await?,
        Commands::Trades(args) => commands::trades::run(args, &config, &format).await?,
    }

    Ok(())
}
