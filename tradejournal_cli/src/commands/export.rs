//! The `export` subcommand: writes report files for the export sink.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use tradejournal_lib::export::{pl_statement_table, tax_report_table, trade_table, wash_sale_table};
use tradejournal_lib::{
    validation, ExportTable, JournalConfig, RefreshOutcome, RefreshRequest, ReportEngine,
};

use crate::journal::{current_year, open_source, resolve_user, RangeArgs, SourceArgs};
use crate::output::{write_table_csv, write_table_json};

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Tax year (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Directory to write files into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// File format: csv or json
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Also write wash-sale and trade detail files
    #[arg(long)]
    pub detail: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    fn parse(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            other => bail!("unsupported export format '{}'. Use csv or json", other),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

fn write_table(table: &ExportTable, dir: &Path, format: FileFormat) -> Result<PathBuf> {
    let path = dir.join(format!("{}.{}", table.filename_hint, format.extension()));
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let writer = BufWriter::new(file);
    match format {
        FileFormat::Csv => write_table_csv(table, writer)?,
        FileFormat::Json => write_table_json(table, writer)?,
    }
    Ok(path)
}

pub async fn run(args: &ExportArgs, config: &JournalConfig) -> Result<()> {
    let format = FileFormat::parse(&args.format)?;
    let year = validation::validate_year(args.year.unwrap_or_else(current_year))?;
    let range = args.range.to_range()?;
    let user_id = resolve_user(&args.source, config)?;
    let source = open_source(&args.source, config)?;

    let engine = ReportEngine::new(&source, &source, Local).with_policy(config.retry_policy());
    let request = RefreshRequest {
        user_id,
        range,
        tax_year: year,
    };

    let snapshot = match engine.refresh(&request).await {
        RefreshOutcome::Committed(snapshot) => snapshot,
        RefreshOutcome::NoData { reason } => {
            eprintln!("No trade data available: {}", reason);
            return Ok(());
        }
        RefreshOutcome::Stale => bail!("report refresh was superseded"),
    };

    let mut tables = vec![tax_report_table(&snapshot.tax)];
    match snapshot.pnl.as_ref() {
        Some(statement) => tables.push(pl_statement_table(statement)),
        None => eprintln!("No trades in period {}; skipping P&L statement", snapshot.period),
    }
    if args.detail {
        let wash_sales = wash_sale_table(&snapshot.tax);
        if !wash_sales.is_empty() {
            tables.push(wash_sales);
        }
        let trades = trade_table(&snapshot.trades, &format!("trades-{}", year));
        if !trades.is_empty() {
            tables.push(trades);
        }
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create {}", args.out.display()))?;
    for table in &tables {
        let path = write_table(table, &args.out, format)?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradejournal_lib::TaxReport;

    #[test]
    fn file_formats() {
        assert_eq!(FileFormat::parse("CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::parse("json").unwrap(), FileFormat::Json);
        assert!(FileFormat::parse("xlsx").is_err());
    }

    #[test]
    fn writes_file_named_by_hint() {
        let dir = std::env::temp_dir().join(format!("tradejournal-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let table = tax_report_table(&TaxReport::empty(2025));

        let path = write_table(&table, &dir, FileFormat::Csv).unwrap();
        assert_eq!(path.file_name().unwrap(), "tax-report-2025.csv");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Tax Year,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
