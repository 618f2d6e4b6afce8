use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tradejournal_lib::{ExportRow, ExportTable, ExportValue, Trade, WashSaleFlag};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            "md" | "markdown" => OutputFormat::Markdown,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    #[serde(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct TradeRow {
    #[tabled(rename = "Entry")]
    #[serde(rename = "Entry")]
    entry: String,
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: String,
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    #[serde(rename = "Side")]
    side: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "Type")]
    trade_type: String,
    #[tabled(rename = "Qty")]
    #[serde(rename = "Qty")]
    quantity: String,
    #[tabled(rename = "Exit")]
    #[serde(rename = "Exit")]
    exit: String,
    #[tabled(rename = "P&L")]
    #[serde(rename = "P&L")]
    pnl: String,
    #[tabled(rename = "Fees")]
    #[serde(rename = "Fees")]
    fees: String,
}

#[derive(Tabled, Serialize)]
struct WashSaleRow {
    #[tabled(rename = "Loss Trade")]
    #[serde(rename = "Loss Trade")]
    loss_trade: String,
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    #[serde(rename = "Side")]
    side: String,
    #[tabled(rename = "Loss Entry")]
    #[serde(rename = "Loss Entry")]
    loss_entry: String,
    #[tabled(rename = "Disallowed")]
    #[serde(rename = "Disallowed")]
    disallowed: String,
    #[tabled(rename = "Repurchase")]
    #[serde(rename = "Repurchase")]
    repurchase: String,
    #[tabled(rename = "Repurchase Entry")]
    #[serde(rename = "Repurchase Entry")]
    repurchase_entry: String,
}

// -- Row builders --

fn format_amount(value: f64) -> String {
    ExportValue::Amount(value).to_string()
}

fn format_instant<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    instant.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

fn build_field_rows(rows: &[ExportRow]) -> Vec<FieldRow> {
    rows.iter()
        .map(|r| FieldRow {
            field: r.label.clone(),
            value: r.value.to_string(),
        })
        .collect()
}

fn build_trade_rows<Tz: TimeZone>(trades: &[Trade], tz: &Tz) -> Vec<TradeRow>
where
    Tz::Offset: Display,
{
    trades
        .iter()
        .map(|t| TradeRow {
            entry: format_instant(&t.entry_date, tz),
            id: t.id.clone(),
            symbol: t.symbol.clone(),
            side: t.side.to_string(),
            trade_type: t.trade_type.to_string(),
            quantity: format!("{}", t.quantity),
            exit: t
                .exit_date
                .map(|d| format_instant(&d, tz))
                .unwrap_or_else(|| "open".to_string()),
            pnl: format_amount(t.pnl),
            fees: format_amount(t.fees),
        })
        .collect()
}

fn build_wash_sale_rows<Tz: TimeZone>(flags: &[WashSaleFlag], tz: &Tz) -> Vec<WashSaleRow>
where
    Tz::Offset: Display,
{
    flags
        .iter()
        .map(|f| WashSaleRow {
            loss_trade: f.loss_trade_id.clone(),
            symbol: f.symbol.clone(),
            side: f.side.to_string(),
            loss_entry: format_instant(&f.loss_entry_date, tz),
            disallowed: format_amount(f.disallowed_amount),
            repurchase: f.repurchase_trade_id.clone(),
            repurchase_entry: format_instant(&f.repurchase_entry_date, tz),
        })
        .collect()
}

// -- Report output (label/value rows) --

pub fn print_report_table(rows: &[ExportRow]) {
    println!("{}", Table::new(build_field_rows(rows)));
}

pub fn print_report_markdown(rows: &[ExportRow]) {
    let mut table = Table::new(build_field_rows(rows));
    table.with(Style::markdown());
    println!("{}", table);
}

/// One header line of labels, one line of values.
pub fn print_report_csv(rows: &[ExportRow]) -> Result<()> {
    let table = ExportTable {
        filename_hint: String::new(),
        records: vec![rows.to_vec()],
    };
    write_table_csv(&table, std::io::stdout())
}

// -- Trade output --

pub fn print_trades_table<Tz: TimeZone>(trades: &[Trade], tz: &Tz)
where
    Tz::Offset: Display,
{
    println!("{}", Table::new(build_trade_rows(trades, tz)));
}

pub fn print_trades_markdown<Tz: TimeZone>(trades: &[Trade], tz: &Tz)
where
    Tz::Offset: Display,
{
    let mut table = Table::new(build_trade_rows(trades, tz));
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_trades_csv<Tz: TimeZone>(trades: &[Trade], tz: &Tz) -> Result<()>
where
    Tz::Offset: Display,
{
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_trade_rows(trades, tz) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- Wash-sale output --

pub fn print_wash_sales_table<Tz: TimeZone>(flags: &[WashSaleFlag], tz: &Tz)
where
    Tz::Offset: Display,
{
    println!("{}", Table::new(build_wash_sale_rows(flags, tz)));
}

pub fn print_wash_sales_markdown<Tz: TimeZone>(flags: &[WashSaleFlag], tz: &Tz)
where
    Tz::Offset: Display,
{
    let mut table = Table::new(build_wash_sale_rows(flags, tz));
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_wash_sales_csv<Tz: TimeZone>(flags: &[WashSaleFlag], tz: &Tz) -> Result<()>
where
    Tz::Offset: Display,
{
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_wash_sale_rows(flags, tz) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- Export sinks --

/// Writes labels as the header row, then one row of values per record.
pub fn write_table_csv<W: Write>(table: &ExportTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())?;
    for record in &table.records {
        wtr.write_record(record.iter().map(|r| r.value.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes each record as an ordered array of `{label, value}` pairs.
pub fn write_table_json<W: Write>(table: &ExportTable, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &table.records)?;
    writeln!(writer)?;
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}
