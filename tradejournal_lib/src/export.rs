//! Flattens reports into ordered label/value rows for an export sink.

use std::fmt;

use serde::Serialize;

use crate::pnl::PlStatement;
use crate::tax::TaxReport;
use crate::trade::Trade;
use crate::wash_sale::WashSaleFlag;

/// A typed cell value. Amounts render with two decimals.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ExportValue {
    Text(String),
    Integer(i64),
    Amount(f64),
    Percent(f64),
}

fn fixed2(value: f64) -> String {
    // Collapse -0.0 (and anything that rounds to it) to "0.00".
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0.00".to_string()
    } else {
        format!("{:.2}", rounded)
    }
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Text(s) => write!(f, "{}", s),
            ExportValue::Integer(n) => write!(f, "{}", n),
            ExportValue::Amount(v) | ExportValue::Percent(v) => write!(f, "{}", fixed2(*v)),
        }
    }
}

impl From<&str> for ExportValue {
    fn from(value: &str) -> Self {
        ExportValue::Text(value.to_string())
    }
}

impl From<String> for ExportValue {
    fn from(value: String) -> Self {
        ExportValue::Text(value)
    }
}

impl From<usize> for ExportValue {
    fn from(value: usize) -> Self {
        ExportValue::Integer(value as i64)
    }
}

impl From<i32> for ExportValue {
    fn from(value: i32) -> Self {
        ExportValue::Integer(i64::from(value))
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ExportRow {
    pub label: String,
    pub value: ExportValue,
}

impl ExportRow {
    pub fn new(label: &str, value: impl Into<ExportValue>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }

    fn amount(label: &str, value: f64) -> Self {
        Self::new(label, ExportValue::Amount(value))
    }
}

/// One or more records of identically labelled rows, plus a file name hint
/// without extension.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ExportTable {
    pub filename_hint: String,
    pub records: Vec<Vec<ExportRow>>,
}

impl ExportTable {
    /// Column labels, taken from the first record.
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|rows| rows.iter().map(|r| r.label.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn tax_report_rows(report: &TaxReport) -> Vec<ExportRow> {
    vec![
        ExportRow::new("Tax Year", report.year),
        ExportRow::amount("Total Realized Gains", report.total_realized_gains),
        ExportRow::amount("Total Realized Losses", report.total_realized_losses),
        ExportRow::amount("Net Capital Gains", report.net_capital_gains),
        ExportRow::amount("Wash Sale Adjustments", report.wash_sale_adjustments),
        ExportRow::amount("Short-Term Gains", report.short_term_gains),
        ExportRow::amount("Long-Term Gains", report.long_term_gains),
        ExportRow::amount("Total Fees", report.total_fees),
        ExportRow::new("Realized Trades", report.realized_trade_count),
    ]
}

pub fn pl_statement_rows(statement: &PlStatement) -> Vec<ExportRow> {
    vec![
        ExportRow::new("Period", statement.period.as_str()),
        ExportRow::amount("Total Revenue", statement.total_revenue),
        ExportRow::amount("Total Costs", statement.total_costs),
        ExportRow::amount("Gross Profit", statement.gross_profit),
        ExportRow::amount("Trade Fees", statement.trade_fees),
        ExportRow::amount("Supplemental Fees", statement.supplemental_fees),
        ExportRow::amount("Operating Expenses", statement.operating_expenses),
        ExportRow::amount("Net Profit", statement.net_profit),
        ExportRow::new("Total Trades", statement.trade_count),
        ExportRow::new("Winning Trades", statement.winning_trades),
        ExportRow::new("Losing Trades", statement.losing_trades),
        ExportRow::new("Win Rate (%)", ExportValue::Percent(statement.win_rate)),
        ExportRow::amount("Average Win", statement.avg_win),
        ExportRow::amount("Average Loss", statement.avg_loss),
    ]
}

pub fn tax_report_table(report: &TaxReport) -> ExportTable {
    ExportTable {
        filename_hint: format!("tax-report-{}", report.year),
        records: vec![tax_report_rows(report)],
    }
}

fn slug(period: &str) -> String {
    let mut out = String::with_capacity(period.len());
    for c in period.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

pub fn pl_statement_table(statement: &PlStatement) -> ExportTable {
    ExportTable {
        filename_hint: format!("pl-statement-{}", slug(&statement.period)),
        records: vec![pl_statement_rows(statement)],
    }
}

/// One record per wash-sale flag.
pub fn wash_sale_table(report: &TaxReport) -> ExportTable {
    let records = report
        .wash_sales
        .iter()
        .map(|flag: &WashSaleFlag| {
            vec![
                ExportRow::new("Loss Trade", flag.loss_trade_id.as_str()),
                ExportRow::new("Symbol", flag.symbol.as_str()),
                ExportRow::new("Side", flag.side.to_string()),
                ExportRow::new("Loss Entry", flag.loss_entry_date.to_rfc3339()),
                ExportRow::amount("Disallowed", flag.disallowed_amount),
                ExportRow::new("Repurchase Trade", flag.repurchase_trade_id.as_str()),
                ExportRow::new("Repurchase Entry", flag.repurchase_entry_date.to_rfc3339()),
            ]
        })
        .collect();
    ExportTable {
        filename_hint: format!("wash-sales-{}", report.year),
        records,
    }
}

/// One record per normalized trade.
pub fn trade_table(trades: &[Trade], filename_hint: &str) -> ExportTable {
    let records = trades
        .iter()
        .map(|t| {
            vec![
                ExportRow::new("ID", t.id.as_str()),
                ExportRow::new("Symbol", t.symbol.as_str()),
                ExportRow::new("Side", t.side.to_string()),
                ExportRow::new("Type", t.trade_type.to_string()),
                ExportRow::new("Quantity", ExportValue::Amount(t.quantity)),
                ExportRow::amount("Entry Price", t.entry_price),
                ExportRow::new(
                    "Exit Price",
                    t.exit_price
                        .map(ExportValue::Amount)
                        .unwrap_or_else(|| ExportValue::from("")),
                ),
                ExportRow::new("Entry", t.entry_date.to_rfc3339()),
                ExportRow::new(
                    "Exit",
                    t.exit_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
                ),
                ExportRow::amount("P&L", t.pnl),
                ExportRow::amount("Fees", t.fees),
            ]
        })
        .collect();
    ExportTable {
        filename_hint: filename_hint.to_string(),
        records,
    }
}
