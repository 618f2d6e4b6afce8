//! SQLite storage for an offline trade journal.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tradejournal_api::types::{FeeRecord, FuturesTradeRecord, RawTimestamp, RecordId, SwapTradeRecord};

/// Bound parameters per `IN (...)` chunk, below SQLite's default limit.
const IN_CHUNK_SIZE: usize = 500;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counts from an import batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Rows without an id, which cannot be keyed.
    pub skipped: usize,
}

pub struct Db {
    conn: Connection,
}

fn timestamp_to_value(ts: Option<&RawTimestamp>) -> Result<Value, DbError> {
    Ok(match ts {
        None => Value::Null,
        Some(RawTimestamp::Millis(ms)) => Value::Integer(*ms),
        Some(RawTimestamp::FractionalMillis(ms)) => Value::Real(*ms),
        Some(RawTimestamp::Text(s)) => Value::Text(s.clone()),
        Some(RawTimestamp::Other(v)) => Value::Text(serde_json::to_string(v)?),
    })
}

fn timestamp_from_value(value: Value) -> Option<RawTimestamp> {
    match value {
        Value::Integer(ms) => Some(RawTimestamp::Millis(ms)),
        Value::Real(ms) => Some(RawTimestamp::FractionalMillis(ms)),
        Value::Text(s) => Some(RawTimestamp::Text(s)),
        Value::Null | Value::Blob(_) => None,
    }
}

fn futures_from_row(row: &Row<'_>) -> rusqlite::Result<FuturesTradeRecord> {
    Ok(FuturesTradeRecord {
        id: Some(RecordId::Text(row.get(0)?)),
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        side: row.get(3)?,
        quantity: row.get(4)?,
        entry_price: row.get(5)?,
        exit_price: row.get(6)?,
        entry_date: timestamp_from_value(row.get(7)?),
        exit_date: timestamp_from_value(row.get(8)?),
        pnl: row.get(9)?,
        fees: row.get(10)?,
        trade_type: row.get(11)?,
    })
}

fn swap_from_row(row: &Row<'_>) -> rusqlite::Result<SwapTradeRecord> {
    Ok(SwapTradeRecord {
        id: Some(RecordId::Text(row.get(0)?)),
        user_id: row.get(1)?,
        token_in: row.get(2)?,
        token_out: row.get(3)?,
        amount_in: row.get(4)?,
        amount_out: row.get(5)?,
        timestamp: timestamp_from_value(row.get(6)?),
        fees: row.get(7)?,
        signature: row.get(8)?,
    })
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), DbError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.migrate_v1()?;
            self.conn.pragma_update(None, "user_version", 1)?;
        }

        if version < 2 {
            self.migrate_v2()?;
            self.conn.pragma_update(None, "user_version", 2)?;
        }

        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        Ok(())
    }

    /// Journals created before swap signatures were recorded lack the column.
    fn migrate_v1(&self) -> Result<(), DbError> {
        match self
            .conn
            .execute("ALTER TABLE solana_trades ADD COLUMN signature TEXT", [])
        {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                if msg.contains("duplicate column name") || msg.contains("no such table") =>
            {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fee entries used to be shared across users. Old rows keep a NULL owner
    /// and stop counting toward any user until fees are imported again.
    fn migrate_v2(&self) -> Result<(), DbError> {
        match self
            .conn
            .execute("ALTER TABLE trade_fees ADD COLUMN user_id TEXT", [])
        {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                if msg.contains("duplicate column name") || msg.contains("no such table") => {}
            Err(e) => return Err(e.into()),
        }
        self.conn
            .execute_batch("DROP INDEX IF EXISTS idx_trade_fees_trade;")?;
        Ok(())
    }

    pub fn trade_count(&self, user_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM trades WHERE user_id = ?1)
                  + (SELECT COUNT(*) FROM solana_trades WHERE user_id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Inserts or replaces futures rows for `user_id`.
    pub fn insert_trades(
        &mut self,
        user_id: &str,
        records: &[FuturesTradeRecord],
    ) -> Result<ImportSummary, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut summary = ImportSummary::default();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trades (
                   id, user_id, symbol, side, quantity, entry_price, exit_price,
                   entry_date, exit_date, pnl, fees, trade_type, imported_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(user_id, id) DO UPDATE SET
                   symbol = excluded.symbol,
                   side = excluded.side,
                   quantity = excluded.quantity,
                   entry_price = excluded.entry_price,
                   exit_price = excluded.exit_price,
                   entry_date = excluded.entry_date,
                   exit_date = excluded.exit_date,
                   pnl = excluded.pnl,
                   fees = excluded.fees,
                   trade_type = excluded.trade_type,
                   imported_at = excluded.imported_at",
            )?;
            for record in records {
                let Some(id) = record.id.as_ref() else {
                    summary.skipped += 1;
                    continue;
                };
                stmt.execute(params![
                    id.to_string(),
                    user_id,
                    record.symbol,
                    record.side,
                    record.quantity,
                    record.entry_price,
                    record.exit_price,
                    timestamp_to_value(record.entry_date.as_ref())?,
                    timestamp_to_value(record.exit_date.as_ref())?,
                    record.pnl,
                    record.fees,
                    record.trade_type,
                    now,
                ])?;
                summary.inserted += 1;
            }
        }
        tx.commit()?;
        Ok(summary)
    }

    /// Inserts or replaces swap rows for `user_id`.
    pub fn insert_swap_trades(
        &mut self,
        user_id: &str,
        records: &[SwapTradeRecord],
    ) -> Result<ImportSummary, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut summary = ImportSummary::default();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO solana_trades (
                   id, user_id, token_in, token_out, amount_in, amount_out,
                   timestamp, fees, signature, imported_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(user_id, id) DO UPDATE SET
                   token_in = excluded.token_in,
                   token_out = excluded.token_out,
                   amount_in = excluded.amount_in,
                   amount_out = excluded.amount_out,
                   timestamp = excluded.timestamp,
                   fees = excluded.fees,
                   signature = COALESCE(excluded.signature, solana_trades.signature),
                   imported_at = excluded.imported_at",
            )?;
            for record in records {
                let Some(id) = record.id.as_ref() else {
                    summary.skipped += 1;
                    continue;
                };
                stmt.execute(params![
                    id.to_string(),
                    user_id,
                    record.token_in,
                    record.token_out,
                    record.amount_in,
                    record.amount_out,
                    timestamp_to_value(record.timestamp.as_ref())?,
                    record.fees,
                    record.signature,
                    now,
                ])?;
                summary.inserted += 1;
            }
        }
        tx.commit()?;
        Ok(summary)
    }

    /// Stores ledger fee entries for `user_id`. Several entries may share a
    /// trade id. Every trade id in the batch has its earlier entries replaced,
    /// so importing the same ledger twice does not double its fees.
    pub fn insert_fees(&mut self, user_id: &str, fees: &[FeeRecord]) -> Result<usize, DbError> {
        let trade_ids: BTreeSet<String> = fees.iter().map(|f| f.trade_id.to_string()).collect();
        let tx = self.conn.transaction()?;
        {
            let mut clear =
                tx.prepare("DELETE FROM trade_fees WHERE user_id = ?1 AND trade_id = ?2")?;
            for trade_id in &trade_ids {
                clear.execute(params![user_id, trade_id])?;
            }
            let mut insert = tx.prepare(
                "INSERT INTO trade_fees (user_id, trade_id, amount) VALUES (?1, ?2, ?3)",
            )?;
            for fee in fees {
                insert.execute(params![user_id, fee.trade_id.to_string(), fee.amount])?;
            }
        }
        tx.commit()?;
        Ok(fees.len())
    }

    /// Futures rows for `user_id`, ordered by entry time as stored.
    pub fn list_trades(&self, user_id: &str) -> Result<Vec<FuturesTradeRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, symbol, side, quantity, entry_price, exit_price,
                    entry_date, exit_date, pnl, fees, trade_type
             FROM trades
             WHERE user_id = ?1
             ORDER BY entry_date ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![user_id], futures_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_swap_trades(&self, user_id: &str) -> Result<Vec<SwapTradeRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, token_in, token_out, amount_in, amount_out,
                    timestamp, fees, signature
             FROM solana_trades
             WHERE user_id = ?1
             ORDER BY timestamp ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![user_id], swap_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Total ledger fees `user_id` booked against `trade_ids`. Null amounts
    /// count as 0.
    pub fn sum_fees<S: AsRef<str>>(&self, user_id: &str, trade_ids: &[S]) -> Result<f64, DbError> {
        let mut total = 0.0;
        for chunk in trade_ids.chunks(IN_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT COALESCE(SUM(amount), 0.0) FROM trade_fees
                 WHERE user_id = ? AND trade_id IN ({})",
                placeholders
            );
            let bound = std::iter::once(user_id).chain(chunk.iter().map(|id| id.as_ref()));
            let sum: f64 = self
                .conn
                .query_row(&sql, params_from_iter(bound), |row| row.get(0))?;
            total += sum;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn get_user_version(db: &Db) -> i32 {
        db.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("read user_version")
    }

    fn futures(id: Option<RecordId>, entry: RawTimestamp) -> FuturesTradeRecord {
        FuturesTradeRecord {
            id,
            symbol: Some("ES".to_string()),
            side: Some("long".to_string()),
            entry_date: Some(entry),
            pnl: Some(12.5),
            fees: Some(1.0),
            ..Default::default()
        }
    }

    #[test]
    fn init_is_idempotent() {
        let db = open_test_db();
        db.init().expect("second init");
        assert_eq!(get_user_version(&db), 2);
    }

    #[test]
    fn migrate_adds_signature_to_old_swap_table() {
        let db = Db::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "CREATE TABLE solana_trades (
                    id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    token_in TEXT,
                    token_out TEXT,
                    amount_in REAL,
                    amount_out REAL,
                    timestamp,
                    fees REAL,
                    imported_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, id)
                );",
            )
            .unwrap();
        db.init().unwrap();
        let has_signature: bool = db
            .conn
            .prepare("PRAGMA table_info(solana_trades)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .any(|name| name == "signature");
        assert!(has_signature);
    }

    #[test]
    fn trades_round_trip_and_sort_by_entry() {
        let mut db = open_test_db();
        let summary = db
            .insert_trades(
                "u1",
                &[
                    futures(Some(RecordId::Int(2)), RawTimestamp::from("2025-02-01")),
                    futures(Some(RecordId::Int(1)), RawTimestamp::from("2025-01-01")),
                    futures(None, RawTimestamp::from("2025-01-15")),
                ],
            )
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 2, skipped: 1 });

        let rows = db.list_trades("u1").unwrap();
        let ids: Vec<String> = rows.iter().map(|r| r.id.as_ref().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(rows[0].entry_date, Some(RawTimestamp::from("2025-01-01")));
        assert_eq!(rows[0].pnl, Some(12.5));
        assert!(db.list_trades("someone-else").unwrap().is_empty());
    }

    #[test]
    fn timestamp_forms_survive_storage() {
        let mut db = open_test_db();
        db.insert_trades(
            "u1",
            &[
                futures(Some(RecordId::Int(1)), RawTimestamp::Millis(1_738_800_000_000)),
                futures(Some(RecordId::Int(2)), RawTimestamp::FractionalMillis(1.5)),
            ],
        )
        .unwrap();
        let rows = db.list_trades("u1").unwrap();
        let dates: Vec<Option<RawTimestamp>> = rows.into_iter().map(|r| r.entry_date).collect();
        assert!(dates.contains(&Some(RawTimestamp::Millis(1_738_800_000_000))));
        assert!(dates.contains(&Some(RawTimestamp::FractionalMillis(1.5))));
    }

    #[test]
    fn reimport_replaces_rows() {
        let mut db = open_test_db();
        let mut row = futures(Some(RecordId::Int(1)), RawTimestamp::from("2025-01-01"));
        db.insert_trades("u1", &[row.clone()]).unwrap();
        row.pnl = Some(-3.0);
        db.insert_trades("u1", &[row]).unwrap();

        let rows = db.list_trades("u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pnl, Some(-3.0));
        assert_eq!(db.trade_count("u1").unwrap(), 1);
    }

    #[test]
    fn swaps_round_trip() {
        let mut db = open_test_db();
        let swap = SwapTradeRecord {
            id: Some(RecordId::from("sig-1")),
            token_in: Some("SOL".to_string()),
            token_out: Some("USDC".to_string()),
            amount_in: Some(1.0),
            amount_out: Some(150.0),
            timestamp: Some(RawTimestamp::from("2025-03-01T12:00:00Z")),
            signature: Some("5abc".to_string()),
            ..Default::default()
        };
        db.insert_swap_trades("u1", &[swap]).unwrap();
        let rows = db.list_swap_trades("u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].signature.as_deref(), Some("5abc"));
        assert_eq!(rows[0].amount_out, Some(150.0));
    }

    #[test]
    fn migrate_adds_owner_to_old_fee_table() {
        let mut db = Db::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "CREATE TABLE trade_fees (
                    fee_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    trade_id TEXT NOT NULL,
                    amount REAL
                );
                CREATE INDEX idx_trade_fees_trade ON trade_fees(trade_id);
                INSERT INTO trade_fees (trade_id, amount) VALUES ('1', 9.0);
                PRAGMA user_version = 1;",
            )
            .unwrap();
        db.init().unwrap();
        assert_eq!(get_user_version(&db), 2);

        // Ownerless legacy rows are not attributed to anyone.
        assert_eq!(db.sum_fees("u1", &["1"]).unwrap(), 0.0);
        db.insert_fees("u1", &[FeeRecord { trade_id: RecordId::Int(1), amount: Some(2.0) }])
            .unwrap();
        assert_eq!(db.sum_fees("u1", &["1"]).unwrap(), 2.0);
    }

    #[test]
    fn sum_fees_over_ids() {
        let mut db = open_test_db();
        db.insert_fees(
            "u1",
            &[
                FeeRecord { trade_id: RecordId::Int(1), amount: Some(3.0) },
                FeeRecord { trade_id: RecordId::Int(2), amount: Some(2.0) },
                FeeRecord { trade_id: RecordId::Int(2), amount: None },
                FeeRecord { trade_id: RecordId::Int(9), amount: Some(100.0) },
            ],
        )
        .unwrap();

        assert_eq!(db.sum_fees("u1", &["1", "2"]).unwrap(), 5.0);
        assert_eq!(db.sum_fees::<&str>("u1", &[]).unwrap(), 0.0);
        assert_eq!(db.sum_fees("u1", &["404"]).unwrap(), 0.0);
    }

    #[test]
    fn reimporting_fees_does_not_double_them() {
        let mut db = open_test_db();
        let ledger = [
            FeeRecord { trade_id: RecordId::Int(1), amount: Some(5.0) },
            FeeRecord { trade_id: RecordId::Int(1), amount: Some(1.0) },
        ];
        db.insert_fees("u1", &ledger).unwrap();
        db.insert_fees("u1", &ledger).unwrap();
        assert_eq!(db.sum_fees("u1", &["1"]).unwrap(), 6.0);

        // A corrected ledger replaces the trade's entries.
        db.insert_fees("u1", &[FeeRecord { trade_id: RecordId::Int(1), amount: Some(4.0) }])
            .unwrap();
        assert_eq!(db.sum_fees("u1", &["1"]).unwrap(), 4.0);
    }

    #[test]
    fn fees_are_scoped_to_their_user() {
        let mut db = open_test_db();
        let row = futures(Some(RecordId::Int(1)), RawTimestamp::from("2025-01-01"));
        db.insert_trades("alice", &[row.clone()]).unwrap();
        db.insert_trades("bob", &[row]).unwrap();
        db.insert_fees("alice", &[FeeRecord { trade_id: RecordId::Int(1), amount: Some(7.0) }])
            .unwrap();

        assert_eq!(db.sum_fees("alice", &["1"]).unwrap(), 7.0);
        assert_eq!(db.sum_fees("bob", &["1"]).unwrap(), 0.0);

        // Replacing bob's entries leaves alice's alone.
        db.insert_fees("bob", &[FeeRecord { trade_id: RecordId::Int(1), amount: Some(1.0) }])
            .unwrap();
        assert_eq!(db.sum_fees("alice", &["1"]).unwrap(), 7.0);
        assert_eq!(db.sum_fees("bob", &["1"]).unwrap(), 1.0);
    }

    #[test]
    fn sum_fees_spans_chunks() {
        let mut db = open_test_db();
        let fees: Vec<FeeRecord> = (0..(IN_CHUNK_SIZE as i64 + 10))
            .map(|i| FeeRecord { trade_id: RecordId::Int(i), amount: Some(1.0) })
            .collect();
        db.insert_fees("u1", &fees).unwrap();
        let ids: Vec<String> = (0..(IN_CHUNK_SIZE as i64 + 10)).map(|i| i.to_string()).collect();
        assert_eq!(db.sum_fees("u1", &ids).unwrap(), (IN_CHUNK_SIZE + 10) as f64);
    }
}
