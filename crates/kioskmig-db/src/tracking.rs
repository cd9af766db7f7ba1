//! The tracking ledger: which steps have completed, persisted in the
//! target database. Append-only; the source of truth for reruns.

use chrono::{DateTime, Utc};
use kioskmig_common::{Error, Result};
use rusqlite::Connection;
use serde::Serialize;

const LEDGER_TABLE: &str = "_migrations";

/// One row of the tracking table.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub step_name: String,
    pub applied_at: DateTime<Utc>,
}

/// Create the tracking table on first use.
pub fn ensure(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
                step_name TEXT PRIMARY KEY,
                applied_at TIMESTAMP NOT NULL DEFAULT (datetime('now'))
            )"
        ),
        [],
    )
    .map_err(|e| Error::Tracking(format!("failed to create tracking table: {e}")))?;
    Ok(())
}

/// True once [`ensure`] has created the ledger. Lets read-only callers
/// avoid creating it as a side effect.
pub fn exists(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [LEDGER_TABLE],
            |row| row.get(0),
        )
        .map_err(|e| Error::Tracking(format!("failed to probe tracking table: {e}")))?;
    Ok(count > 0)
}

pub fn is_recorded(conn: &Connection, step_name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {LEDGER_TABLE} WHERE step_name = ?1"),
            [step_name],
            |row| row.get(0),
        )
        .map_err(|e| Error::Tracking(format!("failed to read tracking table: {e}")))?;
    Ok(count > 0)
}

/// Append an entry. Called inside the runner's record transaction, after
/// apply and backfill have both completed.
pub fn record(conn: &Connection, step_name: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO {LEDGER_TABLE} (step_name) VALUES (?1)"),
        [step_name],
    )
    .map_err(|e| Error::Tracking(format!("failed to record step `{step_name}`: {e}")))?;
    Ok(())
}

pub fn applied_at(conn: &Connection, step_name: &str) -> Result<Option<DateTime<Utc>>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT applied_at FROM {LEDGER_TABLE} WHERE step_name = ?1"
        ))
        .map_err(|e| Error::Tracking(format!("failed to read tracking table: {e}")))?;

    let raw = stmt
        .query_row([step_name], |row| row.get::<_, String>(0))
        .ok();
    Ok(raw.map(parse_datetime))
}

/// All entries in application order.
pub fn entries(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT step_name, applied_at FROM {LEDGER_TABLE}
             ORDER BY applied_at, step_name"
        ))
        .map_err(|e| Error::Tracking(format!("failed to read tracking table: {e}")))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| Error::Tracking(format!("failed to read tracking table: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        let (step_name, raw) =
            row.map_err(|e| Error::Tracking(format!("failed to read ledger row: {e}")))?;
        out.push(LedgerEntry {
            step_name,
            applied_at: parse_datetime(raw),
        });
    }
    Ok(out)
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            // SQLite datetime('now') produces "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
                .unwrap_or_else(|_| Utc::now())
        })
}
