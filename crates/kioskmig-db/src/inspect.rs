//! Live-schema introspection: the building blocks for step idempotency
//! checks, plus the table listing the operator-facing `tables` command
//! uses.

use rusqlite::Connection;

/// True if a table with this name exists.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// True if `table` has a column named `column`.
///
/// A missing table is an error, not `false`, so a mis-ordered catalog
/// surfaces as a check failure instead of a silent skip or re-apply.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    // Fails with "no such table" when the table is missing.
    conn.prepare(&format!("SELECT 1 FROM \"{table}\" LIMIT 0"))?;

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Names of user tables, excluding SQLite internals, ordered by name.
pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Row count for one table.
pub fn row_count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })
}
