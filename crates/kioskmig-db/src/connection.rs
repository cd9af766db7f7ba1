use kioskmig_common::{Error, Result};
use kioskmig_config::DbConfig;
use rusqlite::Connection;
use tracing::{info, warn};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;";

/// Open the kiosk database named by `config`.
///
/// The returned connection is owned by a single run invocation; dropping
/// it on any exit path closes the database.
pub fn open(config: &DbConfig) -> Result<Connection> {
    let overridden = config.networked_overrides();
    if !overridden.is_empty() {
        warn!(
            "networked connection options ({}) are ignored by the embedded store",
            overridden.join(", ")
        );
    }

    let conn = Connection::open(&config.database).map_err(|e| {
        Error::Connection(format!("failed to open {}: {e}", config.database))
    })?;
    apply_pragmas(&conn)?;

    info!("opened database {}", config.database);
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Connection(format!("failed to open in-memory database: {e}")))?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(PRAGMAS)
        .map_err(|e| Error::Connection(format!("failed to set pragmas: {e}")))
}

/// Connectivity probe: one round trip, no side effects.
pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |_| Ok(()))
        .map_err(|e| Error::Connection(format!("ping failed: {e}")))
}
