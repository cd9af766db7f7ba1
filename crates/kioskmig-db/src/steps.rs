//! The declared, ordered step catalog for the kiosk schema.
//!
//! Order is significant and caller-declared: later steps assume earlier
//! ones have taken effect. The runner never reorders.

use rusqlite::{Connection, Transaction};

use crate::inspect::{column_exists, table_exists};
use crate::step::MigrationStep;

/// Baseline tables for the registration kiosk.
pub struct CreateBaseTables;

impl MigrationStep for CreateBaseTables {
    fn name(&self) -> &'static str {
        "create_base_tables"
    }

    fn description(&self) -> &'static str {
        "create the events and attendees tables"
    }

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool> {
        Ok(table_exists(conn, "events")? && table_exists(conn, "attendees")?)
    }

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()> {
        tx.execute_batch(
            "CREATE TABLE events (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                starts_at TEXT,
                location TEXT
            );

            CREATE TABLE attendees (
                id INTEGER PRIMARY KEY,
                full_name TEXT NOT NULL,
                email TEXT,
                registered_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
    }
}

/// Link each attendee to the event they registered for.
pub struct AddEventIdColumn;

impl MigrationStep for AddEventIdColumn {
    fn name(&self) -> &'static str {
        "add_event_id_column"
    }

    fn description(&self) -> &'static str {
        "add attendees.event_id referencing events"
    }

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool> {
        column_exists(conn, "attendees", "event_id")
    }

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()> {
        tx.execute(
            "ALTER TABLE attendees ADD COLUMN event_id INTEGER REFERENCES events(id)",
            [],
        )?;
        Ok(())
    }
}

/// Door-check flag used by the kiosk check-in screen.
pub struct AddCheckedInColumn;

impl MigrationStep for AddCheckedInColumn {
    fn name(&self) -> &'static str {
        "add_checked_in_column"
    }

    fn description(&self) -> &'static str {
        "add attendees.checked_in flag"
    }

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool> {
        column_exists(conn, "attendees", "checked_in")
    }

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()> {
        tx.execute(
            "ALTER TABLE attendees ADD COLUMN checked_in INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        Ok(())
    }
}

/// Denormalized event details on the attendee row, so badge printing
/// needs no join. The backfill only touches rows it has not filled yet.
pub struct DenormalizeEventDetails;

impl MigrationStep for DenormalizeEventDetails {
    fn name(&self) -> &'static str {
        "denormalize_event_details"
    }

    fn description(&self) -> &'static str {
        "add and backfill attendees.event_name / attendees.event_date"
    }

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool> {
        Ok(column_exists(conn, "attendees", "event_name")?
            && column_exists(conn, "attendees", "event_date")?)
    }

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()> {
        tx.execute_batch(
            "ALTER TABLE attendees ADD COLUMN event_name TEXT;
             ALTER TABLE attendees ADD COLUMN event_date TEXT;",
        )
    }

    fn backfill(&self, tx: &Transaction) -> rusqlite::Result<Option<u64>> {
        let rows = tx.execute(
            "UPDATE attendees SET
                event_name = (SELECT e.name FROM events e WHERE e.id = attendees.event_id),
                event_date = (SELECT e.starts_at FROM events e WHERE e.id = attendees.event_id)
             WHERE event_id IS NOT NULL AND event_name IS NULL",
            [],
        )?;
        Ok(Some(rows as u64))
    }
}

/// The signups table predates the attendees model and is no longer read.
pub struct DropLegacySignups;

impl MigrationStep for DropLegacySignups {
    fn name(&self) -> &'static str {
        "drop_legacy_signups"
    }

    fn description(&self) -> &'static str {
        "drop the retired signups table"
    }

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool> {
        Ok(!table_exists(conn, "signups")?)
    }

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()> {
        tx.execute("DROP TABLE signups", [])?;
        Ok(())
    }
}

/// All steps in declared order.
pub fn catalog() -> Vec<Box<dyn MigrationStep>> {
    vec![
        Box::new(CreateBaseTables),
        Box::new(AddEventIdColumn),
        Box::new(AddCheckedInColumn),
        Box::new(DenormalizeEventDetails),
        Box::new(DropLegacySignups),
    ]
}
