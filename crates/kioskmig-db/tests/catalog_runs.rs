//! End-to-end runs of the real step catalog against in-memory databases:
//! a fresh kiosk install, a rerun, and a legacy database mid-migration.

use kioskmig_common::StepStatus;
use kioskmig_db::{catalog, open_in_memory, run, status, tracking};

#[test]
fn fresh_database_applies_every_step_once() {
    let mut conn = open_in_memory().unwrap();
    let steps = catalog();

    let report = run(&mut conn, &steps).unwrap();

    assert!(report.is_success());
    assert_eq!(report.recorded_count(), 5);

    let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "create_base_tables",
            "add_event_id_column",
            "add_checked_in_column",
            "denormalize_event_details",
            "drop_legacy_signups",
        ]
    );

    // Every step is in the ledger.
    assert_eq!(tracking::entries(&conn).unwrap().len(), 5);

    // The attendee table carries all migrated columns.
    conn.execute(
        "INSERT INTO attendees (full_name, event_id, checked_in, event_name, event_date)
         VALUES ('Ada', NULL, 0, NULL, NULL)",
        [],
    )
    .unwrap();
}

#[test]
fn second_run_is_a_no_op() {
    let mut conn = open_in_memory().unwrap();
    let steps = catalog();

    run(&mut conn, &steps).unwrap();
    let before: Vec<String> = schema_dump(&conn);

    let second = run(&mut conn, &steps).unwrap();

    assert!(second.is_success());
    assert_eq!(second.skipped_count(), 5);
    assert_eq!(second.recorded_count(), 0);
    assert_eq!(tracking::entries(&conn).unwrap().len(), 5);
    assert_eq!(schema_dump(&conn), before);
}

#[test]
fn legacy_database_resumes_and_backfills() {
    let mut conn = open_in_memory().unwrap();

    // A kiosk database from the old deployment: base tables and the two
    // added columns are live but nothing was ever recorded, the retired
    // signups table still exists, and attendees already reference events.
    conn.execute_batch(
        "CREATE TABLE events (id INTEGER PRIMARY KEY, name TEXT NOT NULL, starts_at TEXT, location TEXT);
         CREATE TABLE attendees (
             id INTEGER PRIMARY KEY,
             full_name TEXT NOT NULL,
             email TEXT,
             registered_at TEXT NOT NULL DEFAULT (datetime('now')),
             event_id INTEGER REFERENCES events(id),
             checked_in INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE signups (id INTEGER PRIMARY KEY, name TEXT);

         INSERT INTO events (id, name, starts_at) VALUES
             (1, 'Spring Gala', '2026-04-18'),
             (2, 'Volunteer Day', '2026-05-02');
         INSERT INTO attendees (id, full_name, event_id) VALUES
             (1, 'Ada', 1),
             (2, 'Grace', 2),
             (3, 'Walk-in', NULL);",
    )
    .unwrap();

    let steps = catalog();
    let report = run(&mut conn, &steps).unwrap();

    assert!(report.is_success());
    assert_eq!(report.recorded_count(), 5);

    // The denormalization backfilled exactly the two linked attendees.
    let denormalize = report
        .outcomes
        .iter()
        .find(|o| o.name == "denormalize_event_details")
        .unwrap();
    assert_eq!(
        denormalize.status,
        StepStatus::Recorded {
            rows_backfilled: Some(2)
        }
    );

    let name: Option<String> = conn
        .query_row("SELECT event_name FROM attendees WHERE id = 1", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(name.as_deref(), Some("Spring Gala"));

    let walk_in: Option<String> = conn
        .query_row("SELECT event_name FROM attendees WHERE id = 3", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert!(walk_in.is_none());

    // The retired table is gone.
    let signups: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'signups'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(signups, 0);
}

#[test]
fn status_tracks_a_run() {
    let mut conn = open_in_memory().unwrap();
    let steps = catalog();

    let rows = status(&conn, &steps).unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.recorded_at.is_none()));
    // Column checks cannot be evaluated before the base tables exist.
    assert_eq!(rows[0].applied_live, Some(false));
    assert_eq!(rows[1].applied_live, None);

    run(&mut conn, &steps).unwrap();

    let rows = status(&conn, &steps).unwrap();
    assert!(rows.iter().all(|r| r.recorded_at.is_some()));
    assert!(rows.iter().all(|r| r.applied_live == Some(true)));
}

fn schema_dump(conn: &rusqlite::Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT COALESCE(sql, '') FROM sqlite_master ORDER BY name")
        .unwrap();
    let rows = stmt.query_map([], |row| row.get(0)).unwrap();
    rows.collect::<Result<_, _>>().unwrap()
}
