//! Sequences the step catalog against one connection: check, apply,
//! backfill, record, fail fast.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kioskmig_common::{Error, MigrationReport, Result, StepStatus};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::step::MigrationStep;
use crate::tracking;

/// Run `steps` in declared order.
///
/// Per step: a ledger entry means `Skipped`. Otherwise the live check
/// decides whether `apply` still has to run; `backfill` and the ledger
/// entry then commit in one transaction, so an entry exists iff apply
/// and backfill both completed. The first failure ends the run and is
/// returned inside the partial report.
///
/// `Err` is reserved for faults outside any single step: a broken
/// tracking table, a duplicate step name.
pub fn run(conn: &mut Connection, steps: &[Box<dyn MigrationStep>]) -> Result<MigrationReport> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.name()) {
            return Err(Error::Other(format!(
                "duplicate step name `{}`",
                step.name()
            )));
        }
    }

    tracking::ensure(conn)?;

    let mut report = MigrationReport::default();

    for step in steps {
        let name = step.name();

        if tracking::is_recorded(conn, name)? {
            info!("step {name}: already recorded, skipped");
            report.push(name, StepStatus::Skipped);
            continue;
        }

        let applied_live = match step.is_applied(conn) {
            Ok(applied) => applied,
            Err(e) => {
                error!("step {name}: idempotency check failed: {e}");
                report.push(
                    name,
                    StepStatus::CheckFailed {
                        cause: e.to_string(),
                    },
                );
                return Ok(report);
            }
        };

        if applied_live {
            // Prior run applied the schema change but never recorded it
            // (a failed backfill, or a change made out of band). Resume
            // from the backfill.
            info!("step {name}: schema change already present, completing without apply");
        } else {
            let tx = match conn.transaction() {
                Ok(tx) => tx,
                Err(e) => {
                    error!("step {name}: apply failed: {e}");
                    report.push(
                        name,
                        StepStatus::ApplyFailed {
                            cause: e.to_string(),
                        },
                    );
                    return Ok(report);
                }
            };
            // A failed apply drops the transaction uncommitted, so a
            // multi-statement step cannot leave half a schema behind.
            let applied = match step.apply(&tx) {
                Ok(()) => tx.commit(),
                Err(e) => Err(e),
            };
            if let Err(e) = applied {
                error!("step {name}: apply failed: {e}");
                report.push(
                    name,
                    StepStatus::ApplyFailed {
                        cause: e.to_string(),
                    },
                );
                return Ok(report);
            }
            info!("step {name}: schema change applied");
        }

        let tx = conn
            .transaction()
            .map_err(|e| Error::Tracking(format!("failed to begin record transaction: {e}")))?;

        let rows_backfilled = match step.backfill(&tx) {
            Ok(rows) => rows,
            Err(e) => {
                error!("step {name}: backfill failed: {e}");
                report.push(
                    name,
                    StepStatus::BackfillFailed {
                        cause: e.to_string(),
                    },
                );
                return Ok(report);
            }
        };

        tracking::record(&tx, name)?;
        tx.commit()
            .map_err(|e| Error::Tracking(format!("failed to record step `{name}`: {e}")))?;

        match rows_backfilled {
            Some(rows) => info!("step {name}: recorded ({rows} rows backfilled)"),
            None => info!("step {name}: recorded"),
        }
        report.push(name, StepStatus::Recorded { rows_backfilled });
    }

    Ok(report)
}

/// Row for the `status` command: ledger state plus the live check.
#[derive(Debug, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub description: String,
    pub recorded_at: Option<DateTime<Utc>>,
    /// `None` when the check could not be evaluated.
    pub applied_live: Option<bool>,
}

/// Read-only view of every step's state. Never creates the ledger and
/// never takes the run lock.
pub fn status(conn: &Connection, steps: &[Box<dyn MigrationStep>]) -> Result<Vec<StatusRow>> {
    let ledger_exists = tracking::exists(conn)?;

    steps
        .iter()
        .map(|step| {
            let recorded_at = if ledger_exists {
                tracking::applied_at(conn, step.name())?
            } else {
                None
            };
            let applied_live = match step.is_applied(conn) {
                Ok(applied) => Some(applied),
                Err(e) => {
                    warn!("step {}: status check failed: {e}", step.name());
                    None
                }
            };
            Ok(StatusRow {
                name: step.name().to_string(),
                description: step.description().to_string(),
                recorded_at,
                applied_live,
            })
        })
        .collect()
}
