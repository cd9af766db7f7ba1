use rusqlite::{Connection, Transaction};

/// One idempotent, named schema or data mutation.
///
/// `is_applied` inspects the live schema and must be side-effect-free;
/// the runner consults it before ever calling `apply`, so steps never
/// rely on the store erroring harmlessly on a repeat `ALTER TABLE`.
///
/// `apply` runs inside a runner-owned transaction, so a multi-statement
/// step aborts as a unit. `backfill` populates derived data after the
/// schema change and must be independently idempotent (guard with
/// `WHERE ... IS NULL`); it commits together with the ledger entry.
pub trait MigrationStep {
    /// Unique identifier, also the ledger key.
    fn name(&self) -> &'static str;

    /// One line for the `list` command.
    fn description(&self) -> &'static str;

    fn is_applied(&self, conn: &Connection) -> rusqlite::Result<bool>;

    fn apply(&self, tx: &Transaction) -> rusqlite::Result<()>;

    /// Rows affected, or `None` when the step has no backfill.
    fn backfill(&self, _tx: &Transaction) -> rusqlite::Result<Option<u64>> {
        Ok(None)
    }
}
