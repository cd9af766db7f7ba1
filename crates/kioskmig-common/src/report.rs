use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Terminal state of one step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// The tracking ledger already had an entry; nothing was executed.
    Skipped,
    /// Apply (and backfill, when present) completed and the ledger entry
    /// was written.
    Recorded { rows_backfilled: Option<u64> },
    /// The idempotency check itself could not be evaluated.
    CheckFailed { cause: String },
    /// The mutation statement failed; nothing was recorded.
    ApplyFailed { cause: String },
    /// The schema change committed but derived data is incomplete.
    BackfillFailed { cause: String },
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StepStatus::CheckFailed { .. }
                | StepStatus::ApplyFailed { .. }
                | StepStatus::BackfillFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
}

/// Per-step outcomes for one runner invocation, in execution order.
///
/// A run that halts early still returns the outcomes of every step it
/// reached, with the failing step last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    pub outcomes: Vec<StepOutcome>,
}

impl MigrationReport {
    pub fn push(&mut self, name: impl Into<String>, status: StepStatus) {
        self.outcomes.push(StepOutcome {
            name: name.into(),
            status,
        });
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| !o.status.is_failure())
    }

    /// The failing step with its position in the declared order, if any.
    pub fn failed(&self) -> Option<(usize, &StepOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .find(|(_, o)| o.status.is_failure())
    }

    /// The failing outcome converted to its error kind, for surfacing
    /// to the operator.
    pub fn failure(&self) -> Option<Error> {
        let (_, outcome) = self.failed()?;
        let step = outcome.name.clone();
        match &outcome.status {
            StepStatus::CheckFailed { cause } => Some(Error::Check {
                step,
                cause: cause.clone(),
            }),
            StepStatus::ApplyFailed { cause } => Some(Error::Apply {
                step,
                cause: cause.clone(),
            }),
            StepStatus::BackfillFailed { cause } => Some(Error::Backfill {
                step,
                cause: cause.clone(),
            }),
            StepStatus::Skipped | StepStatus::Recorded { .. } => None,
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Skipped)
            .count()
    }

    pub fn recorded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, StepStatus::Recorded { .. }))
            .count()
    }
}
