// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outcome of a cascade cleanup.

use serde::Serialize;

/// Result of one cleanup step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Data existed and was removed.
    Deleted { count: usize },
    /// Nothing to delete.
    Absent,
    /// The step failed; residual data may remain.
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

/// Per-step outcomes for one deleted account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub uid: String,
    pub documents: StepOutcome,
    pub storage: StepOutcome,
}

impl CleanupReport {
    /// True when no step failed, i.e. nothing is known to remain.
    pub fn is_clean(&self) -> bool {
        !self.documents.is_failed() && !self.storage.is_failed()
    }
}
