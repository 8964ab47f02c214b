//! Outcome model: the result of one execution attempt.

use super::status::TaskStatus;

/// Classification of an execution attempt.
///
/// Decided by the executor from the process exit code (or timeout / spawn
/// failure); nothing downstream re-infers it from the result text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failed,
}

/// Classification plus the captured text that goes into the task record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub kind: OutcomeKind,
    pub text: String,
}

impl ExecutionOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Success,
            text: text.into(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// The terminal task status this outcome maps to.
    pub fn final_status(&self) -> TaskStatus {
        match self.kind {
            OutcomeKind::Success => TaskStatus::Success,
            OutcomeKind::Failed => TaskStatus::Failed,
        }
    }
}
