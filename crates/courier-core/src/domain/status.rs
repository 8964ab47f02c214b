//! Task status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// Transitions run forward only:
/// - Pending -> Scheduled -> Dispatched -> Running -> Success | Failed
/// - any non-terminal status -> Cancelled
///
/// The agent pipeline itself only drives Pending -> Running -> Success|Failed.
/// Scheduled, Dispatched and Cancelled are reserved for a scheduler tier in
/// front of the queue; they stay representable here so records written by such
/// a tier read back without loss.
///
/// Serialized as SCREAMING_SNAKE_CASE names, which is also the store encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Dispatched,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::Dispatched => "DISPATCHED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse a wire name back into a status.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PENDING" => Some(TaskStatus::Pending),
            "SCHEDULED" => Some(TaskStatus::Scheduled),
            "DISPATCHED" => Some(TaskStatus::Dispatched),
            "RUNNING" => Some(TaskStatus::Running),
            "SUCCESS" => Some(TaskStatus::Success),
            "FAILED" => Some(TaskStatus::Failed),
            "CANCELLED" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Would moving to `next` be a legal forward transition?
    ///
    /// Skipping ahead along the chain is legal (the agent goes straight from
    /// Pending to Running); moving backward or out of a terminal status never
    /// is.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match next {
            TaskStatus::Cancelled => true,
            _ => self.stage() < next.stage(),
        }
    }

    /// Position along the forward chain; both terminal outcomes share a stage.
    fn stage(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Scheduled => 1,
            TaskStatus::Dispatched => 2,
            TaskStatus::Running => 3,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled => 4,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn status_serializes_as_wire_names() {
        let s = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(s, "\"PENDING\"");

        let s = serde_json::to_string(&TaskStatus::Success).unwrap();
        assert_eq!(s, "\"SUCCESS\"");

        let s = serde_json::to_string(&TaskStatus::Failed).unwrap();
        assert_eq!(s, "\"FAILED\"");
    }

    #[test]
    fn as_str_and_from_name_agree() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Scheduled,
            TaskStatus::Dispatched,
            TaskStatus::Running,
            TaskStatus::Success,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::from_name(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_name("RUNNING?"), None);
    }

    #[rstest]
    #[case::pending_to_running(TaskStatus::Pending, TaskStatus::Running)]
    #[case::pending_to_scheduled(TaskStatus::Pending, TaskStatus::Scheduled)]
    #[case::scheduled_to_dispatched(TaskStatus::Scheduled, TaskStatus::Dispatched)]
    #[case::running_to_success(TaskStatus::Running, TaskStatus::Success)]
    #[case::running_to_failed(TaskStatus::Running, TaskStatus::Failed)]
    #[case::running_to_cancelled(TaskStatus::Running, TaskStatus::Cancelled)]
    fn forward_transitions_are_legal(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case::running_back_to_pending(TaskStatus::Running, TaskStatus::Pending)]
    #[case::dispatched_back_to_scheduled(TaskStatus::Dispatched, TaskStatus::Scheduled)]
    #[case::success_to_failed(TaskStatus::Success, TaskStatus::Failed)]
    #[case::failed_to_running(TaskStatus::Failed, TaskStatus::Running)]
    #[case::cancelled_to_cancelled(TaskStatus::Cancelled, TaskStatus::Cancelled)]
    #[case::success_to_cancelled(TaskStatus::Success, TaskStatus::Cancelled)]
    fn backward_and_terminal_transitions_are_illegal(
        #[case] from: TaskStatus,
        #[case] to: TaskStatus,
    ) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }
}
