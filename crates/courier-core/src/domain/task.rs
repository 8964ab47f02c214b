//! The task entity: one unit of work and its full history.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::TaskStatus;

/// What kind of work a task carries.
///
/// Closed set on purpose: each variant maps to one executor registration, so
/// adding a type means adding a variant plus an executor, not growing a
/// conditional somewhere. PythonScript has no executor yet and fails cleanly
/// at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Shell,
    PythonScript,
}

impl TaskType {
    /// Wire name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Shell => "SHELL",
            TaskType::PythonScript => "PYTHON_SCRIPT",
        }
    }

    /// Parse a wire name back into a type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHELL" => Some(TaskType::Shell),
            "PYTHON_SCRIPT" => Some(TaskType::PythonScript),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work.
///
/// The JSON form of this struct is the queue wire format: camelCase field
/// names, enum wire names for `type` and `status`, timestamps as epoch
/// milliseconds, unset optional fields omitted entirely.
///
/// Mutation happens through the transition methods below; only the processor
/// calls them, in order, after dequeue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: Uuid,

    pub name: String,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub payload: String,

    pub status: TaskStatus,

    /// Which agent claimed the task; unset until dequeue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Captured output or error description; unset until finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub creation_time: DateTime<Utc>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub finish_time: Option<DateTime<Utc>>,

    /// Reserved for a retry policy; nothing consumes it yet.
    #[serde(default)]
    pub retry_count: u32,
}

impl Task {
    /// Create a fresh Pending task with a generated id.
    pub fn new(name: impl Into<String>, task_type: TaskType, payload: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            name: name.into(),
            task_type,
            payload: payload.into(),
            status: TaskStatus::Pending,
            agent_id: None,
            result: None,
            creation_time: now_millis(),
            start_time: None,
            finish_time: None,
            retry_count: 0,
        }
    }

    /// Stamp the agent that claimed this task.
    pub fn assign_agent(&mut self, agent_id: impl Into<String>) {
        self.agent_id = Some(agent_id.into());
    }

    /// Mark as running and record the start time.
    pub fn begin(&mut self) {
        self.status = TaskStatus::Running;
        self.start_time = Some(now_millis());
    }

    /// Record the terminal outcome: final status, result text, finish time.
    pub fn finish(&mut self, status: TaskStatus, result: impl Into<String>) {
        self.status = status;
        self.result = Some(result.into());
        self.finish_time = Some(now_millis());
    }
}

/// Current time truncated to millisecond precision.
///
/// The wire format carries epoch milliseconds, so keeping finer precision in
/// memory would make a task unequal to its own round-trip.
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_serializes_as_wire_names() {
        let s = serde_json::to_string(&TaskType::Shell).unwrap();
        assert_eq!(s, "\"SHELL\"");

        let s = serde_json::to_string(&TaskType::PythonScript).unwrap();
        assert_eq!(s, "\"PYTHON_SCRIPT\"");
    }

    #[test]
    fn new_task_is_pending_with_generated_id() {
        let a = Task::new("one", TaskType::Shell, "echo 1");
        let b = Task::new("two", TaskType::Shell, "echo 2");

        assert_eq!(a.status, TaskStatus::Pending);
        assert_ne!(a.task_id, b.task_id);
        assert_eq!(a.agent_id, None);
        assert_eq!(a.result, None);
        assert_eq!(a.start_time, None);
        assert_eq!(a.finish_time, None);
        assert_eq!(a.retry_count, 0);
    }

    #[test]
    fn fresh_task_json_omits_unset_fields() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let value: serde_json::Value = serde_json::to_value(&task).unwrap();
        let object = value.as_object().unwrap();

        assert!(object.contains_key("taskId"));
        assert_eq!(object["type"], "SHELL");
        assert_eq!(object["status"], "PENDING");
        assert!(object["creationTime"].is_i64());
        assert_eq!(object["retryCount"], 0);

        assert!(!object.contains_key("agentId"));
        assert!(!object.contains_key("result"));
        assert!(!object.contains_key("startTime"));
        assert!(!object.contains_key("finishTime"));
    }

    #[test]
    fn wire_roundtrip_preserves_every_field() {
        let mut task = Task::new("greet", TaskType::Shell, "echo hello");
        task.assign_agent("agent-007");
        task.begin();
        task.finish(TaskStatus::Success, "hello\n");

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn transition_methods_stamp_times_in_order() {
        let mut task = Task::new("timed", TaskType::Shell, "true");
        task.begin();
        task.finish(TaskStatus::Failed, "Command failed with exit code 1.\n");

        let start = task.start_time.unwrap();
        let finish = task.finish_time.unwrap();
        assert!(start <= finish);
        assert!(task.creation_time <= start);
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn descriptor_with_only_required_fields_decodes() {
        let json = format!(
            "{{\"taskId\":\"{}\",\"name\":\"bare\",\"type\":\"SHELL\",\
             \"payload\":\"true\",\"status\":\"PENDING\",\"creationTime\":1700000000000}}",
            Uuid::new_v4()
        );
        let task: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.agent_id, None);
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.creation_time.timestamp_millis(), 1_700_000_000_000);
    }

    // producers built on Jackson write unset fields as explicit nulls rather
    // than omitting them; both shapes must decode the same way
    #[test]
    fn explicit_null_optionals_decode_as_unset() {
        let json = format!(
            "{{\"taskId\":\"{}\",\"name\":\"nulled\",\"type\":\"SHELL\",\
             \"payload\":\"true\",\"status\":\"PENDING\",\"creationTime\":1700000000000,\
             \"agentId\":null,\"result\":null,\"startTime\":null,\"finishTime\":null}}",
            Uuid::new_v4()
        );
        let task: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.agent_id, None);
        assert_eq!(task.result, None);
        assert_eq!(task.start_time, None);
        assert_eq!(task.finish_time, None);
    }
}
