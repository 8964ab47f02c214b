//! Flat field layout shared by every store implementation.
//!
//! One task record is a set of string key/value pairs keyed by the names
//! below. Optional fields are simply absent until set, never written as
//! placeholders, so a partial update can only ever touch what it names.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{Task, TaskStatus, TaskType};
use crate::error::DecodeError;

pub const TASK_ID: &str = "taskId";
pub const NAME: &str = "name";
pub const TYPE: &str = "type";
pub const PAYLOAD: &str = "payload";
pub const STATUS: &str = "status";
pub const AGENT_ID: &str = "agentId";
pub const RESULT: &str = "result";
pub const CREATION_TIME: &str = "creationTime";
pub const START_TIME: &str = "startTime";
pub const FINISH_TIME: &str = "finishTime";
pub const RETRY_COUNT: &str = "retryCount";

/// Encode a task as field/value pairs. Unset optional fields are omitted.
pub fn encode(task: &Task) -> Vec<(String, String)> {
    let mut fields = vec![
        (TASK_ID.to_string(), task.task_id.to_string()),
        (NAME.to_string(), task.name.clone()),
        (TYPE.to_string(), task.task_type.as_str().to_string()),
        (PAYLOAD.to_string(), task.payload.clone()),
        (STATUS.to_string(), task.status.as_str().to_string()),
        (
            CREATION_TIME.to_string(),
            task.creation_time.timestamp_millis().to_string(),
        ),
        (RETRY_COUNT.to_string(), task.retry_count.to_string()),
    ];
    if let Some(agent_id) = &task.agent_id {
        fields.push((AGENT_ID.to_string(), agent_id.clone()));
    }
    if let Some(result) = &task.result {
        fields.push((RESULT.to_string(), result.clone()));
    }
    if let Some(start_time) = task.start_time {
        fields.push((
            START_TIME.to_string(),
            start_time.timestamp_millis().to_string(),
        ));
    }
    if let Some(finish_time) = task.finish_time {
        fields.push((
            FINISH_TIME.to_string(),
            finish_time.timestamp_millis().to_string(),
        ));
    }
    fields
}

/// Decode a field map back into a task.
///
/// taskId, type, status and creationTime are required; everything else
/// decodes as unset (or zero for retryCount) when absent.
pub fn decode(fields: &HashMap<String, String>) -> Result<Task, DecodeError> {
    let raw_id = required(fields, TASK_ID)?;
    let task_id = raw_id
        .parse::<Uuid>()
        .map_err(|_| DecodeError::invalid(TASK_ID, raw_id))?;

    let raw_type = required(fields, TYPE)?;
    let task_type =
        TaskType::from_name(raw_type).ok_or_else(|| DecodeError::invalid(TYPE, raw_type))?;

    let raw_status = required(fields, STATUS)?;
    let status =
        TaskStatus::from_name(raw_status).ok_or_else(|| DecodeError::invalid(STATUS, raw_status))?;

    let creation_time = parse_millis(CREATION_TIME, required(fields, CREATION_TIME)?)?;

    Ok(Task {
        task_id,
        name: fields.get(NAME).cloned().unwrap_or_default(),
        task_type,
        payload: fields.get(PAYLOAD).cloned().unwrap_or_default(),
        status,
        agent_id: fields.get(AGENT_ID).cloned(),
        result: fields.get(RESULT).cloned(),
        creation_time,
        start_time: fields
            .get(START_TIME)
            .map(|value| parse_millis(START_TIME, value))
            .transpose()?,
        finish_time: fields
            .get(FINISH_TIME)
            .map(|value| parse_millis(FINISH_TIME, value))
            .transpose()?,
        retry_count: match fields.get(RETRY_COUNT) {
            Some(value) => value
                .parse()
                .map_err(|_| DecodeError::invalid(RETRY_COUNT, value))?,
            None => 0,
        },
    })
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, DecodeError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(DecodeError::MissingField(name))
}

fn parse_millis(name: &'static str, value: &str) -> Result<DateTime<Utc>, DecodeError> {
    let millis: i64 = value
        .parse()
        .map_err(|_| DecodeError::invalid(name, value))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| DecodeError::invalid(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    fn as_map(pairs: Vec<(String, String)>) -> HashMap<String, String> {
        pairs.into_iter().collect()
    }

    #[test]
    fn fresh_task_encodes_without_optional_fields() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let fields = as_map(encode(&task));

        assert_eq!(fields[TYPE], "SHELL");
        assert_eq!(fields[STATUS], "PENDING");
        assert_eq!(fields[RETRY_COUNT], "0");
        assert!(!fields.contains_key(AGENT_ID));
        assert!(!fields.contains_key(RESULT));
        assert!(!fields.contains_key(START_TIME));
        assert!(!fields.contains_key(FINISH_TIME));
    }

    #[test]
    fn full_task_roundtrips_through_the_field_map() {
        let mut task = Task::new("greet", TaskType::Shell, "echo hello");
        task.assign_agent("agent-001");
        task.begin();
        task.finish(TaskStatus::Success, "hello\n");

        let decoded = decode(&as_map(encode(&task))).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let mut fields = as_map(encode(&task));
        fields.remove(TASK_ID);

        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField(TASK_ID)));
    }

    #[test]
    fn unknown_status_name_is_an_error() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let mut fields = as_map(encode(&task));
        fields.insert(STATUS.to_string(), "NOT_A_STATUS".to_string());

        let err = decode(&fields).unwrap_err();
        assert!(err.to_string().contains("NOT_A_STATUS"));
    }

    #[test]
    fn missing_optional_fields_decode_as_unset() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let mut fields = as_map(encode(&task));
        fields.remove(RETRY_COUNT);

        let decoded = decode(&fields).unwrap();
        assert_eq!(decoded.agent_id, None);
        assert_eq!(decoded.start_time, None);
        assert_eq!(decoded.retry_count, 0);
    }

    #[test]
    fn timestamps_are_epoch_millis_strings() {
        let task = Task::new("greet", TaskType::Shell, "echo hello");
        let fields = as_map(encode(&task));
        let stored: i64 = fields[CREATION_TIME].parse().unwrap();
        assert_eq!(stored, task.creation_time.timestamp_millis());
    }
}
