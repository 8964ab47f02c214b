//! In-memory task store for tests and the demo runner.
//!
//! Records are kept as the same flat field maps the Redis store writes, so
//! merge-on-save and partial updates behave identically here and there.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::{TaskStore, fields};
use crate::domain::{Task, TaskStatus};
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryTaskStore {
    records: Mutex<HashMap<Uuid, HashMap<String, String>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records.entry(task.task_id).or_default();
        for (field, value) in fields::encode(task) {
            record.insert(field, value);
        }
        Ok(())
    }

    async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let records = self.records.lock().await;
        let Some(record) = records.get(&task_id) else {
            return Ok(None);
        };
        match fields::decode(record) {
            Ok(task) => Ok(Some(task)),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "stored record does not decode, treating as absent");
                Ok(None)
            }
        }
    }

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records
            .entry(task_id)
            .or_default()
            .insert(fields::STATUS.to_string(), status.as_str().to_string());
        Ok(())
    }

    async fn update_result(
        &self,
        task_id: Uuid,
        result: &str,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        // one lock hold, so a reader sees all three fields or none of them
        let mut records = self.records.lock().await;
        let record = records.entry(task_id).or_default();
        record.insert(fields::RESULT.to_string(), result.to_string());
        record.insert(fields::STATUS.to_string(), status.as_str().to_string());
        record.insert(
            fields::FINISH_TIME.to_string(),
            Utc::now().timestamp_millis().to_string(),
        );
        Ok(())
    }
}
