//! Task persistence: the store port and its implementations.

mod fields;
mod memory;
mod redis;

pub use memory::InMemoryTaskStore;
pub use redis::{RedisTaskStore, TASK_KEY_PREFIX};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Task, TaskStatus};
use crate::error::StoreError;

/// Store port (interface).
///
/// A record is a flat map of string fields under one key per task, so single
/// fields can be updated without rewriting the record and external tools can
/// inspect a record field by field.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Write the full field-set of a task, overwriting field by field.
    /// Fields that are unset on `task` are left as they are in the record.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Read a task back. A missing record is `None`, not an error; a record
    /// that no longer decodes is logged and also reported as `None`.
    async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Update only the status field.
    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<(), StoreError>;

    /// Terminal write: result, final status and finish time land together.
    /// A reader sees all three or none of them.
    async fn update_result(
        &self,
        task_id: Uuid,
        result: &str,
        status: TaskStatus,
    ) -> Result<(), StoreError>;
}
