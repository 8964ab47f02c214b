//! Task delivery: the queue port and its implementations.

mod memory;
mod redis;

pub use memory::InMemoryTaskQueue;
pub use redis::{QUEUE_KEY_PREFIX, RedisTaskQueue};

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Task;
use crate::error::QueueError;

/// Queue port (interface).
///
/// One FIFO list per agent id: producers push serialized tasks at the head,
/// the owning agent pops from the tail. Pop-and-remove is one atomic step, so
/// a descriptor reaches at most one consumer; there is no redelivery after
/// that.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task for an agent.
    async fn push(&self, agent_id: &str, task: &Task) -> Result<(), QueueError> {
        let descriptor = serde_json::to_string(task)
            .map_err(|err| QueueError::OperationFailed(format!("encode failed: {err}")))?;
        self.push_raw(agent_id, descriptor).await
    }

    /// Enqueue an already-serialized descriptor.
    async fn push_raw(&self, agent_id: &str, descriptor: String) -> Result<(), QueueError>;

    /// Dequeue one descriptor for an agent, waiting up to `timeout`.
    /// `None` is a quiet tick (nothing arrived), not an error.
    async fn pop(&self, agent_id: &str, timeout: Duration) -> Result<Option<String>, QueueError>;
}
