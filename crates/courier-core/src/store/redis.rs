//! Redis-backed task store.
//!
//! One hash per task, keyed `task:<taskId>`. HSET merges fields, which is
//! exactly the save semantics the port asks for; `update_result` is a single
//! HSET of three fields so readers cannot observe it half-applied.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::warn;
use uuid::Uuid;

use super::{TaskStore, fields};
use crate::domain::{Task, TaskStatus};
use crate::error::StoreError;

pub const TASK_KEY_PREFIX: &str = "task:";

pub struct RedisTaskStore {
    conn: ConnectionManager,
}

impl RedisTaskStore {
    /// Connect, name the connection and verify the server answers. Fails
    /// fast so a dead store is caught at startup rather than on the first
    /// task.
    pub async fn connect(url: &str, client_name: &str) -> Result<Self, StoreError> {
        let conn = open_manager(url, client_name)
            .await
            .map_err(|err| StoreError::ConnectionFailed(err.to_string()))?;
        Ok(Self { conn })
    }

    fn record_key(task_id: Uuid) -> String {
        format!("{TASK_KEY_PREFIX}{task_id}")
    }
}

/// Connect dance: manager, CLIENT SETNAME, PING.
async fn open_manager(
    url: &str,
    client_name: &str,
) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_connection_manager().await?;
    let () = redis::cmd("CLIENT")
        .arg("SETNAME")
        .arg(client_name)
        .query_async(&mut conn)
        .await?;
    let () = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(conn)
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pairs = fields::encode(task);
        let () = conn
            .hset_multiple(Self::record_key(task.task_id), &pairs)
            .await
            .map_err(|err| StoreError::OperationFailed(format!("save failed: {err}")))?;
        Ok(())
    }

    async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut conn = self.conn.clone();
        let record: HashMap<String, String> = conn
            .hgetall(Self::record_key(task_id))
            .await
            .map_err(|err| StoreError::OperationFailed(format!("read failed: {err}")))?;
        if record.is_empty() {
            return Ok(None);
        }
        match fields::decode(&record) {
            Ok(task) => Ok(Some(task)),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "stored record does not decode, treating as absent");
                Ok(None)
            }
        }
    }

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = conn
            .hset(Self::record_key(task_id), fields::STATUS, status.as_str())
            .await
            .map_err(|err| StoreError::OperationFailed(format!("status update failed: {err}")))?;
        Ok(())
    }

    async fn update_result(
        &self,
        task_id: Uuid,
        result: &str,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let pairs = [
            (fields::RESULT, result.to_string()),
            (fields::STATUS, status.as_str().to_string()),
            (
                fields::FINISH_TIME,
                Utc::now().timestamp_millis().to_string(),
            ),
        ];
        let mut conn = self.conn.clone();
        let () = conn
            .hset_multiple(Self::record_key(task_id), &pairs)
            .await
            .map_err(|err| StoreError::OperationFailed(format!("result update failed: {err}")))?;
        Ok(())
    }
}

// Live tests against a local Redis; run with `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskType;

    async fn connect_local() -> RedisTaskStore {
        RedisTaskStore::connect("redis://127.0.0.1:6379", "courier-test-store")
            .await
            .expect("local redis reachable")
    }

    #[tokio::test]
    #[ignore]
    async fn live_save_then_find_roundtrip() {
        let store = connect_local().await;
        let mut task = Task::new("live roundtrip", TaskType::Shell, "echo hello");
        task.assign_agent("agent-live");

        store.save(&task).await.unwrap();
        let found = store.find_by_id(task.task_id).await.unwrap();
        assert_eq!(found, Some(task));
    }

    #[tokio::test]
    #[ignore]
    async fn live_update_result_is_consistent_with_find() {
        let store = connect_local().await;
        let task = Task::new("live result", TaskType::Shell, "echo hello");
        store.save(&task).await.unwrap();

        store
            .update_result(task.task_id, "hello\n", TaskStatus::Success)
            .await
            .unwrap();

        let found = store.find_by_id(task.task_id).await.unwrap().unwrap();
        assert_eq!(found.status, TaskStatus::Success);
        assert_eq!(found.result.as_deref(), Some("hello\n"));
        assert!(found.finish_time.is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn live_missing_record_is_none() {
        let store = connect_local().await;
        let found = store.find_by_id(Uuid::new_v4()).await.unwrap();
        assert_eq!(found, None);
    }
}
