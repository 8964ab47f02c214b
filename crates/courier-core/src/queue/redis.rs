//! Redis-backed task queue.
//!
//! One list per agent, keyed `agent:tasks:<agentId>`. Producers LPUSH, the
//! agent BRPOPs with a timeout; BRPOP parks its connection, so a queue never
//! shares one with the store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::TaskQueue;
use crate::error::QueueError;

pub const QUEUE_KEY_PREFIX: &str = "agent:tasks:";

pub struct RedisTaskQueue {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisTaskQueue {
    /// Connect, name the connection and verify the server answers. Fails
    /// fast so a dead queue is caught at startup rather than on the first
    /// poll.
    pub async fn connect(url: &str, client_name: &str) -> Result<Self, QueueError> {
        let conn = open_manager(url, client_name)
            .await
            .map_err(|err| QueueError::ConnectionFailed(err.to_string()))?;
        Ok(Self {
            conn,
            key_prefix: QUEUE_KEY_PREFIX.to_string(),
        })
    }

    /// Override the queue key prefix.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    fn queue_key(&self, agent_id: &str) -> String {
        format!("{}{}", self.key_prefix, agent_id)
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
impl TaskQueue for RedisTaskQueue {
    async fn push_raw(&self, agent_id: &str, descriptor: String) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let () = conn
            .lpush(self.queue_key(agent_id), descriptor)
            .await
            .map_err(|err| QueueError::OperationFailed(format!("LPUSH failed: {err}")))?;
        Ok(())
    }

    async fn pop(&self, agent_id: &str, timeout: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();
        let reply: Option<(String, String)> = conn
            .brpop(self.queue_key(agent_id), timeout.as_secs_f64())
            .await
            .map_err(|err| QueueError::OperationFailed(format!("BRPOP failed: {err}")))?;
        Ok(reply.map(|(_key, descriptor)| descriptor))
    }
}
