//! In-memory task queue for tests and the demo runner.
//!
//! Same shape as the Redis lists: push at the head, pop from the tail, one
//! list per agent id, blocking pop with a deadline.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, sleep_until};

use super::TaskQueue;
use crate::error::QueueError;

#[derive(Default)]
pub struct InMemoryTaskQueue {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    pushed: Notify,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn push_raw(&self, agent_id: &str, descriptor: String) -> Result<(), QueueError> {
        {
            let mut queues = self.queues.lock().await;
            queues
                .entry(agent_id.to_string())
                .or_default()
                .push_front(descriptor);
        }
        // wake every waiter; each one rechecks its own agent's list
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn pop(&self, agent_id: &str, timeout: Duration) -> Result<Option<String>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // arm the notification before checking, so a push that lands
            // between the check and the wait is not lost
            let pushed = self.pushed.notified();
            {
                let mut queues = self.queues.lock().await;
                if let Some(queue) = queues.get_mut(agent_id)
                    && let Some(descriptor) = queue.pop_back()
                {
                    return Ok(Some(descriptor));
                }
            }
            tokio::select! {
                _ = pushed => {}
                _ = sleep_until(deadline) => return Ok(None),
            }
        }
    }
}
