//! The per-agent processing loop.
//!
//! One loop per agent: pop a descriptor, materialize the task, run it through
//! the registered executor, persist the terminal state. Anything that goes
//! wrong with a single task is contained inside that iteration; the loop
//! itself only stops on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{ExecutionOutcome, Task, TaskStatus};
use crate::executor::ExecutorRegistry;
use crate::queue::TaskQueue;
use crate::store::TaskStore;

/// How long one blocking pop waits before ticking empty.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long in-flight work gets on shutdown before the loop is aborted.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Drives tasks from one agent's queue through execution into the store.
///
/// Strictly one task at a time: the loop's only suspension points are the
/// blocking pop and the execution itself, so no two iterations overlap.
pub struct TaskProcessor {
    agent_id: String,
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn TaskStore>,
    executors: Arc<ExecutorRegistry>,
    poll_timeout: Duration,
}

impl TaskProcessor {
    pub fn new(
        agent_id: impl Into<String>,
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn TaskStore>,
        executors: Arc<ExecutorRegistry>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            queue,
            store,
            executors,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Override how long one blocking pop waits.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Start the loop on the runtime. The returned handle owns shutdown.
    pub fn spawn(self) -> ProcessorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            self.run_loop(&mut shutdown_rx).await;
        });
        ProcessorHandle { shutdown_tx, join }
    }

    async fn run_loop(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        info!(agent_id = %self.agent_id, "task processor started");
        loop {
            // shutdown が来ていたら抜ける
            if *shutdown_rx.borrow() {
                break;
            }

            // pop は poll_timeout まで待つので shutdown と競合させる
            let popped = tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        // handle dropped: nobody can request shutdown anymore
                        break;
                    }
                    continue;
                }
                popped = self.queue.pop(&self.agent_id, self.poll_timeout) => popped,
            };

            match popped {
                Ok(Some(descriptor)) => self.process_one(&descriptor).await,
                Ok(None) => {
                    debug!(agent_id = %self.agent_id, "no task this tick");
                }
                Err(err) => {
                    // a dead connection must not spin the loop hot; pause one
                    // poll interval, still listening for shutdown
                    error!(agent_id = %self.agent_id, error = %err, "queue pop failed");
                    tokio::select! {
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(self.poll_timeout) => {}
                    }
                }
            }
        }
        info!(agent_id = %self.agent_id, "task processor stopped");
    }

    /// Drive one descriptor from raw JSON to a terminal store record.
    ///
    /// Store failures along the way are logged and skipped over: the task
    /// still runs, memory and store just disagree until the next successful
    /// write. Only a malformed descriptor ends the iteration early.
    async fn process_one(&self, descriptor: &str) {
        let mut task: Task = match serde_json::from_str(descriptor) {
            Ok(task) => task,
            Err(err) => {
                warn!(agent_id = %self.agent_id, error = %err, "discarding malformed descriptor");
                return;
            }
        };

        info!(task_id = %task.task_id, name = %task.name, task_type = %task.task_type, "picked up task");

        // a descriptor that cannot legally move to RUNNING is stale or
        // crafted; running it would regress its persisted status
        if !task.status.can_transition_to(TaskStatus::Running) {
            warn!(task_id = %task.task_id, status = %task.status, "discarding descriptor that cannot start");
            return;
        }

        // First durable record of this task at this agent, before anything
        // runs: the audit trail survives a crash mid-execution.
        task.assign_agent(&self.agent_id);
        if let Err(err) = self.store.save(&task).await {
            warn!(task_id = %task.task_id, error = %err, "failed to save task snapshot");
        }

        if let Err(err) = self
            .store
            .update_status(task.task_id, TaskStatus::Running)
            .await
        {
            warn!(task_id = %task.task_id, error = %err, "failed to persist running status");
        }
        task.begin();

        let outcome = self.dispatch(&task).await;
        task.finish(outcome.final_status(), outcome.text.as_str());

        // single terminal write: result, status and finish time together
        if let Err(err) = self
            .store
            .update_result(task.task_id, &outcome.text, task.status)
            .await
        {
            error!(task_id = %task.task_id, error = %err, "failed to persist task result");
        }

        info!(task_id = %task.task_id, status = %task.status, "task finished");
    }

    /// Route by task type; a type with no registered executor fails cleanly
    /// without running anything.
    async fn dispatch(&self, task: &Task) -> ExecutionOutcome {
        match self.executors.get(task.task_type) {
            Some(executor) => executor.execute(&task.payload).await,
            None => {
                ExecutionOutcome::failed(format!("Unsupported task type: {}", task.task_type))
            }
        }
    }
}

/// Handle for a running processor loop.
/// - `request_shutdown` は次の境界で止める（実行中のコマンドは中断しない）
/// - `shutdown_and_join` は grace を過ぎたら abort する
pub struct ProcessorHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ProcessorHandle {
    /// Ask the loop to stop at the next iteration boundary. A command that
    /// is already running finishes first.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Request shutdown and wait up to `grace` for in-flight work, then
    /// abort the loop.
    pub async fn shutdown_and_join(mut self, grace: Duration) {
        self.request_shutdown();
        match tokio::time::timeout(grace, &mut self.join).await {
            Ok(join_result) => {
                if let Err(err) = join_result {
                    error!(error = %err, "processor loop failed");
                }
            }
            Err(_) => {
                warn!("grace period expired, aborting processor loop");
                self.join.abort();
            }
        }
    }
}
