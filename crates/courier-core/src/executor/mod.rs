//! Execution layer: the executor port and per-type dispatch.

mod shell;

pub use shell::{DEFAULT_EXEC_TIMEOUT, ShellExecutor};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ExecutionOutcome, TaskType};
use crate::error::RegistryError;

/// Executes one task payload.
///
/// Infallible by contract: every failure mode (bad command, nonzero exit,
/// timeout, spawn error) comes back as a failed outcome carrying explanatory
/// text, so the processing loop never has to tell errors apart from results.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, payload: &str) -> ExecutionOutcome;
}

/// Registry of executors (task type -> executor).
///
/// Built during initialization (mutable), used during runtime (immutable).
/// Registering the same type twice is an error rather than a silent
/// overwrite.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskType, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor for a task type.
    pub fn register(
        &mut self,
        task_type: TaskType,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<(), RegistryError> {
        if self.executors.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.executors.insert(task_type, executor);
        Ok(())
    }

    pub fn get(&self, task_type: TaskType) -> Option<&Arc<dyn TaskExecutor>> {
        self.executors.get(&task_type)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}
