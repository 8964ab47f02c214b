//! Domain model: the task entity, its status machine, and execution outcomes.

mod outcome;
mod status;
mod task;

pub use outcome::{ExecutionOutcome, OutcomeKind};
pub use status::TaskStatus;
pub use task::{Task, TaskType};
