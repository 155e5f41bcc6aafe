//! Task execution: task models, the runtime table and the executor.
//!
//! Execution holds no identities of its own and never stores tasks. It
//! borrows the registry, runtime table and policy engine for the length of
//! each `run` call.

mod executor;
mod runtime_table;
mod task;

pub use executor::{action_for, actions, TaskExecutor};
pub use runtime_table::{RuntimeTable, RuntimeTableError};
pub use task::{
    ExecutionMetadata, FailureKind, Task, TaskResult, TaskStatus, TransitionError,
    UNKNOWN_SUBJECT,
};

/// Event types appended to the event log during a run.
pub mod events {
    /// The executor accepted a pending task.
    pub const TASK_CREATED: &str = "task.created";
    /// The task moved to running.
    pub const TASK_STARTED: &str = "task.started";
    /// The policy engine refused the request.
    pub const POLICY_DENIED: &str = "policy.denied";
    /// The runtime returned output.
    pub const TASK_COMPLETED: &str = "task.completed";
    /// The task ended in failure.
    pub const TASK_FAILED: &str = "task.failed";
}
