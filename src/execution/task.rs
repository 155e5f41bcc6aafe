//! Task and task-result models.
//!
//! A [`Task`] captures the intent of one invocation; a [`TaskResult`] is the
//! read-only snapshot of one execution. The task is the single source of
//! truth for lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lifecycle states. Status only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, not yet started.
    Pending,
    /// Being executed.
    Running,
    /// Finished with output.
    Completed,
    /// Finished with an error.
    Failed,
}

impl TaskStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lower-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An illegal lifecycle move.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Status the task was in.
    pub from: TaskStatus,
    /// Status that was requested.
    pub to: TaskStatus,
}

/// One request to invoke a spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Initiating identity; policy sees `"unknown"` when absent.
    pub subject: Option<String>,
    /// Optional workspace label.
    pub workspace: Option<String>,
    /// Id (or name) of the spec to invoke.
    pub target_id: String,
    /// Payload handed to the runtime.
    pub input: Value,
    /// Free-form metadata, exposed to policy as `task_metadata`.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Caller-supplied decision-context entries, merged over the built-in
    /// keys before every policy check.
    #[serde(default)]
    pub context: Map<String, Value>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    error: Option<String>,
}

impl Task {
    /// Creates a pending task stamped with the current time.
    pub fn new(id: impl Into<String>, target_id: impl Into<String>, input: Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            subject: None,
            workspace: None,
            target_id: target_id.into(),
            input,
            metadata: Map::new(),
            context: Map::new(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a decision-context entry, e.g. `domain` or `classification`.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Overrides the creation time (and the last-update time with it).
    #[must_use]
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Error message, present only when failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the task was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the task last changed.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Subject used for policy checks.
    #[must_use]
    pub fn policy_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(UNKNOWN_SUBJECT)
    }

    /// `Pending -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] from any other state.
    pub fn mark_running(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Pending, TaskStatus::Running, at)
    }

    /// `Running -> Completed`, clearing any error.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the task is running.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Running, TaskStatus::Completed, at)?;
        self.error = None;
        Ok(())
    }

    /// `Running -> Failed`, recording the error.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the task is running.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Running, TaskStatus::Failed, at)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(
        &mut self,
        from: TaskStatus,
        to: TaskStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = at;
        Ok(())
    }
}

/// Subject reported to policy when a task has none.
pub const UNKNOWN_SUBJECT: &str = "unknown";

/// Why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target spec was not found or is disabled.
    NotFound,
    /// The policy engine denied the request.
    PolicyDenied,
    /// No runtime is registered under the spec's runtime name.
    RuntimeMissing,
    /// The runtime returned an error or panicked.
    RuntimeError,
    /// The task was not pending when `run` was called.
    InvalidState,
}

/// Diagnostics attached to a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Resolved spec id, or the requested id when unresolved.
    pub target_id: String,
    /// Runtime name; `None` when no spec was resolved.
    pub runtime: Option<String>,
    /// Deciding rule on a policy denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_rule_id: Option<String>,
    /// Decision reason on a policy denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_reason: Option<String>,
    /// Resource whose `resource.access` check denied a tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_resource: Option<String>,
}

/// Immutable outcome of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Originating task.
    pub task_id: String,
    /// `Completed` or `Failed`.
    pub status: TaskStatus,
    /// Runtime output; present iff completed.
    pub output: Option<Value>,
    /// Error message; present iff failed.
    pub error: Option<String>,
    /// Failure cause; present iff failed.
    pub failure: Option<FailureKind>,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When execution finished.
    pub finished_at: DateTime<Utc>,
    /// Resolution and policy diagnostics.
    pub metadata: ExecutionMetadata,
}

impl TaskResult {
    /// Returns `true` if the task completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
