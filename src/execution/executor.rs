//! Synchronous, policy-gated task executor.
//!
//! The executor resolves a task's target from the registry, asks the policy
//! engine (when one is configured) whether the subject may perform the
//! action implied by the spec kind, and dispatches to the runtime named by
//! `spec.runtime()`. Tool calls whose input names a `resource_id` are also
//! checked for `resource.access` on that resource. Every outcome, including
//! not-found, denial and runtime failure, comes back as a [`TaskResult`];
//! `run` never returns an error or panics.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::events;
use super::runtime_table::RuntimeTable;
use super::task::{
    ExecutionMetadata, FailureKind, Task, TaskResult, TaskStatus, UNKNOWN_SUBJECT,
};
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::policy::{DecisionContext, PolicyDecision, PolicyEngine};
use crate::ports::{Clock, EventLog, IdGenerator, LogEvent};
use crate::registry::{IdentityRegistry, Spec, SpecKind};

/// Canonical policy action strings emitted by the executor.
pub mod actions {
    /// Invoking a model.
    pub const MODEL_INVOKE: &str = "model.invoke";
    /// Invoking an agent.
    pub const AGENT_INVOKE: &str = "agent.invoke";
    /// Invoking a tool.
    pub const TOOL_INVOKE: &str = "tool.invoke";
    /// Accessing a resource.
    pub const RESOURCE_ACCESS: &str = "resource.access";
    /// Accessing a workspace.
    pub const WORKSPACE_ACCESS: &str = "workspace.access";
}

/// Input key a tool call uses to name the resource it touches.
pub const RESOURCE_ID_KEY: &str = "resource_id";

/// Policy action implied by a spec kind.
#[must_use]
pub fn action_for(kind: SpecKind) -> &'static str {
    match kind {
        SpecKind::Model => actions::MODEL_INVOKE,
        SpecKind::Agent => actions::AGENT_INVOKE,
        SpecKind::Tool => actions::TOOL_INVOKE,
        SpecKind::Resource => actions::RESOURCE_ACCESS,
        SpecKind::Workspace => actions::WORKSPACE_ACCESS,
    }
}

static LIVE_CLOCK: LiveClock = LiveClock;
static LIVE_IDS: LiveIdGenerator = LiveIdGenerator;

/// Runs tasks against borrowed registry, runtime table and policy engine.
///
/// Without a policy engine every request is implicitly allowed.
pub struct TaskExecutor<'a> {
    registry: &'a IdentityRegistry,
    runtimes: &'a RuntimeTable,
    policy: Option<&'a PolicyEngine>,
    clock: &'a dyn Clock,
    ids: &'a dyn IdGenerator,
    events: Option<&'a dyn EventLog>,
}

impl<'a> TaskExecutor<'a> {
    /// Creates an executor with no policy engine and no event log, using
    /// the system clock and random ids.
    #[must_use]
    pub fn new(registry: &'a IdentityRegistry, runtimes: &'a RuntimeTable) -> Self {
        Self {
            registry,
            runtimes,
            policy: None,
            clock: &LIVE_CLOCK,
            ids: &LIVE_IDS,
            events: None,
        }
    }

    /// Gates every run on `policy`.
    #[must_use]
    pub fn with_policy(mut self, policy: &'a PolicyEngine) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Uses `policy` when present, otherwise runs unchecked.
    #[must_use]
    pub fn with_optional_policy(mut self, policy: Option<&'a PolicyEngine>) -> Self {
        self.policy = policy;
        self
    }

    /// Reads timestamps from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Draws event ids from `ids`.
    #[must_use]
    pub fn with_id_generator(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Appends lifecycle events to `events`.
    #[must_use]
    pub fn with_event_log(mut self, events: &'a dyn EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Asks the policy engine for a decision.
    ///
    /// Returns `None` when no engine is configured, meaning the request is
    /// allowed. A missing subject is evaluated as `"unknown"`.
    #[must_use]
    pub fn authorise(
        &self,
        subject: Option<&str>,
        action: &str,
        resource: &str,
        context: &DecisionContext,
    ) -> Option<PolicyDecision> {
        let engine = self.policy?;
        let subject = subject.unwrap_or(UNKNOWN_SUBJECT);
        Some(engine.evaluate(subject, action, resource, context))
    }

    /// Executes `task` and returns a snapshot of the outcome.
    ///
    /// The task must be pending. On return its status matches
    /// `result.status`. A task in any other state is left untouched and a
    /// failed result with [`FailureKind::InvalidState`] is returned.
    pub fn run(&self, task: &mut Task) -> TaskResult {
        let started_at = self.clock.now();

        if task.status() != TaskStatus::Pending {
            return self.reject_non_pending(task, started_at);
        }
        let target = json!({ "target_id": task.target_id });
        self.emit(task, None, events::TASK_CREATED, target.clone());
        if let Err(e) = task.mark_running(started_at) {
            warn!(task = %task.id, error = %e, "task could not start");
            return self.reject_non_pending(task, started_at);
        }
        self.emit(task, None, events::TASK_STARTED, target);

        let Some(spec) = self.registry.get(&task.target_id) else {
            let error = format!("Spec not found for target_id='{}'", task.target_id);
            let metadata = ExecutionMetadata {
                target_id: task.target_id.clone(),
                ..Default::default()
            };
            return self.fail(
                task,
                None,
                FailureKind::NotFound,
                error,
                started_at,
                metadata,
            );
        };
        debug!(task = %task.id, spec = %spec.id(), runtime = %spec.runtime(), "target resolved");

        let metadata = ExecutionMetadata {
            target_id: spec.id().to_string(),
            runtime: Some(spec.runtime().to_string()),
            ..Default::default()
        };

        let action = action_for(spec.kind());
        let context = decision_context(task, &spec);
        let decision = self.authorise(task.subject.as_deref(), action, spec.id(), &context);
        if let Some(decision) = decision.filter(|d| !d.allowed) {
            let error = format!("Policy denied: {}", decision.reason);
            return self.deny(
                task,
                &spec,
                action,
                None,
                decision,
                error,
                started_at,
                metadata,
            );
        }

        if let Some(resource) = referenced_resource(&spec, &task.input) {
            let context = resource_context(task);
            let decision = self.authorise(
                task.subject.as_deref(),
                actions::RESOURCE_ACCESS,
                &resource,
                &context,
            );
            if let Some(decision) = decision.filter(|d| !d.allowed) {
                let error = format!(
                    "Policy denied for resource '{resource}': {}",
                    decision.reason
                );
                return self.deny(
                    task,
                    &spec,
                    actions::RESOURCE_ACCESS,
                    Some(resource),
                    decision,
                    error,
                    started_at,
                    metadata,
                );
            }
        }

        let Some(runtime) = self.runtimes.get(spec.runtime()) else {
            let error = format!("No runtime registered under name '{}'", spec.runtime());
            return self.fail(
                task,
                Some(spec.id()),
                FailureKind::RuntimeMissing,
                error,
                started_at,
                metadata,
            );
        };

        debug!(task = %task.id, spec = %spec.id(), runtime = %spec.runtime(), "dispatching");
        let outcome = catch_unwind(AssertUnwindSafe(|| runtime.invoke(&spec, &task.input)));
        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return self.fail(
                    task,
                    Some(spec.id()),
                    FailureKind::RuntimeError,
                    e.to_string(),
                    started_at,
                    metadata,
                );
            }
            Err(panic) => {
                return self.fail(
                    task,
                    Some(spec.id()),
                    FailureKind::RuntimeError,
                    panic_message(panic.as_ref()),
                    started_at,
                    metadata,
                );
            }
        };

        let finished_at = self.clock.now();
        if let Err(e) = task.mark_completed(finished_at) {
            warn!(task = %task.id, error = %e, "task could not complete");
        }
        info!(task = %task.id, spec = %spec.id(), runtime = %spec.runtime(), "task completed");
        self.emit(
            task,
            Some(spec.id()),
            events::TASK_COMPLETED,
            json!({ "runtime": spec.runtime() }),
        );

        TaskResult {
            task_id: task.id.clone(),
            status: task.status(),
            output: Some(output),
            error: None,
            failure: None,
            started_at,
            finished_at,
            metadata,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn deny(
        &self,
        task: &mut Task,
        spec: &Spec,
        action: &str,
        resource: Option<String>,
        decision: PolicyDecision,
        error: String,
        started_at: DateTime<Utc>,
        metadata: ExecutionMetadata,
    ) -> TaskResult {
        self.emit(
            task,
            Some(spec.id()),
            events::POLICY_DENIED,
            json!({
                "action": action,
                "resource": resource.as_deref().unwrap_or(spec.id()),
                "rule_id": decision.rule_id,
                "reason": decision.reason,
            }),
        );
        let metadata = ExecutionMetadata {
            policy_rule_id: decision.rule_id,
            policy_reason: Some(decision.reason),
            denied_resource: resource,
            ..metadata
        };
        self.fail(
            task,
            Some(spec.id()),
            FailureKind::PolicyDenied,
            error,
            started_at,
            metadata,
        )
    }

    fn fail(
        &self,
        task: &mut Task,
        spec_id: Option<&str>,
        failure: FailureKind,
        error: String,
        started_at: DateTime<Utc>,
        metadata: ExecutionMetadata,
    ) -> TaskResult {
        let finished_at = self.clock.now();
        if let Err(e) = task.mark_failed(error.clone(), finished_at) {
            warn!(task = %task.id, error = %e, "task could not be marked failed");
        }
        warn!(task = %task.id, ?failure, error = %error, "task failed");
        self.emit(
            task,
            spec_id,
            events::TASK_FAILED,
            json!({ "failure": failure, "error": error }),
        );

        TaskResult {
            task_id: task.id.clone(),
            status: task.status(),
            output: None,
            error: Some(error),
            failure: Some(failure),
            started_at,
            finished_at,
            metadata,
        }
    }

    fn reject_non_pending(&self, task: &Task, started_at: DateTime<Utc>) -> TaskResult {
        let error = format!(
            "Task '{}' cannot run from status '{}'",
            task.id,
            task.status()
        );
        warn!(task = %task.id, status = %task.status(), "refusing to run non-pending task");
        TaskResult {
            task_id: task.id.clone(),
            status: TaskStatus::Failed,
            output: None,
            error: Some(error),
            failure: Some(FailureKind::InvalidState),
            started_at,
            finished_at: self.clock.now(),
            metadata: ExecutionMetadata {
                target_id: task.target_id.clone(),
                ..Default::default()
            },
        }
    }

    fn emit(&self, task: &Task, spec_id: Option<&str>, event_type: &str, payload: Value) {
        let Some(log) = self.events else {
            return;
        };
        let event = LogEvent {
            id: self.ids.generate_id(),
            timestamp: self.clock.now(),
            event_type: event_type.to_string(),
            payload,
            subject: task.subject.clone(),
            workspace: task.workspace.clone(),
            spec_id: spec_id.map(str::to_string),
            task_id: Some(task.id.clone()),
        };
        if let Err(e) = log.append(event) {
            warn!(task = %task.id, event = %event_type, error = %e, "failed to append event");
        }
    }
}

/// Built-in keys first; the task's own context entries override them.
fn decision_context(task: &Task, spec: &Spec) -> DecisionContext {
    let mut context = DecisionContext::new()
        .with("workspace", task.workspace.clone())
        .with("runtime", spec.runtime())
        .with("spec_kind", spec.kind().as_str())
        .with("task_metadata", Value::Object(task.metadata.clone()))
        .with("tags", spec.tags().iter().cloned().collect::<Vec<_>>())
        .with("spec_metadata", Value::Object(spec.metadata().clone()));
    merge_task_context(&mut context, task);
    context
}

fn resource_context(task: &Task) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert("workspace", task.workspace.clone());
    merge_task_context(&mut context, task);
    context
}

fn merge_task_context(context: &mut DecisionContext, task: &Task) {
    for (key, value) in &task.context {
        context.insert(key.clone(), value.clone());
    }
}

/// The non-empty `resource_id` a tool call's input names, if any.
fn referenced_resource(spec: &Spec, input: &Value) -> Option<String> {
    if spec.kind() != SpecKind::Tool {
        return None;
    }
    input
        .get(RESOURCE_ID_KEY)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "runtime panicked".to_string()
    }
}
