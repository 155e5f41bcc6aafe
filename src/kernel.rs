//! Kernel bundling the registry, policy engine, runtimes and ports.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::event_log::JsonLinesEventLog;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::memory::event_log::InMemoryEventLog;
use crate::adapters::runtimes;
use crate::config::{ConfigError, KernelConfig, JSONL_BACKEND, MEMORY_BACKEND};
use crate::execution::{RuntimeTable, Task, TaskExecutor, TaskResult};
use crate::policy::{load_policy_files, PolicyEngine};
use crate::ports::{Clock, EventLog, FileSystem, IdGenerator, Runtime};
use crate::registry::{IdentityRegistry, SpecQuery};

/// Owns every subsystem a task needs and hands out executors over them.
///
/// Constructors wire up different adapters: [`Kernel::new`] keeps events in
/// memory, [`Kernel::from_config`] follows a [`KernelConfig`].
pub struct Kernel {
    /// Spec storage.
    pub registry: IdentityRegistry,
    /// Policy gate; `None` allows every request.
    pub policy: Option<PolicyEngine>,
    /// Runtime name → implementation.
    pub runtimes: RuntimeTable,
    /// Lifecycle event sink.
    pub events: Box<dyn EventLog>,
    /// Clock for task and event timestamps.
    pub clock: Box<dyn Clock>,
    /// Id source for tasks and events.
    pub id_gen: Box<dyn IdGenerator>,
    event_backend: String,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Creates a kernel with an empty registry, no policy engine, every
    /// built-in runtime and an in-memory event log.
    #[must_use]
    pub fn new() -> Self {
        let runtimes = RuntimeTable::new();
        for (name, runtime) in runtimes::builtin() {
            if let Err(e) = runtimes.register_shared(name, runtime) {
                warn!(error = %e, "skipping built-in runtime");
            }
        }
        Self {
            registry: IdentityRegistry::new(),
            policy: None,
            runtimes,
            events: Box::new(InMemoryEventLog::new()),
            clock: Box::new(LiveClock),
            id_gen: Box::new(LiveIdGenerator),
            event_backend: MEMORY_BACKEND.to_string(),
        }
    }

    /// Boots a kernel from configuration, reading policy files through `fs`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown runtimes or log backends, a jsonl
    /// backend without a path, unreadable policy files, or duplicate spec
    /// ids in the manifest.
    pub fn from_config(config: &KernelConfig, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let (events, event_backend) = open_event_log(config)?;
        let runtimes = enabled_runtimes(config.execution.enable_runtimes.as_deref())?;
        let policy = load_policy_files(fs, &config.policy_files)?.map(PolicyEngine::new);

        let registry = IdentityRegistry::new();
        for spec in &config.specs {
            registry.register(spec.clone())?;
        }

        info!(
            specs = registry.len(),
            policy_files = config.policy_files.len(),
            events = %event_backend,
            "kernel booted from config"
        );

        Ok(Self {
            registry,
            policy,
            runtimes,
            events,
            clock: Box::new(LiveClock),
            id_gen: Box::new(LiveIdGenerator),
            event_backend,
        })
    }

    /// Replaces the policy engine.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyEngine) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replaces the event log.
    #[must_use]
    pub fn with_event_log(mut self, events: impl EventLog + 'static, backend: &str) -> Self {
        self.events = Box::new(events);
        self.event_backend = backend.to_string();
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the id generator.
    #[must_use]
    pub fn with_id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Box::new(id_gen);
        self
    }

    /// An executor over this kernel's subsystems.
    #[must_use]
    pub fn executor(&self) -> TaskExecutor<'_> {
        TaskExecutor::new(&self.registry, &self.runtimes)
            .with_optional_policy(self.policy.as_ref())
            .with_clock(self.clock.as_ref())
            .with_id_generator(self.id_gen.as_ref())
            .with_event_log(self.events.as_ref())
    }

    /// Creates a pending task with a fresh id.
    #[must_use]
    pub fn new_task(&self, subject: Option<&str>, target_id: &str, input: Value) -> Task {
        let mut task = Task::new(self.id_gen.generate_id(), target_id, input)
            .with_created_at(self.clock.now());
        task.subject = subject.map(str::to_string);
        debug!(task = %task.id, target = %target_id, "task created");
        task
    }

    /// Creates and runs a task in one step.
    pub fn submit(
        &self,
        subject: Option<&str>,
        target_id: &str,
        input: Value,
    ) -> (Task, TaskResult) {
        let mut task = self.new_task(subject, target_id, input);
        let result = self.executor().run(&mut task);
        (task, result)
    }

    /// Snapshot of what the kernel is wired to.
    #[must_use]
    pub fn describe_subsystems(&self) -> SubsystemSummary {
        let specs = self.registry.list(&SpecQuery::new().include_disabled());
        let mut kinds = BTreeMap::new();
        for spec in &specs {
            *kinds.entry(spec.kind().to_string()).or_insert(0) += 1;
        }
        SubsystemSummary {
            registry: RegistrySummary {
                specs: specs.len(),
                enabled: specs.iter().filter(|s| s.enabled()).count(),
                kinds,
            },
            policy: self.policy.as_ref().map(|engine| PolicySummary {
                name: engine.policy_set().name.clone(),
                version: engine.policy_set().version.clone(),
                rules: engine.policy_set().rules.len(),
            }),
            runtimes: self.runtimes.names(),
            events: self.event_backend.clone(),
        }
    }
}

/// Output of [`Kernel::describe_subsystems`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemSummary {
    /// Registry contents.
    pub registry: RegistrySummary,
    /// Loaded policy set; `None` when unchecked.
    pub policy: Option<PolicySummary>,
    /// Registered runtime names, sorted.
    pub runtimes: Vec<String>,
    /// Event backend description.
    pub events: String,
}

/// Registry counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    /// All specs, disabled included.
    pub specs: usize,
    /// Enabled specs.
    pub enabled: usize,
    /// Spec count per kind.
    pub kinds: BTreeMap<String, usize>,
}

/// Policy set overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySummary {
    /// Set name.
    pub name: String,
    /// Set version.
    pub version: Option<String>,
    /// Rule count.
    pub rules: usize,
}

fn open_event_log(config: &KernelConfig) -> Result<(Box<dyn EventLog>, String), ConfigError> {
    let observability = &config.observability;
    match observability.log_backend.as_str() {
        MEMORY_BACKEND => {
            let log: Box<dyn EventLog> = Box::new(InMemoryEventLog::new());
            Ok((log, MEMORY_BACKEND.to_string()))
        }
        JSONL_BACKEND => {
            let path = observability
                .log_path
                .as_ref()
                .ok_or(ConfigError::MissingLogPath)?;
            let log = JsonLinesEventLog::new(path.clone()).map_err(|e| ConfigError::EventLog {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let label = format!("{JSONL_BACKEND}:{}", path.display());
            Ok((Box::new(log), label))
        }
        other => Err(ConfigError::UnknownLogBackend(other.to_string())),
    }
}

fn enabled_runtimes(enabled: Option<&[String]>) -> Result<RuntimeTable, ConfigError> {
    let builtin: BTreeMap<&str, Arc<dyn Runtime>> = runtimes::builtin().into_iter().collect();
    let table = RuntimeTable::new();
    let selected: Vec<&str> = match enabled {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => builtin.keys().copied().collect(),
    };
    for name in selected {
        let runtime = builtin
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRuntime(name.to_string()))?;
        if table.register_shared(name, Arc::clone(runtime)).is_err() {
            debug!(runtime = %name, "runtime listed twice in config");
        }
    }
    Ok(table)
}
