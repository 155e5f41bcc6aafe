//! Identity records for invocable capabilities.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::name::canonical_id;

/// Opaque handle to the capability backing a spec.
///
/// Only the runtime named by the spec interprets it.
pub type Binding = Arc<dyn Any + Send + Sync>;

/// Canonical kinds of registry entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    /// A trained or hosted model.
    Model,
    /// An agent (planner, worker, ...).
    Agent,
    /// A tool: callable, HTTP endpoint, system capability.
    Tool,
    /// An external resource: file, bucket, database.
    Resource,
    /// A workspace or project context.
    Workspace,
}

impl SpecKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::Model, Self::Agent, Self::Tool, Self::Resource, Self::Workspace];

    /// Lower-case name used in ids and decision contexts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Agent => "agent",
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown spec kind '{s}'"))
    }
}

/// Declarative description of something the kernel can invoke.
///
/// A spec says *what* a capability is and *which runtime* executes it; it
/// never executes anything itself. The `kind` is fixed at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct Spec {
    id: String,
    name: String,
    kind: SpecKind,
    runtime: String,
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(skip)]
    binding: Option<Binding>,
    #[serde(default)]
    version: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl Spec {
    /// Creates an enabled spec with no binding, metadata or tags.
    pub fn new(
        kind: SpecKind,
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            runtime: runtime.into(),
            metadata: Map::new(),
            config: Map::new(),
            tags: BTreeSet::new(),
            enabled: true,
            binding: None,
            version: None,
        }
    }

    /// Creates a spec whose id is derived from its name (`"<kind>:<slug>"`).
    pub fn named(kind: SpecKind, name: impl Into<String>, runtime: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(kind, canonical_id(kind, &name), name, runtime)
    }

    /// Shorthand for a [`SpecKind::Model`] spec.
    pub fn model(
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self::new(SpecKind::Model, id, name, runtime)
    }

    /// Shorthand for a [`SpecKind::Agent`] spec.
    pub fn agent(
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self::new(SpecKind::Agent, id, name, runtime)
    }

    /// Shorthand for a [`SpecKind::Tool`] spec.
    pub fn tool(
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self::new(SpecKind::Tool, id, name, runtime)
    }

    /// Shorthand for a [`SpecKind::Resource`] spec.
    pub fn resource(
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self::new(SpecKind::Resource, id, name, runtime)
    }

    /// Shorthand for a [`SpecKind::Workspace`] spec.
    pub fn workspace(
        id: impl Into<String>,
        name: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        Self::new(SpecKind::Workspace, id, name, runtime)
    }

    /// Attaches the capability this spec stands for.
    #[must_use]
    pub fn with_binding<T: Any + Send + Sync>(mut self, binding: T) -> Self {
        self.binding = Some(Arc::new(binding));
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a runtime configuration entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Unique identifier within a registry.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of capability.
    #[must_use]
    pub fn kind(&self) -> SpecKind {
        self.kind
    }

    /// Runtime-table key that executes this spec.
    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Free-form metadata.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Runtime parameters.
    #[must_use]
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Tags attached to the spec.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether default lookups return this spec.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Handle to the underlying capability, if bound.
    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Returns the binding downcast to `T`, if it is one.
    #[must_use]
    pub fn binding_as<T: Any>(&self) -> Option<&T> {
        self.binding.as_deref().and_then(|b| b.downcast_ref::<T>())
    }

    /// Optional version string.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Attaches a tag in place.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Excludes this spec from default lookups.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Includes this spec in default lookups again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("runtime", &self.runtime)
            .field("metadata", &self.metadata)
            .field("config", &self.config)
            .field("tags", &self.tags)
            .field("enabled", &self.enabled)
            .field("bound", &self.binding.is_some())
            .field("version", &self.version)
            .finish()
    }
}

/// Two specs are equal when every field matches and both point at the
/// same binding (or neither has one).
impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        let same_binding = match (&self.binding, &other.binding) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_binding
            && self.id == other.id
            && self.name == other.name
            && self.kind == other.kind
            && self.runtime == other.runtime
            && self.metadata == other.metadata
            && self.config == other.config
            && self.tags == other.tags
            && self.enabled == other.enabled
            && self.version == other.version
    }
}
