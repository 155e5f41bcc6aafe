//! Identity registry: storage and lookup of [`Spec`] entities.
//!
//! The registry manages identity only. It never executes a spec; execution
//! is delegated to the runtime named by `spec.runtime()`.

mod name;
mod spec;

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;

pub use name::{canonical_id, looks_like_id, normalize_name, slugify, ID_SEPARATOR};
pub use spec::{Binding, Spec, SpecKind};

/// Errors raised while mutating the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A spec with the same id is already registered.
    #[error("spec with id '{0}' is already registered")]
    DuplicateIdentity(String),
}

/// Filter for [`IdentityRegistry::list`].
#[derive(Debug, Clone, Default)]
pub struct SpecQuery {
    kind: Option<SpecKind>,
    tags: BTreeSet<String>,
    include_disabled: bool,
}

impl SpecQuery {
    /// A query matching every enabled spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to one kind.
    #[must_use]
    pub fn kind(mut self, kind: SpecKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Requires results to carry this tag (tags accumulate as a subset).
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Includes disabled specs.
    #[must_use]
    pub fn include_disabled(mut self) -> Self {
        self.include_disabled = true;
        self
    }

    fn matches(&self, spec: &Spec) -> bool {
        (self.include_disabled || spec.enabled())
            && self.kind.map_or(true, |kind| spec.kind() == kind)
            && self.tags.is_subset(spec.tags())
    }
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Spec>,
    order: Vec<String>,
}

impl Entries {
    fn resolve(&self, id_or_name: &str, include_disabled: bool) -> Option<&Spec> {
        if let Some(spec) = self.by_id.get(id_or_name) {
            return (include_disabled || spec.enabled()).then_some(spec);
        }
        if looks_like_id(id_or_name) {
            return None;
        }

        let wanted = normalize_name(id_or_name);
        let mut candidates = self
            .order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|spec| include_disabled || spec.enabled())
            .filter(|spec| normalize_name(spec.name()) == wanted);
        let first = candidates.next()?;
        if candidates.next().is_some() {
            debug!(name = %id_or_name, "ambiguous spec name, refusing to resolve");
            return None;
        }
        Some(first)
    }

    fn resolve_id(&self, id_or_name: &str) -> Option<String> {
        self.resolve(id_or_name, true)
            .map(|spec| spec.id().to_string())
    }
}

/// In-memory, thread-safe store of specs keyed by id.
///
/// Reads take a shared lock; `register`, `disable`, `enable` and `add_tag`
/// take the exclusive lock. Lookups hand out clones, which share the
/// underlying binding.
#[derive(Default)]
pub struct IdentityRegistry {
    entries: RwLock<Entries>,
}

impl IdentityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec under its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIdentity`] if the id is taken. The
    /// existing entry is left untouched.
    pub fn register(&self, spec: Spec) -> Result<(), RegistryError> {
        let mut entries = self.write();
        if entries.by_id.contains_key(spec.id()) {
            return Err(RegistryError::DuplicateIdentity(spec.id().to_string()));
        }
        debug!(id = %spec.id(), kind = %spec.kind(), runtime = %spec.runtime(), "spec registered");
        entries.order.push(spec.id().to_string());
        entries.by_id.insert(spec.id().to_string(), spec);
        Ok(())
    }

    /// Looks up an enabled spec by id, falling back to a unique normalized
    /// name match when the query is not id-shaped.
    #[must_use]
    pub fn get(&self, id_or_name: &str) -> Option<Spec> {
        self.lookup(id_or_name, false)
    }

    /// Like [`get`](Self::get), optionally returning disabled specs.
    #[must_use]
    pub fn lookup(&self, id_or_name: &str, include_disabled: bool) -> Option<Spec> {
        self.read().resolve(id_or_name, include_disabled).cloned()
    }

    /// Disables a spec. Returns `false` if nothing matched.
    pub fn disable(&self, id_or_name: &str) -> bool {
        self.update(id_or_name, Spec::disable)
    }

    /// Re-enables a spec. Returns `false` if nothing matched.
    pub fn enable(&self, id_or_name: &str) -> bool {
        self.update(id_or_name, Spec::enable)
    }

    /// Adds a tag to a spec. Returns `false` if nothing matched.
    pub fn add_tag(&self, id_or_name: &str, tag: &str) -> bool {
        self.update(id_or_name, |spec| spec.add_tag(tag))
    }

    /// Lists specs matching the query, in registration order.
    #[must_use]
    pub fn list(&self, query: &SpecQuery) -> Vec<Spec> {
        let entries = self.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .filter(|spec| query.matches(spec))
            .cloned()
            .collect()
    }

    /// All registered ids, in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.read().order.clone()
    }

    /// Number of registered specs, disabled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, id_or_name: &str, apply: impl FnOnce(&mut Spec)) -> bool {
        let mut entries = self.write();
        let Some(id) = entries.resolve_id(id_or_name) else {
            return false;
        };
        match entries.by_id.get_mut(&id) {
            Some(spec) => {
                apply(spec);
                true
            }
            None => false,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    fn registry_with(specs: Vec<Spec>) -> IdentityRegistry {
        let registry = IdentityRegistry::new();
        for spec in specs {
            registry.register(spec).unwrap();
        }
        registry
    }

    #[test]
    fn get_by_id_returns_registered_spec() {
        let spec = Spec::tool("tool:multiply", "Multiply", "callable").with_tag("math");
        let registry = registry_with(vec![spec.clone()]);

        assert_eq!(registry.get("tool:multiply"), Some(spec));
    }

    #[test]
    fn duplicate_id_is_rejected_and_first_kept() {
        let registry = registry_with(vec![Spec::tool("tool:x", "First", "callable")]);

        let second = Spec::tool("tool:x", "Second", "http");
        let err = registry.register(second).unwrap_err();

        assert_eq!(err, RegistryError::DuplicateIdentity("tool:x".into()));
        assert_eq!(registry.get("tool:x").unwrap().name(), "First");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn disabled_spec_hidden_by_default_but_retrievable() {
        let registry = registry_with(vec![Spec::model("model:iris", "Iris", "sklearn")]);

        assert!(registry.disable("model:iris"));

        assert!(registry.get("model:iris").is_none());
        let found = registry.lookup("model:iris", true).unwrap();
        assert!(!found.enabled());
    }

    #[test]
    fn disable_unknown_returns_false() {
        let registry = IdentityRegistry::new();
        assert!(!registry.disable("tool:missing"));
    }

    #[test]
    fn enable_restores_default_visibility() {
        let registry = registry_with(vec![Spec::model("model:iris", "Iris", "sklearn")]);
        registry.disable("model:iris");
        assert!(registry.enable("model:iris"));
        assert!(registry.get("model:iris").is_some());
    }

    #[test]
    fn name_lookup_is_normalized() {
        let spec = Spec::model("model:iris_rf", "Iris  Random Forest", "sklearn");
        let registry = registry_with(vec![spec]);

        let spec = registry.get("  iris random   FOREST ").unwrap();
        assert_eq!(spec.id(), "model:iris_rf");
    }

    #[test]
    fn id_shaped_query_skips_name_fallback() {
        let registry = registry_with(vec![Spec::tool("tool:a", "tool:b", "callable")]);

        assert!(registry.get("tool:b").is_none());
    }

    #[test]
    fn ambiguous_name_is_not_resolved() {
        let registry = registry_with(vec![
            Spec::tool("tool:one", "Summarise", "callable"),
            Spec::agent("agent:two", "summarise", "callable"),
        ]);

        assert!(registry.get("Summarise").is_none());
        assert!(!registry.disable("Summarise"));
    }

    #[test]
    fn disabled_duplicate_name_does_not_make_default_lookup_ambiguous() {
        let registry = registry_with(vec![
            Spec::tool("tool:old", "Summarise", "callable"),
            Spec::tool("tool:new", "Summarise", "callable"),
        ]);
        registry.disable("tool:old");

        assert_eq!(registry.get("summarise").unwrap().id(), "tool:new");
    }

    #[test]
    fn disable_by_name() {
        let registry = registry_with(vec![Spec::tool("tool:multiply", "Multiply", "callable")]);

        assert!(registry.disable("multiply"));
        assert!(registry.get("tool:multiply").is_none());
    }

    #[test]
    fn add_tag_is_visible_to_list() {
        let registry = registry_with(vec![Spec::tool("tool:multiply", "Multiply", "callable")]);

        assert!(registry.add_tag("tool:multiply", "math"));

        let listed = registry.list(&SpecQuery::new().tag("math"));
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn list_filters_by_kind_and_tag_subset() {
        let registry = registry_with(vec![
            Spec::model("model:a", "A", "sklearn")
                .with_tag("iris")
                .with_tag("prod"),
            Spec::model("model:b", "B", "sklearn").with_tag("iris"),
            Spec::tool("tool:c", "C", "callable")
                .with_tag("iris")
                .with_tag("prod"),
        ]);

        let query = SpecQuery::new()
            .kind(SpecKind::Model)
            .tag("iris")
            .tag("prod");
        let ids: Vec<String> = registry
            .list(&query)
            .iter()
            .map(|s| s.id().to_string())
            .collect();

        assert_eq!(ids, vec!["model:a"]);
    }

    #[test]
    fn list_excludes_disabled_unless_requested() {
        let registry = registry_with(vec![
            Spec::tool("tool:a", "A", "callable"),
            Spec::tool("tool:b", "B", "callable"),
        ]);
        registry.disable("tool:b");

        assert_eq!(registry.list(&SpecQuery::new()).len(), 1);
        assert_eq!(registry.list(&SpecQuery::new().include_disabled()).len(), 2);
    }

    #[test]
    fn repeated_list_returns_same_set() {
        let registry = registry_with(vec![
            Spec::tool("tool:a", "A", "callable"),
            Spec::tool("tool:b", "B", "callable"),
            Spec::model("model:c", "C", "sklearn"),
        ]);
        let query = SpecQuery::new().kind(SpecKind::Tool);

        let first: HashSet<String> = registry
            .list(&query)
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        let second: HashSet<String> = registry
            .list(&query)
            .iter()
            .map(|s| s.id().to_string())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_readers_see_registered_specs() {
        let registry = Arc::new(registry_with(vec![Spec::tool("tool:a", "A", "callable")]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get("tool:a").is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
