//! Name → runtime mapping used for dispatch.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::ports::Runtime;

/// Errors raised while registering runtimes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeTableError {
    /// A runtime with this name already exists.
    #[error("runtime '{0}' is already registered")]
    DuplicateRuntime(String),
}

/// Maps runtime-name strings to [`Runtime`] implementations.
///
/// Dispatch is by the declared name only; nothing here inspects bindings.
#[derive(Default)]
pub struct RuntimeTable {
    runtimes: RwLock<Runtimes>,
}

type Runtimes = BTreeMap<String, Arc<dyn Runtime>>;

impl RuntimeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `runtime` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeTableError::DuplicateRuntime`] if the name is taken.
    pub fn register(
        &self,
        name: impl Into<String>,
        runtime: impl Runtime + 'static,
    ) -> Result<(), RuntimeTableError> {
        self.register_shared(name, Arc::new(runtime))
    }

    /// Registers an already shared runtime under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeTableError::DuplicateRuntime`] if the name is taken.
    pub fn register_shared(
        &self,
        name: impl Into<String>,
        runtime: Arc<dyn Runtime>,
    ) -> Result<(), RuntimeTableError> {
        let name = name.into();
        let mut runtimes = self.write();
        if runtimes.contains_key(&name) {
            return Err(RuntimeTableError::DuplicateRuntime(name));
        }
        runtimes.insert(name, runtime);
        Ok(())
    }

    /// Returns the runtime registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Runtime>> {
        self.read().get(name).cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Runtimes> {
        self.runtimes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Runtimes> {
        self.runtimes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
