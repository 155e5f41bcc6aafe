//! Decision context passed to policy evaluation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raised when a context path cannot be traversed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// A path segment addressed into a value that is not an object.
    #[error("cannot read '{segment}' of non-object at '{path}'")]
    NotAnObject {
        /// Full dotted path being read.
        path: String,
        /// Segment that could not be resolved.
        segment: String,
    },
}

/// String-keyed bag of values describing a request beyond
/// subject/action/resource.
///
/// The executor fills `workspace`, `runtime`, `spec_kind`, `task_metadata`,
/// `tags` and `spec_metadata`, then overlays the task's own context entries
/// so conditions can inspect caller-supplied keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionContext(Map<String, Value>);

impl DecisionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Reads a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reads a dotted path such as `spec_metadata.domain`.
    ///
    /// A missing key anywhere along the path yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotAnObject`] when an intermediate value is
    /// present but is not an object.
    pub fn lookup(&self, path: &str) -> Result<Option<&Value>, ContextError> {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Ok(None);
        };
        let mut current = match self.0.get(first) {
            Some(value) => value,
            None => return Ok(None),
        };
        for segment in segments {
            let Value::Object(map) = current else {
                return Err(ContextError::NotAnObject {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            };
            match map.get(segment) {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for DecisionContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<DecisionContext> for Map<String, Value> {
    fn from(context: DecisionContext) -> Self {
        context.0
    }
}
