//! Runtime port: the capability every execution backend implements.

use serde_json::Value;

use super::BoxError;
use crate::registry::Spec;

/// Executes a registered spec against an input payload.
///
/// Runtimes know nothing about tasks, policy or results. They receive the
/// resolved spec (for its binding, metadata and config) and the task input,
/// and return an output payload or an error. Implementations must not
/// assume any particular binding type unless they own that contract.
pub trait Runtime: Send + Sync {
    /// Invokes the spec with the given input.
    ///
    /// # Errors
    ///
    /// Returns an error when the binding is unusable for this runtime or the
    /// underlying capability fails.
    fn invoke(&self, spec: &Spec, input: &Value) -> Result<Value, BoxError>;
}
