//! ID generator port for producing unique identifiers.

/// Generates unique identifiers for tasks and log events.
///
/// Abstracting ID generation allows deterministic sequences in tests.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
