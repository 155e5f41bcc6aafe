//! Deterministic id source.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::IdGenerator;

/// Yields `"<prefix>-1"`, `"<prefix>-2"`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Starts a sequence at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_from_one() {
        let ids = SequentialIdGenerator::new("evt");
        assert_eq!(ids.generate_id(), "evt-1");
        assert_eq!(ids.generate_id(), "evt-2");
    }
}
