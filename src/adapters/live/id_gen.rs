//! Live adapter for the `IdGenerator` port.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_ids() {
        let id1 = LiveIdGenerator.generate_id();
        let id2 = LiveIdGenerator.generate_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }
}
