//! Volatile event log kept in memory.

use std::sync::{Mutex, PoisonError};

use crate::ports::{BoxError, EventLog, LogEvent};

/// Event log that keeps events in a vector for the life of the process.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<LogEvent>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types in append order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, event: LogEvent) -> Result<(), BoxError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }

    fn list_events(&self, event_type: Option<&str>) -> Result<Vec<LogEvent>, BoxError> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(events
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .cloned()
            .collect())
    }
}
