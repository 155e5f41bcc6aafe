//! Event log port for append-only observability events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BoxError;

/// A single observability event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unique event identifier.
    pub id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Short dotted type, e.g. `"task.started"`.
    pub event_type: String,
    /// Additional event data.
    #[serde(default)]
    pub payload: Value,
    /// Subject that initiated the work, if known.
    #[serde(default)]
    pub subject: Option<String>,
    /// Workspace label, if any.
    #[serde(default)]
    pub workspace: Option<String>,
    /// Spec the event concerns, if any.
    #[serde(default)]
    pub spec_id: Option<String>,
    /// Task the event concerns, if any.
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Append-only sink for [`LogEvent`]s.
pub trait EventLog: Send + Sync {
    /// Appends an event to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn append(&self, event: LogEvent) -> Result<(), BoxError>;

    /// Returns all events in append order, optionally filtered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn list_events(&self, event_type: Option<&str>) -> Result<Vec<LogEvent>, BoxError>;
}
