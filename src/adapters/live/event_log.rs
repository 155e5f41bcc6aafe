//! Durable event log writing one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::ports::{BoxError, EventLog, LogEvent};

/// Appends events to a JSON-lines file.
///
/// Each `append` opens the file in append mode and writes a single line, so
/// events survive process exit. Reads parse the whole file and skip lines
/// that are not valid events.
#[derive(Debug)]
pub struct JsonLinesEventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesEventLog {
    /// Creates a log at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, BoxError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// File the log writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for JsonLinesEventLog {
    fn append(&self, event: LogEvent) -> Result<(), BoxError> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn list_events(&self, event_type: Option<&str>) -> Result<Vec<LogEvent>, BoxError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut events = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: LogEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        error = %e,
                        "skipping malformed event line"
                    );
                    continue;
                }
            };
            if event_type.map_or(true, |t| event.event_type == t) {
                events.push(event);
            }
        }
        Ok(events)
    }
}
